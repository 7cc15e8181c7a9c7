//! Pulse Propagation Engine
//!
//! Spreads energy outward from the node nearest a requested point:
//! 1. **Anchor**: linear scan for the closest node
//! 2. **Spreading**: FIFO flood over connections, decaying energy per hop,
//!    bounded by a step budget
//! 3. **Summary**: distances, timing, retained energy and display tint
//!
//! The graph is only read. All traversal state lives inside one call, so
//! the same graph, request and config always produce the same trace.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::PropagationError;
use crate::graph::{NetworkGraph, NodeId};

use super::clock::{Clock, SystemClock};
use super::config::PropagationConfig;
use super::trace::{
    ActivationEvent, ActivationTrace, NodeActivation, NodeState, PulseRequest, Termination,
    TraceSummary,
};

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// An entry waiting in the frontier.
struct Pending {
    node: NodeId,
    energy: f64,
    depth: usize,
}

/// Pulse Propagation Engine.
///
/// Designed for injection via `Arc<PropagationEngine>`; it holds no
/// per-pulse state.
pub struct PropagationEngine {
    config: PropagationConfig,
    clock: Arc<dyn Clock>,
}

impl PropagationEngine {
    /// Create an engine, rejecting configs that break the decay invariants.
    pub fn new(config: PropagationConfig, clock: Arc<dyn Clock>) -> Result<Self, PropagationError> {
        config.validate()?;
        Ok(Self { config, clock })
    }

    pub fn with_system_clock(config: PropagationConfig) -> Result<Self, PropagationError> {
        Self::new(config, Arc::new(SystemClock::new()))
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Run one pulse to completion against `graph`.
    ///
    /// # Errors
    /// * `AnchorNotFound` — the graph has no nodes
    /// * `InvalidIntensity` — intensity outside (0, 1]
    pub fn propagate(
        &self,
        graph: &NetworkGraph,
        request: &PulseRequest,
    ) -> Result<ActivationTrace, PropagationError> {
        let intensity = request.intensity;
        if !(intensity > 0.0 && intensity <= 1.0) {
            return Err(PropagationError::InvalidIntensity(intensity));
        }

        // Phase 1: anchor
        let (anchor, anchor_distance) = graph
            .nearest(&request.origin)
            .ok_or(PropagationError::AnchorNotFound)?;
        let anchor_position = graph.nodes()[anchor].position;

        debug!(
            anchor,
            anchor_distance,
            formation = %graph.formation,
            "Phase 1: pulse anchored"
        );

        // Phase 2: bounded flood
        let started = self.clock.now();
        let threshold = self.config.activation_threshold;
        let reexpansion = self.config.reexpansion_threshold();
        let max_steps = self.config.max_steps;

        let mut states = vec![NodeState::Unvisited; graph.len()];
        let mut activations: BTreeMap<NodeId, NodeActivation> = BTreeMap::new();
        let mut events: Vec<ActivationEvent> = Vec::new();
        let mut expansion_order = vec![anchor];
        let mut frontier = VecDeque::from([Pending {
            node: anchor,
            energy: intensity,
            depth: 0,
        }]);

        states[anchor] = NodeState::Expanded;
        activations.insert(
            anchor,
            NodeActivation {
                peak_energy: intensity,
                first_activation_ms: 0.0,
                state: NodeState::Expanded,
            },
        );

        let mut total_distance = 0.0_f64;
        let mut max_edge_distance = 0.0_f64;
        let mut reach = 0.0_f64;
        let mut last_arrival: Option<f64> = None;
        let mut termination = Termination::FrontierExhausted;

        'traversal: while let Some(Pending {
            node,
            energy,
            depth,
        }) = frontier.pop_front()
        {
            let source = &graph.nodes()[node];
            for conn in &source.connections {
                let target = &graph.nodes()[conn.target];
                let distance = source.position.distance(&target.position);
                let decay = self.config.hop_loss(conn.strength, distance);
                let arrival = energy * (1.0 - decay);

                // Below threshold: no event, no state change
                if arrival < threshold {
                    continue;
                }

                // Truncated only when a qualifying arrival is left unrecorded
                if events.len() >= max_steps {
                    termination = Termination::BudgetExhausted;
                    break 'traversal;
                }

                let elapsed_ms = millis(self.clock.now().saturating_sub(started));
                let step = events.len() + 1;
                events.push(ActivationEvent {
                    step,
                    source: node,
                    target: conn.target,
                    depth: depth + 1,
                    source_energy: energy,
                    arrival_energy: arrival,
                    decay,
                    distance,
                    strength: conn.strength,
                    elapsed_ms,
                });
                trace!(
                    step,
                    source = node,
                    target = conn.target,
                    arrival,
                    "Phase 2: activation"
                );

                let entry = activations
                    .entry(conn.target)
                    .or_insert_with(|| NodeActivation {
                        peak_energy: arrival,
                        first_activation_ms: elapsed_ms,
                        state: NodeState::Recorded,
                    });
                entry.peak_energy = entry.peak_energy.max(arrival);

                // Only the first qualifying arrival decides expansion
                if states[conn.target] == NodeState::Unvisited {
                    if arrival > reexpansion {
                        states[conn.target] = NodeState::Expanded;
                        expansion_order.push(conn.target);
                        frontier.push_back(Pending {
                            node: conn.target,
                            energy: arrival,
                            depth: depth + 1,
                        });
                    } else {
                        states[conn.target] = NodeState::Recorded;
                    }
                    entry.state = states[conn.target];
                }

                total_distance += distance;
                max_edge_distance = max_edge_distance.max(distance);
                reach = reach.max(target.position.distance(&anchor_position));
                last_arrival = Some(arrival);
            }
        }

        // Phase 3: summary
        let duration_ms = millis(self.clock.now().saturating_sub(started));
        let steps = events.len();
        let retained_energy_fraction = last_arrival.map(|a| a / intensity).unwrap_or(1.0);
        let summary = TraceSummary {
            steps,
            nodes_activated: activations.len(),
            total_distance,
            max_edge_distance,
            reach,
            duration_ms,
            avg_hop_latency_ms: if steps > 0 {
                duration_ms / steps as f64
            } else {
                0.0
            },
            retained_energy_fraction,
            display_color: request.color.attenuate(retained_energy_fraction),
            termination,
        };

        debug!(
            steps,
            nodes_activated = summary.nodes_activated,
            termination = %termination,
            "Phase 3: pulse complete"
        );

        Ok(ActivationTrace {
            requested_origin: request.origin,
            anchor,
            anchor_position,
            anchor_distance,
            color: request.color,
            intensity,
            formation: graph.formation.clone(),
            events,
            activations,
            expansion_order,
            summary,
        })
    }
}
