//! Pulse session: the one owner of mutable state across requests.
//!
//! Holds the current graph pointer, the pulse slots, the trace history and
//! the generator that formations draw from. Every mutating operation takes
//! `&mut self`, so a multi-threaded host has to serialize graph swaps and
//! slot writes (e.g. behind a `Mutex`).

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::history::TraceHistory;
use super::pulses::{MultiPulseRegistry, SlotView};
use crate::color::Rgb;
use crate::error::{GraphError, PropagationError};
use crate::events::{emit_trace, DiagnosticSink, PulseEvent};
use crate::graph::{FormationRegistry, NetworkGraph, NodeClass, Vec3};
use crate::propagation::{ActivationTrace, Clock, PropagationEngine, PulseRequest};

/// Slot, history and logging parameters of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Ring size K of the pulse display slots
    pub pulse_slots: usize,
    /// Seconds a slot stays visible after its pulse started (0 = forever)
    pub pulse_lifetime_secs: f64,
    /// Ring growth in world units per second
    pub propagation_speed: f64,
    /// Completed traces retained for diagnostics
    pub history_capacity: usize,
    /// Emit every n-th step event (1 = all, 0 = none)
    pub step_log_interval: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pulse_slots: 3,
            pulse_lifetime_secs: 3.0,
            propagation_speed: 4.0,
            history_capacity: 16,
            step_log_interval: 1,
        }
    }
}

impl SessionConfig {
    pub fn pulse_lifetime(&self) -> Duration {
        Duration::try_from_secs_f64(self.pulse_lifetime_secs).unwrap_or(Duration::ZERO)
    }
}

pub struct PulseSession {
    registry: FormationRegistry,
    engine: PropagationEngine,
    config: SessionConfig,
    graph: Option<Arc<NetworkGraph>>,
    pulses: MultiPulseRegistry,
    history: TraceHistory,
    sink: Arc<dyn DiagnosticSink>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl PulseSession {
    /// A session with no graph yet. `seed` fixes every formation build;
    /// `None` seeds from entropy.
    pub fn new(
        registry: FormationRegistry,
        engine: PropagationEngine,
        config: SessionConfig,
        seed: Option<u64>,
        sink: Arc<dyn DiagnosticSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry,
            engine,
            pulses: MultiPulseRegistry::new(config.pulse_slots),
            history: TraceHistory::new(config.history_capacity),
            config,
            graph: None,
            sink,
            clock,
            rng,
        }
    }

    /// Build formation `id` (wrapping) and make it the current graph.
    ///
    /// On failure the previous graph, if any, stays current and a
    /// `GenerationFailed` event is emitted.
    pub fn select_formation(
        &mut self,
        id: usize,
        density: f64,
    ) -> Result<Arc<NetworkGraph>, GraphError> {
        match self.registry.build(id, density, &mut self.rng) {
            Ok(graph) => {
                let graph = Arc::new(graph);
                self.sink.emit(PulseEvent::graph_built(
                    graph.formation_id,
                    graph.formation.clone(),
                    graph.len(),
                    graph.edge_count(),
                    graph.density,
                ));
                self.graph = Some(graph.clone());
                Ok(graph)
            }
            Err(e) => {
                self.sink
                    .emit(PulseEvent::generation_failed(id, e.to_string()));
                Err(e)
            }
        }
    }

    /// Propagate one pulse against the current graph and record it.
    ///
    /// A request that cannot run (no graph, bad intensity) emits
    /// `PulseIgnored` and leaves the slots and history untouched.
    pub fn request_pulse(
        &mut self,
        request: &PulseRequest,
    ) -> Result<Arc<ActivationTrace>, PropagationError> {
        let result = match &self.graph {
            Some(graph) => self.engine.propagate(graph, request).map(|t| (graph.clone(), t)),
            None => Err(PropagationError::AnchorNotFound),
        };
        let (graph, trace) = match result {
            Ok(ok) => ok,
            Err(e) => {
                self.sink
                    .emit(PulseEvent::pulse_ignored(request.origin, e.to_string()));
                return Err(e);
            }
        };

        let (class, connections) = graph
            .node(trace.anchor)
            .map(|n| (n.class(), n.degree()))
            .unwrap_or((NodeClass::Root, 0));
        emit_trace(
            self.sink.as_ref(),
            &trace,
            class,
            connections,
            self.config.step_log_interval,
        );

        let slot = self
            .pulses
            .record(trace.anchor_position, trace.color, self.clock.now());
        debug!(slot, anchor = trace.anchor, "Pulse slot written");

        let trace = Arc::new(trace);
        self.history.push(trace.clone());
        Ok(trace)
    }

    /// Shorthand for [`PulseSession::request_pulse`].
    pub fn pulse_at(
        &mut self,
        origin: Vec3,
        color: Rgb,
        intensity: f64,
    ) -> Result<Arc<ActivationTrace>, PropagationError> {
        self.request_pulse(&PulseRequest::new(origin, color, intensity))
    }

    /// Slot views at the current clock reading.
    pub fn frame(&self) -> Vec<SlotView> {
        self.frame_at(self.clock.now())
    }

    pub fn frame_at(&self, now: Duration) -> Vec<SlotView> {
        self.pulses.views(
            now,
            self.config.pulse_lifetime(),
            self.config.propagation_speed,
        )
    }

    pub fn graph(&self) -> Option<&Arc<NetworkGraph>> {
        self.graph.as_ref()
    }

    pub fn registry(&self) -> &FormationRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &PropagationEngine {
        &self.engine
    }

    pub fn pulses(&self) -> &MultiPulseRegistry {
        &self.pulses
    }

    pub fn history(&self) -> &TraceHistory {
        &self.history
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for PulseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseSession")
            .field("registry", &self.registry)
            .field("formation", &self.graph.as_ref().map(|g| g.formation.clone()))
            .field("pulses", &self.pulses.populated())
            .field("history", &self.history.len())
            .finish()
    }
}
