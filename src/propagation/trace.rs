//! Pulse requests and the activation traces they produce.
//!
//! Traces only use ordered containers so that serializing the same trace
//! twice yields the same bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::color::Rgb;
use crate::graph::{NodeId, Vec3};

/// A request to send one pulse through the current graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseRequest {
    /// Requested point; the pulse starts at the nearest node
    pub origin: Vec3,
    pub color: Rgb,
    /// Starting energy in (0, 1]
    pub intensity: f64,
}

impl PulseRequest {
    pub fn new(origin: Vec3, color: Rgb, intensity: f64) -> Self {
        Self {
            origin,
            color,
            intensity,
        }
    }
}

/// Per-node status during one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Not reached by any arrival at or above the activation threshold
    Unvisited,
    /// Activated for display, never expanded
    Recorded,
    /// Activated and queued for expansion (exactly once)
    Expanded,
}

/// One explored edge whose arrival met the activation threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationEvent {
    /// 1-based position in the trace
    pub step: usize,
    pub source: NodeId,
    pub target: NodeId,
    /// Hops from the anchor to `target` along this path
    pub depth: usize,
    pub source_energy: f64,
    pub arrival_energy: f64,
    /// Fraction of `source_energy` lost on this hop
    pub decay: f64,
    pub distance: f64,
    pub strength: f64,
    /// Time since the traversal started
    pub elapsed_ms: f64,
}

/// Display-facing activation of a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeActivation {
    /// Strongest arrival seen; the anchor keeps the starting intensity
    pub peak_energy: f64,
    pub first_activation_ms: f64,
    pub state: NodeState,
}

/// Why the traversal stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The frontier emptied: the pulse reached its natural boundary
    FrontierExhausted,
    /// The step budget ran out with work left; the trace is partial
    BudgetExhausted,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrontierExhausted => write!(f, "frontier_exhausted"),
            Self::BudgetExhausted => write!(f, "budget_exhausted"),
        }
    }
}

/// Aggregate numbers for a finished traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub steps: usize,
    pub nodes_activated: usize,
    /// Sum of edge lengths over all events
    pub total_distance: f64,
    /// Longest single edge crossed
    pub max_edge_distance: f64,
    /// Farthest activated node from the anchor, straight-line
    pub reach: f64,
    pub duration_ms: f64,
    pub avg_hop_latency_ms: f64,
    /// Last recorded arrival over the starting intensity (1.0 with no events)
    pub retained_energy_fraction: f64,
    /// Start color attenuated by the retained fraction
    pub display_color: Rgb,
    pub termination: Termination,
}

/// Complete record of one pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationTrace {
    pub requested_origin: Vec3,
    pub anchor: NodeId,
    pub anchor_position: Vec3,
    /// Distance from the requested origin to the anchor
    pub anchor_distance: f64,
    pub color: Rgb,
    pub intensity: f64,
    /// Formation the trace was computed against
    pub formation: String,
    pub events: Vec<ActivationEvent>,
    pub activations: BTreeMap<NodeId, NodeActivation>,
    /// Nodes in the order they were queued for expansion, anchor first
    pub expansion_order: Vec<NodeId>,
    pub summary: TraceSummary,
}

impl ActivationTrace {
    pub fn steps(&self) -> usize {
        self.events.len()
    }

    pub fn nodes_activated(&self) -> usize {
        self.activations.len()
    }

    pub fn activation(&self, node: NodeId) -> Option<&NodeActivation> {
        self.activations.get(&node)
    }

    pub fn state(&self, node: NodeId) -> NodeState {
        self.activation(node)
            .map(|a| a.state)
            .unwrap_or(NodeState::Unvisited)
    }

    pub fn budget_exhausted(&self) -> bool {
        self.summary.termination == Termination::BudgetExhausted
    }
}
