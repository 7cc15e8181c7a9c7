//! Diagnostic event types emitted by a pulse session

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::graph::{NodeClass, NodeId, Vec3};
use crate::propagation::{ActivationEvent, ActivationTrace, Termination};

/// Trait for emitting diagnostic events.
///
/// Implementations must not block or panic; a consumer that cannot keep up
/// simply misses events.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: PulseEvent);
}

/// One structured diagnostic record.
///
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PulseEvent {
    /// A pulse was anchored and is about to spread
    Origin {
        anchor: NodeId,
        position: Vec3,
        anchor_distance: f64,
        intensity: f64,
        color: Rgb,
        class: NodeClass,
        connections: usize,
        timestamp: String,
    },
    /// A sampled activation step
    Step {
        #[serde(flatten)]
        event: ActivationEvent,
        timestamp: String,
    },
    /// A pulse finished
    Summary {
        anchor: NodeId,
        steps: usize,
        nodes_activated: usize,
        total_distance: f64,
        max_edge_distance: f64,
        duration_ms: f64,
        avg_hop_latency_ms: f64,
        retained_energy_fraction: f64,
        display_color: Rgb,
        termination: Termination,
        timestamp: String,
    },
    /// A formation became the current graph
    GraphBuilt {
        formation_id: usize,
        formation: String,
        nodes: usize,
        edges: usize,
        density: f64,
        timestamp: String,
    },
    /// A formation switch was aborted; the previous graph is kept
    GenerationFailed {
        formation_id: usize,
        reason: String,
        timestamp: String,
    },
    /// A pulse request was dropped without touching the slots
    PulseIgnored {
        origin: Vec3,
        reason: String,
        timestamp: String,
    },
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl PulseEvent {
    /// Origin event for a finished trace, with the anchor's classification.
    pub fn origin(trace: &ActivationTrace, class: NodeClass, connections: usize) -> Self {
        Self::Origin {
            anchor: trace.anchor,
            position: trace.anchor_position,
            anchor_distance: trace.anchor_distance,
            intensity: trace.intensity,
            color: trace.color,
            class,
            connections,
            timestamp: now(),
        }
    }

    pub fn step(event: &ActivationEvent) -> Self {
        Self::Step {
            event: event.clone(),
            timestamp: now(),
        }
    }

    pub fn summary(trace: &ActivationTrace) -> Self {
        let s = &trace.summary;
        Self::Summary {
            anchor: trace.anchor,
            steps: s.steps,
            nodes_activated: s.nodes_activated,
            total_distance: s.total_distance,
            max_edge_distance: s.max_edge_distance,
            duration_ms: s.duration_ms,
            avg_hop_latency_ms: s.avg_hop_latency_ms,
            retained_energy_fraction: s.retained_energy_fraction,
            display_color: s.display_color,
            termination: s.termination,
            timestamp: now(),
        }
    }

    pub fn graph_built(
        formation_id: usize,
        formation: impl Into<String>,
        nodes: usize,
        edges: usize,
        density: f64,
    ) -> Self {
        Self::GraphBuilt {
            formation_id,
            formation: formation.into(),
            nodes,
            edges,
            density,
            timestamp: now(),
        }
    }

    pub fn generation_failed(formation_id: usize, reason: impl Into<String>) -> Self {
        Self::GenerationFailed {
            formation_id,
            reason: reason.into(),
            timestamp: now(),
        }
    }

    pub fn pulse_ignored(origin: Vec3, reason: impl Into<String>) -> Self {
        Self::PulseIgnored {
            origin,
            reason: reason.into(),
            timestamp: now(),
        }
    }

    /// Snake-case variant name, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Origin { .. } => "origin",
            Self::Step { .. } => "step",
            Self::Summary { .. } => "summary",
            Self::GraphBuilt { .. } => "graph_built",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::PulseIgnored { .. } => "pulse_ignored",
        }
    }

    /// RFC 3339 time the event was created.
    pub fn timestamp(&self) -> &str {
        match self {
            Self::Origin { timestamp, .. }
            | Self::Step { timestamp, .. }
            | Self::Summary { timestamp, .. }
            | Self::GraphBuilt { timestamp, .. }
            | Self::GenerationFailed { timestamp, .. }
            | Self::PulseIgnored { timestamp, .. } => timestamp,
        }
    }
}
