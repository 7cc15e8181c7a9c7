//! Diagnostic sinks and trace emission
//!
//! - `TracingSink` — writes every event through `tracing`
//! - `RecordingSink` — keeps events in memory (tests, CLI output)
//! - `FanoutSink` — forwards each event to several sinks

use std::sync::{Arc, Mutex};

use tracing::{debug, info, trace, warn};

use super::{DiagnosticSink, PulseEvent};
use crate::graph::NodeClass;
use crate::propagation::ActivationTrace;

/// Sink that logs events with structured `tracing` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: PulseEvent) {
        match &event {
            PulseEvent::Origin {
                anchor,
                position,
                intensity,
                color,
                class,
                connections,
                ..
            } => info!(
                anchor,
                position = %position,
                intensity,
                color = %color,
                class = %class,
                connections,
                "Pulse origin"
            ),
            PulseEvent::Step { event, .. } => trace!(
                step = event.step,
                source = event.source,
                target = event.target,
                arrival = event.arrival_energy,
                decay = event.decay,
                distance = event.distance,
                "Pulse step"
            ),
            PulseEvent::Summary {
                steps,
                nodes_activated,
                total_distance,
                duration_ms,
                retained_energy_fraction,
                display_color,
                termination,
                ..
            } => info!(
                steps,
                nodes_activated,
                total_distance,
                duration_ms,
                retained_energy_fraction,
                display_color = %display_color,
                termination = %termination,
                "Pulse summary"
            ),
            PulseEvent::GraphBuilt {
                formation,
                nodes,
                edges,
                density,
                ..
            } => debug!(formation = %formation, nodes, edges, density, "Graph replaced"),
            PulseEvent::GenerationFailed {
                formation_id,
                reason,
                ..
            } => warn!(formation_id, reason = %reason, "Formation switch aborted"),
            PulseEvent::PulseIgnored { origin, reason, .. } => {
                debug!(origin = %origin, reason = %reason, "Pulse ignored")
            }
        }
    }
}

/// Sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PulseEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PulseEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .map(|e| e.iter().filter(|ev| ev.kind() == kind).count())
            .unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut e) = self.events.lock() {
            e.clear();
        }
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, event: PulseEvent) {
        if let Ok(mut e) = self.events.lock() {
            e.push(event);
        }
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn DiagnosticSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl DiagnosticSink for FanoutSink {
    fn emit(&self, event: PulseEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

/// Emit the origin event, every `step_interval`-th step event and the
/// summary for one trace. An interval of 0 suppresses step events.
pub fn emit_trace(
    sink: &dyn DiagnosticSink,
    trace: &ActivationTrace,
    class: NodeClass,
    connections: usize,
    step_interval: usize,
) {
    sink.emit(PulseEvent::origin(trace, class, connections));
    if step_interval > 0 {
        for event in trace.events.iter().filter(|e| e.step % step_interval == 0) {
            sink.emit(PulseEvent::step(event));
        }
    }
    if trace.budget_exhausted() {
        warn!(
            steps = trace.steps(),
            anchor = trace.anchor,
            "Pulse truncated by step budget"
        );
    }
    sink.emit(PulseEvent::summary(trace));
}
