//! Diagnostic event system
//!
//! This module provides:
//! - `PulseEvent` — typed events for pulse origins, sampled steps, summaries
//!   and formation changes
//! - `DiagnosticSink` — injected as `Arc<dyn DiagnosticSink>`
//! - `EventBus` — broadcast channel for independent consumers
//! - `TracingSink`, `RecordingSink`, `FanoutSink` — logging, capture, fan-out

mod bus;
mod sink;
mod types;

pub use bus::EventBus;
pub use sink::{emit_trace, FanoutSink, RecordingSink, TracingSink};
pub use types::{DiagnosticSink, PulseEvent};
