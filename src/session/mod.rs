//! Pulse session state.
//!
//! - [`pulses`] — `MultiPulseRegistry`: K round-robin display slots
//! - [`history`] — `TraceHistory`: bounded ring of completed traces
//! - [`manager`] — `PulseSession`: current graph, registry, engine, sink

pub mod history;
pub mod manager;
pub mod pulses;

pub use history::TraceHistory;
pub use manager::{PulseSession, SessionConfig};
pub use pulses::{MultiPulseRegistry, PulseSlot, SlotView};
