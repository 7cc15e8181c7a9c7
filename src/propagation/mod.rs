//! Pulse propagation.
//!
//! A pulse anchors to the node nearest its requested origin and spreads
//! along connections, losing energy at every hop, until the frontier
//! empties or the step budget runs out. The result is an [`ActivationTrace`].
//!
//! ## Modules
//!
//! - [`config`] — `PropagationConfig`: decay law parameters and budget
//! - [`clock`] — `Clock` seam (`SystemClock`, `ManualClock`)
//! - [`trace`] — requests, events, per-node activations, summaries
//! - [`engine`] — `PropagationEngine::propagate`

pub mod clock;
pub mod config;
pub mod engine;
pub mod trace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PropagationConfig;
pub use engine::PropagationEngine;
pub use trace::{
    ActivationEvent, ActivationTrace, NodeActivation, NodeState, PulseRequest, Termination,
    TraceSummary,
};
