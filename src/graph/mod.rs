//! Spatial graph formations.
//!
//! Builds the weighted, symmetric node graphs that pulses travel through.
//!
//! ## Architecture
//!
//! ```text
//! formation id + density ──► FormationRegistry ──► FormationStrategy
//!                                    │                     │
//!                                    │               GraphDraft
//!                                    │                     │
//!                              thin + repair ◄─────────────┘
//!                                    │
//!                              NetworkGraph (immutable)
//! ```
//!
//! ## Modules
//!
//! - [`models`] — Data structures (Vec3, Node, Connection, NetworkGraph, GraphDraft)
//! - [`formations`] — `FormationStrategy` trait and the geometric strategies
//! - [`tour`] — Exhaustive tour search and the routed-tour strategy
//! - [`registry`] — `FormationRegistry`: id resolution, density thinning, reachability repair

pub mod formations;
pub mod models;
pub mod registry;
pub mod tour;

// Re-export primary types for convenience
pub use formations::{
    FormationStrategy, LatticeStrategy, RadialTreeStrategy, ShellStrategy, SpiralStrategy,
};
pub use models::{
    Connection, GraphDraft, NetworkGraph, Node, NodeClass, NodeId, Vec3, LEVEL_BANDS, ROOT,
};
pub use registry::{FormationConfig, FormationRegistry};
pub use tour::{solve_tours, RoutedTourStrategy, Tour, TourSearch, MAX_TOUR_CITIES};
