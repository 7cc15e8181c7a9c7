//! Error types for graph construction and pulse propagation.
//!
//! Budget exhaustion is not an error: a pulse that runs out of steps
//! still produces a valid trace (see [`crate::propagation::Termination`]).

use thiserror::Error;

/// Errors raised while building a formation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// The strategy produced zero nodes. The previous graph stays in place.
    #[error("formation '{formation}' produced no nodes")]
    GenerationFailure { formation: String },

    /// Density factor outside (0, 1].
    #[error("density factor must be in (0, 1], got {0}")]
    InvalidDensity(f64),

    /// The routed tour search is factorial; larger inputs are refused.
    #[error("routed tour supports at most {max} cities, got {requested}")]
    TooManyCities { requested: usize, max: usize },

    /// A serialized graph whose node ids or connections are inconsistent.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
}

/// Errors raised by a single pulse request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    /// No graph, or a graph with zero nodes, to anchor the pulse to.
    #[error("no node available to anchor the pulse")]
    AnchorNotFound,

    /// Base intensity outside (0, 1].
    #[error("pulse intensity must be in (0, 1], got {0}")]
    InvalidIntensity(f64),

    /// Engine parameters that would break the decay invariants.
    #[error("invalid propagation config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failure_names_formation() {
        let err = GraphError::GenerationFailure {
            formation: "spiral".into(),
        };
        assert_eq!(err.to_string(), "formation 'spiral' produced no nodes");
    }

    #[test]
    fn test_too_many_cities_message() {
        let err = GraphError::TooManyCities {
            requested: 12,
            max: 10,
        };
        assert!(err.to_string().contains("at most 10"));
    }
}
