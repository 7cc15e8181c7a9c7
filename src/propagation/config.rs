//! Configuration for the pulse propagation engine.
//!
//! All parameters have sensible defaults and can be overridden per session.

use serde::{Deserialize, Serialize};

use crate::error::PropagationError;

/// Smallest per-hop loss the parameters may allow.
const MIN_HOP_LOSS: f64 = 1e-9;

/// Configuration for the bounded decay flood.
///
/// Per explored edge:
/// - `strength_term = 1 − strength_resistance × strength`
/// - `distance_term = 1 + distance / reference_distance`
/// - `loss = min(base_decay_rate × strength_term × distance_term, max_hop_loss)`
/// - `arrival = energy × (1 − loss)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Fraction of energy lost per hop before strength and distance shaping.
    pub base_decay_rate: f64,

    /// Arrivals below this energy are dropped without trace.
    pub activation_threshold: f64,

    /// A node is expanded only when its first arrival exceeds
    /// `activation_threshold × reexpansion_factor`.
    pub reexpansion_factor: f64,

    /// Upper bound on recorded activation events per pulse.
    pub max_steps: usize,

    /// Edge length at which the distance term doubles the base loss.
    pub reference_distance: f64,

    /// How much a full-strength connection shields against decay, in [0, 1).
    pub strength_resistance: f64,

    /// Cap on the energy fraction a single hop may remove, in (0, 1).
    pub max_hop_loss: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            base_decay_rate: 0.15,
            activation_threshold: 0.05,
            reexpansion_factor: 1.5,
            max_steps: 50,
            reference_distance: 2.0,
            strength_resistance: 0.5,
            max_hop_loss: 0.9,
        }
    }
}

impl PropagationConfig {
    /// Threshold a first arrival must exceed for the node to be expanded.
    pub fn reexpansion_threshold(&self) -> f64 {
        self.activation_threshold * self.reexpansion_factor
    }

    /// Fraction of energy removed crossing one edge.
    pub fn hop_loss(&self, strength: f64, distance: f64) -> f64 {
        (self.base_decay_rate * self.decay_factor(strength, distance)).min(self.max_hop_loss)
    }

    /// Strength term times distance term, before the base rate is applied.
    pub fn decay_factor(&self, strength: f64, distance: f64) -> f64 {
        let strength_term = 1.0 - self.strength_resistance * strength.clamp(0.0, 1.0);
        let distance_term = 1.0 + distance.max(0.0) / self.reference_distance;
        strength_term * distance_term
    }

    /// Reject parameter combinations that would let a hop keep or gain
    /// energy, or extinguish it entirely.
    pub fn validate(&self) -> Result<(), PropagationError> {
        let invalid = |msg: &str| Err(PropagationError::InvalidConfig(msg.to_string()));
        if !(self.base_decay_rate > 0.0 && self.base_decay_rate <= 1.0) {
            return invalid("base_decay_rate must be in (0, 1]");
        }
        if !(self.activation_threshold > 0.0 && self.activation_threshold < 1.0) {
            return invalid("activation_threshold must be in (0, 1)");
        }
        if !(self.reexpansion_factor >= 1.0) {
            return invalid("reexpansion_factor must be at least 1");
        }
        if !(self.reference_distance > 0.0) {
            return invalid("reference_distance must be positive");
        }
        if !(0.0..1.0).contains(&self.strength_resistance) {
            return invalid("strength_resistance must be in [0, 1)");
        }
        if !(self.max_hop_loss > 0.0 && self.max_hop_loss < 1.0) {
            return invalid("max_hop_loss must be in (0, 1)");
        }
        // Smallest possible loss: full strength, zero-length edge
        if self.base_decay_rate * (1.0 - self.strength_resistance) < MIN_HOP_LOSS {
            return invalid("decay too weak: arrivals would not drop below source energy");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PropagationConfig::default();
        assert_eq!(config.max_steps, 50);
        assert!((config.base_decay_rate - 0.15).abs() < f64::EPSILON);
        assert!((config.activation_threshold - 0.05).abs() < f64::EPSILON);
        assert!((config.reexpansion_threshold() - 0.075).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stronger_connections_lose_less() {
        let config = PropagationConfig::default();
        assert!(config.hop_loss(1.0, 1.0) < config.hop_loss(0.2, 1.0));
    }

    #[test]
    fn test_longer_edges_lose_more_up_to_cap() {
        let config = PropagationConfig::default();
        assert!(config.hop_loss(0.5, 4.0) > config.hop_loss(0.5, 1.0));
        assert_eq!(config.hop_loss(0.0, 1e9), config.max_hop_loss);
    }

    #[test]
    fn test_zero_length_edge_still_decays() {
        let config = PropagationConfig::default();
        assert!(config.hop_loss(1.0, 0.0) > 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            PropagationConfig {
                base_decay_rate: 0.0,
                ..Default::default()
            },
            PropagationConfig {
                activation_threshold: 0.0,
                ..Default::default()
            },
            PropagationConfig {
                reexpansion_factor: 0.5,
                ..Default::default()
            },
            PropagationConfig {
                max_hop_loss: 1.0,
                ..Default::default()
            },
            PropagationConfig {
                strength_resistance: 1.0,
                ..Default::default()
            },
            PropagationConfig {
                reference_distance: f64::NAN,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(PropagationError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
    }
}
