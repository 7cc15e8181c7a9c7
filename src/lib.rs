//! Pulse Graph
//!
//! Procedural spatial graphs with deterministic pulse propagation:
//! - Named formation strategies (radial tree, spiral, lattice, shell, routed tour)
//!   built from a seedable generator and a density factor
//! - Bounded decay flood from the node nearest a requested point, producing
//!   a step-indexed activation trace
//! - A session that owns the current graph, K round-robin pulse slots and a
//!   bounded trace history
//! - Structured diagnostics through `tracing` and a broadcast event bus

pub mod color;
pub mod error;
pub mod events;
pub mod graph;
pub mod propagation;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use events::DiagnosticSink;
use graph::{FormationConfig, FormationRegistry};
use propagation::{Clock, PropagationConfig, PropagationEngine};
use session::{PulseSession, SessionConfig};

// ============================================================================
// Configuration
// ============================================================================

/// Full configuration, as read from `config.yaml` plus environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub formation: FormationConfig,
    pub propagation: PropagationConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist or fails to parse, falls back to defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_yaml(yaml_path);

        if let Some(v) = env_parse("PULSE_FORMATION") {
            config.formation.default_formation = v;
        }
        if let Some(v) = env_parse("PULSE_DENSITY") {
            config.formation.density = v;
        }
        if let Some(v) = env_parse("PULSE_SEED") {
            config.formation.seed = Some(v);
        }
        if let Some(v) = env_parse("PULSE_MAX_STEPS") {
            config.propagation.max_steps = v;
        }
        if let Some(v) = env_parse("PULSE_DECAY_RATE") {
            config.propagation.base_decay_rate = v;
        }
        if let Some(v) = env_parse("PULSE_ACTIVATION_THRESHOLD") {
            config.propagation.activation_threshold = v;
        }
        if let Some(v) = env_parse("PULSE_SLOTS") {
            config.session.pulse_slots = v;
        }

        Ok(config)
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> Self {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!("No config file at {}, using env vars / defaults", path.display());
                Self::default()
            }
        }
    }

    /// Assemble a session (registry, engine, slots, history) with no graph
    /// selected yet.
    pub fn build_session(
        &self,
        sink: Arc<dyn DiagnosticSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<PulseSession> {
        let registry = FormationRegistry::from_config(&self.formation)?;
        let engine = PropagationEngine::new(self.propagation.clone(), clock.clone())?;
        Ok(PulseSession::new(
            registry,
            engine,
            self.session.clone(),
            self.formation.seed,
            sink,
            clock,
        ))
    }
}

/// Read and parse an env var; unset or unparsable values are ignored.
fn env_parse<T: FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", var, raw);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
formation:
  default_formation: 4
  density: 0.6
  seed: 17
  tour_cities: 6
propagation:
  base_decay_rate: 0.2
  max_steps: 120
session:
  pulse_slots: 5
  step_log_interval: 10
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.formation.default_formation, 4);
        assert_eq!(config.formation.seed, Some(17));
        assert_eq!(config.formation.tour_cities, 6);
        // Unlisted fields keep their defaults
        assert_eq!(config.formation.tour_alternatives, 3);
        assert_eq!(config.propagation.max_steps, 120);
        assert!((config.propagation.activation_threshold - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.session.pulse_slots, 5);
        assert_eq!(config.session.history_capacity, 16);
    }

    #[test]
    fn test_yaml_defaults() {
        let config = Config::default();
        assert_eq!(config.formation.default_formation, 0);
        assert_eq!(config.formation.density, 1.0);
        assert!(config.formation.seed.is_none());
        assert_eq!(config.propagation.max_steps, 50);
        assert_eq!(config.session.pulse_slots, 3);
        assert_eq!(config.session.step_log_interval, 1);
    }

    #[test]
    fn test_build_session_rejects_bad_config() {
        let mut config = Config::default();
        config.formation.tour_cities = 12;
        assert!(config
            .build_session(
                Arc::new(events::RecordingSink::new()),
                Arc::new(propagation::ManualClock::new())
            )
            .is_err());

        let mut config = Config::default();
        config.propagation.max_hop_loss = 1.0;
        assert!(config
            .build_session(
                Arc::new(events::RecordingSink::new()),
                Arc::new(propagation::ManualClock::new())
            )
            .is_err());
    }

    /// Combined test for YAML file loading and env var overrides.
    /// Runs as a single test to avoid parallel env var race conditions.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "PULSE_FORMATION",
                "PULSE_DENSITY",
                "PULSE_SEED",
                "PULSE_MAX_STEPS",
                "PULSE_DECAY_RATE",
                "PULSE_ACTIVATION_THRESHOLD",
                "PULSE_SLOTS",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
formation:
  default_formation: 2
  density: 0.5
propagation:
  max_steps: 80
session:
  pulse_slots: 4
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.formation.default_formation, 2);
        assert_eq!(config.formation.density, 0.5);
        assert_eq!(config.propagation.max_steps, 80);
        assert_eq!(config.session.pulse_slots, 4);

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("PULSE_FORMATION", "3");
        std::env::set_var("PULSE_SEED", "1234");
        std::env::set_var("PULSE_DECAY_RATE", "0.25");
        std::env::set_var("PULSE_SLOTS", "not-a-number");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.formation.default_formation, 3);
        assert_eq!(config.formation.seed, Some(1234));
        assert!((config.propagation.base_decay_rate - 0.25).abs() < f64::EPSILON);
        // Unparsable override ignored, YAML value kept
        assert_eq!(config.session.pulse_slots, 4);
        assert_eq!(config.propagation.max_steps, 80);

        clear_env();

        // --- Phase 3: Malformed YAML → defaults ---
        let bad_path = dir.path().join("bad.yaml");
        std::fs::write(&bad_path, "formation: [not, a, map").unwrap();
        let config = Config::from_yaml_and_env(Some(&bad_path)).unwrap();
        assert_eq!(config, Config::default());

        // --- Phase 4: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-pulse-config-12345.yaml");
        let config = Config::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config, Config::default());
    }
}
