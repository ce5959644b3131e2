//! Simulation configuration.
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a
//! valid configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest chaos repeat interval accepted. Shorter requests are raised to this.
pub const MIN_CHAOS_INTERVAL_MS: u64 = 250;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failure probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("Chaos interval too short ({interval_ms} ms, min {min_ms} ms)")]
    IntervalTooShort { interval_ms: u64, min_ms: u64 },

    #[error("History limit must be at least 1")]
    EmptyHistory,
}

/// What a chaos round does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosSubMode {
    /// Fail a random handful of nodes and show the cascade.
    #[default]
    RandomFailure,
    /// Sever random edges and show the resulting split.
    NetworkPartition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Milliseconds between automatic rounds.
    pub interval_ms: u64,
    /// Upper bound on nodes failed in one random-failure round.
    pub max_failures_per_round: usize,
    /// Per-candidate acceptance probability in random-failure rounds.
    pub failure_probability: f64,
    /// Never chaos-targeted; edges between two protected nodes are never severed.
    pub protected_node_ids: BTreeSet<String>,
    pub sub_mode: ChaosSubMode,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            max_failures_per_round: 2,
            failure_probability: 0.3,
            protected_node_ids: BTreeSet::new(),
            sub_mode: ChaosSubMode::RandomFailure,
        }
    }
}

impl ChaosConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(ConfigError::InvalidProbability(self.failure_probability));
        }
        if self.interval_ms < MIN_CHAOS_INTERVAL_MS {
            return Err(ConfigError::IntervalTooShort {
                interval_ms: self.interval_ms,
                min_ms: MIN_CHAOS_INTERVAL_MS,
            });
        }
        Ok(())
    }

    /// Coerce out-of-range values into range instead of rejecting them.
    pub fn normalized(mut self) -> Self {
        self.failure_probability = if self.failure_probability.is_finite() {
            self.failure_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.interval_ms = self.interval_ms.max(MIN_CHAOS_INTERVAL_MS);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// RNG seed for chaos rounds. `None` draws one per orchestrator.
    pub seed: Option<u64>,
    /// Chaos rounds kept in the session history.
    pub history_limit: usize,
    pub chaos: ChaosConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            history_limit: 50,
            chaos: ChaosConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        self.chaos.validate()
    }
}
