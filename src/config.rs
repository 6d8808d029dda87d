use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::env::EnvironmentKind;
use crate::solver::AlgorithmKind;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("{algorithm} requires a model-based environment, {environment} does not expose transitions")]
    ModelRequired {
        algorithm: AlgorithmKind,
        environment: EnvironmentKind,
    },

    #[error("invalid environment options: {0}")]
    Environment(String),

    #[error("invalid value for {key}: {value}")]
    InvalidVariable { key: &'static str, value: String },
}

/// Environment-specific knobs. Every field falls back to the environment's
/// own default when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentOptions {
    #[serde(default)]
    pub grid_size: Option<usize>,
    #[serde(default)]
    pub slippery: Option<bool>,
    #[serde(default)]
    pub n_bins: Option<usize>,
}

/// Immutable description of one training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub environment: EnvironmentKind,
    pub algorithm: AlgorithmKind,
    #[serde(default = "default_discount_factor")]
    pub discount_factor: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Episode budget for learners, iteration budget for planners.
    #[serde(default = "default_n_episodes")]
    pub n_episodes: usize,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_n_step")]
    pub n_step: usize,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default = "default_first_visit")]
    pub first_visit: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub environment_options: EnvironmentOptions,
}

fn default_discount_factor() -> f64 {
    0.99
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_epsilon() -> f64 {
    0.1
}

fn default_n_episodes() -> usize {
    1000
}

fn default_max_steps() -> usize {
    500
}

fn default_n_step() -> usize {
    1
}

fn default_step_delay_ms() -> u64 {
    200
}

fn default_first_visit() -> bool {
    true
}

pub const MIN_STEP_DELAY_MS: u64 = 1;
pub const MAX_STEP_DELAY_MS: u64 = 1000;
pub const MAX_GRID_SIZE: usize = 64;
pub const MAX_BINS: usize = 50;

impl TrainingConfig {
    pub fn new(environment: EnvironmentKind, algorithm: AlgorithmKind) -> Self {
        Self {
            environment,
            algorithm,
            discount_factor: default_discount_factor(),
            learning_rate: default_learning_rate(),
            epsilon: default_epsilon(),
            n_episodes: default_n_episodes(),
            max_steps: default_max_steps(),
            n_step: default_n_step(),
            step_delay_ms: default_step_delay_ms(),
            first_visit: default_first_visit(),
            seed: None,
            environment_options: EnvironmentOptions::default(),
        }
    }

    /// Checks parameter ranges. Environment/algorithm compatibility needs an
    /// environment instance and is checked by the solver factory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("discount_factor", self.discount_factor)?;
        check_unit("learning_rate", self.learning_rate)?;
        check_unit("epsilon", self.epsilon)?;
        check_positive("n_episodes", self.n_episodes)?;
        check_positive("max_steps", self.max_steps)?;
        check_positive("n_step", self.n_step)?;
        if !(MIN_STEP_DELAY_MS..=MAX_STEP_DELAY_MS).contains(&self.step_delay_ms) {
            return Err(ConfigError::OutOfRange {
                field: "step_delay_ms",
                value: self.step_delay_ms as f64,
                min: MIN_STEP_DELAY_MS as f64,
                max: MAX_STEP_DELAY_MS as f64,
            });
        }
        if let Some(size) = self.environment_options.grid_size {
            check_bounded("environment_options.grid_size", size, MAX_GRID_SIZE)?;
        }
        if let Some(bins) = self.environment_options.n_bins {
            check_bounded("environment_options.n_bins", bins, MAX_BINS)?;
        }
        Ok(())
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    // NaN fails the range check as well
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

fn check_positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field })
    }
}

fn check_bounded(field: &'static str, value: usize, max: usize) -> Result<(), ConfigError> {
    check_positive(field, value)?;
    if value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value: value as f64,
            min: 1.0,
            max: max as f64,
        });
    }
    Ok(())
}

/// Process-level settings for the session registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub max_sessions: usize,
    pub session_ttl: Duration,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_sessions: 100,
            session_ttl: Duration::from_secs(3600),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub const MAX_SESSIONS_VAR: &'static str = "TABULA_MAX_SESSIONS";
    pub const SESSION_TTL_VAR: &'static str = "TABULA_SESSION_TTL_SECS";
    pub const LOG_LEVEL_VAR: &'static str = "TABULA_LOG_LEVEL";

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source, starting from
    /// the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(Self::MAX_SESSIONS_VAR) {
            config.max_sessions = parse_var(Self::MAX_SESSIONS_VAR, &raw)?;
            check_positive(Self::MAX_SESSIONS_VAR, config.max_sessions)?;
        }
        if let Some(raw) = lookup(Self::SESSION_TTL_VAR) {
            let secs: u64 = parse_var(Self::SESSION_TTL_VAR, &raw)?;
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(Self::LOG_LEVEL_VAR) {
            let level = raw.trim();
            if !level.is_empty() {
                config.log_level = level.to_string();
            }
        }

        Ok(config)
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidVariable {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn deserializes_with_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"environment": "frozenlake", "algorithm": "q_learning"}"#)
                .unwrap();

        assert_eq!(config.environment, EnvironmentKind::FrozenLake);
        assert_eq!(config.algorithm, AlgorithmKind::QLearning);
        assert_eq!(config.discount_factor, 0.99);
        assert_eq!(config.n_episodes, 1000);
        assert_eq!(config.step_delay_ms, 200);
        assert!(config.first_visit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let mut config = TrainingConfig::new(EnvironmentKind::GridWorld, AlgorithmKind::Sarsa);
        config.learning_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "learning_rate",
                ..
            })
        ));

        let mut config = TrainingConfig::new(EnvironmentKind::GridWorld, AlgorithmKind::Sarsa);
        config.epsilon = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = TrainingConfig::new(EnvironmentKind::GridWorld, AlgorithmKind::Sarsa);
        config.n_step = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "n_step" })
        );

        let mut config = TrainingConfig::new(EnvironmentKind::GridWorld, AlgorithmKind::Sarsa);
        config.step_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_environments() {
        let mut config = TrainingConfig::new(EnvironmentKind::CartPole, AlgorithmKind::QLearning);
        config.environment_options.n_bins = Some(70_000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "environment_options.n_bins",
                ..
            })
        ));
        config.environment_options.n_bins = Some(MAX_BINS);
        assert!(config.validate().is_ok());

        let mut config = TrainingConfig::new(EnvironmentKind::GridWorld, AlgorithmKind::Sarsa);
        config.environment_options.grid_size = Some(MAX_GRID_SIZE + 1);
        assert!(config.validate().is_err());
        config.environment_options.grid_size = Some(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "environment_options.grid_size"
            })
        );
    }

    #[test]
    fn service_config_reads_overrides() {
        let vars: HashMap<&str, &str> = [
            (ServiceConfig::MAX_SESSIONS_VAR, "3"),
            (ServiceConfig::SESSION_TTL_VAR, "60"),
        ]
        .into_iter()
        .collect();

        let config = ServiceConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.max_sessions, 3);
        assert_eq!(config.session_ttl, Duration::from_secs(60));
        assert_eq!(config.log_level, "info");

        let err = ServiceConfig::from_lookup(|key| {
            (key == ServiceConfig::MAX_SESSIONS_VAR).then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVariable { .. }));
    }
}
