//! Engine configuration: step limit and default deadlines.
//!
//! Resolved with priority **env > `[engine]` table of `config.toml` > defaults**. The env
//! keys are `TOOLGRAPH_MAX_STEPS`, `TOOLGRAPH_RUN_TIMEOUT_MS` and
//! `TOOLGRAPH_NODE_TIMEOUT_MS`; a timeout of `0` disables it.
//!
//! ```rust
//! use toolgraph::EngineConfig;
//!
//! let config = EngineConfig::from_lookup(|key| match key {
//!     "TOOLGRAPH_MAX_STEPS" => Some("25".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//! assert_eq!(config.max_steps, 25);
//! assert!(config.run_timeout.is_none());
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use env_config::{EngineSection, LoadError};
use thiserror::Error;

pub const ENV_MAX_STEPS: &str = "TOOLGRAPH_MAX_STEPS";
pub const ENV_RUN_TIMEOUT_MS: &str = "TOOLGRAPH_RUN_TIMEOUT_MS";
pub const ENV_NODE_TIMEOUT_MS: &str = "TOOLGRAPH_NODE_TIMEOUT_MS";

/// Default bound on node dispatches per run.
pub const DEFAULT_MAX_STEPS: usize = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: `{value}` ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Settings the engine applies to every run of a compiled graph.
///
/// `run_timeout` is overridden per run by
/// [`RunContext::with_timeout`](crate::graph::RunContext::with_timeout); `node_timeout` is
/// overridden per node by `NodeOptions::timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_steps: usize,
    pub run_timeout: Option<Duration>,
    pub node_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            run_timeout: None,
            node_timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Like [`with_max_steps`](Self::with_max_steps) for untrusted input: `0` is rejected
    /// as an `InvalidValue` under `key`.
    pub fn try_with_max_steps(mut self, key: &str, max_steps: usize) -> Result<Self, ConfigError> {
        self.max_steps = check_max_steps(key, max_steps)?;
        Ok(self)
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup` (env-style keys).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().overlay_lookup(lookup)
    }

    /// Full resolution for `app`: defaults, then the XDG `config.toml` `[engine]` table,
    /// then the process environment.
    pub fn load(app_name: &str) -> Result<Self, ConfigError> {
        let section = env_config::load_engine_section(app_name)?;
        Self::default()
            .with_file_section(&section)?
            .overlay_lookup(|key| std::env::var(key).ok())
    }

    /// Overlays the fields set in a `[engine]` table.
    pub fn with_file_section(mut self, section: &EngineSection) -> Result<Self, ConfigError> {
        if let Some(max_steps) = section.max_steps {
            self.max_steps = check_max_steps("engine.max_steps", max_steps)?;
        }
        if let Some(ms) = section.run_timeout_ms {
            self.run_timeout = millis(ms);
        }
        if let Some(ms) = section.node_timeout_ms {
            self.node_timeout = millis(ms);
        }
        Ok(self)
    }

    fn overlay_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_STEPS) {
            let parsed = parse_num::<usize>(ENV_MAX_STEPS, &raw)?;
            self.max_steps = check_max_steps(ENV_MAX_STEPS, parsed)?;
        }
        if let Some(raw) = lookup(ENV_RUN_TIMEOUT_MS) {
            self.run_timeout = millis(parse_num::<u64>(ENV_RUN_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_NODE_TIMEOUT_MS) {
            self.node_timeout = millis(parse_num::<u64>(ENV_NODE_TIMEOUT_MS, &raw)?);
        }
        Ok(self)
    }
}

/// Parses into `T`; values out of its range are `InvalidValue`.
fn parse_num<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

fn check_max_steps(key: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: "0".to_string(),
            reason: "step limit must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
