//! Configuration for the swarm
//!
//! Settings come from defaults, the environment or a TOML file, and can be
//! adjusted with [`ConfigBuilder`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::agent::DEFAULT_MODEL;
use crate::error::{Result, SwarmError};

/// Global swarm configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Model used by agents built from this configuration
    pub default_model: String,

    /// Upper bound on backend calls per turn; `None` runs until the backend stops
    pub max_iterations: Option<usize>,

    /// Override for the OpenAI-compatible endpoint
    pub api_base: Option<String>,

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            max_iterations: None,
            api_base: None,
            log_filter: "info".to_string(),
        }
    }
}

/// Configuration builder
pub struct ConfigBuilder {
    config: SwarmConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SwarmConfig::default(),
        }
    }

    /// Start from an existing configuration instead of the defaults.
    pub fn from_config(config: SwarmConfig) -> Self {
        Self { config }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = Some(max);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.config.max_iterations = None;
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = Some(base.into());
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    pub fn build(self) -> SwarmConfig {
        self.config
    }
}

/// Load configuration from environment variables
///
/// Reads `SWARM_MODEL`, `SWARM_MAX_ITERATIONS`, `OPENAI_API_BASE` and
/// `SWARM_LOG`. Unset or unparseable values keep their defaults.
pub fn from_env() -> SwarmConfig {
    from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`from_env`], reading variables through `lookup`.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SwarmConfig {
    let mut config = SwarmConfig::default();

    if let Some(model) = lookup("SWARM_MODEL") {
        config.default_model = model;
    }

    if let Some(max) = lookup("SWARM_MAX_ITERATIONS") {
        if let Ok(max) = max.trim().parse::<usize>() {
            config.max_iterations = Some(max);
        }
    }

    if let Some(base) = lookup("OPENAI_API_BASE") {
        if !base.is_empty() {
            config.api_base = Some(base);
        }
    }

    if let Some(filter) = lookup("SWARM_LOG") {
        config.log_filter = filter;
    }

    config
}

/// Load configuration from a TOML file; missing keys take their defaults.
pub fn from_file(path: impl AsRef<Path>) -> Result<SwarmConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents)
        .map_err(|e| SwarmError::Config(format!("{}: {}", path.display(), e)))
}
