//! Configuration System
//!
//! Hierarchical configuration loading from:
//! - built-in defaults
//! - fixlog.toml (project-local overrides)
//! - Environment variables (FIXLOG_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # fixlog.toml
//! [solver]
//! parallel = true
//! max_iterations = 10000
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! FIXLOG_SOLVER__PARALLEL=true
//! FIXLOG_LOGGING__LEVEL=trace
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fixed-point driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Evaluate the constraints of a stratum iteration in parallel.
    /// Emissions are still applied serially, so results are identical.
    #[serde(default)]
    pub parallel: bool,

    /// Abort saturation after this many iterations of a single stratum.
    /// `None` trusts the finite-height contract of user lattices.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            parallel: false,
            max_iterations: None,
        }
    }
}

/// Logging configuration consumed by the host when installing a
/// tracing subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter, e.g. "info" or "fixlog=debug".
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// The layered figment: defaults, then `fixlog.toml`, then `FIXLOG_*`
    /// environment variables (`__` separates nesting levels).
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("fixlog.toml"))
            .merge(Env::prefixed("FIXLOG_").split("__"))
    }

    /// Load the effective configuration.
    pub fn load() -> Result<Config, figment::Error> {
        Config::figment().extract()
    }
}
