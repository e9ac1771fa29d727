//! Configuration (spec §4.8).
//!
//! Loaded hierarchically from:
//! - `logica.toml` (base configuration)
//! - `logica.local.toml` (git-ignored local overrides)
//! - Environment variables (`LOGICA_*` prefix, `__` nesting separator)
//!
//! ## Example
//!
//! ```toml
//! # logica.toml
//! default_engine = "sqlite"
//! import_roots = ["./logica"]
//! recursion_default_depth = 8
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! LOGICA_DEFAULT_ENGINE=psql
//! LOGICA_LOGGING__LEVEL=debug
//! ```

use crate::dialect::Engine;
use crate::universe::DEFAULT_RECURSION_DEPTH;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_engine")]
    pub default_engine: Engine,

    #[serde(default)]
    pub import_roots: Vec<PathBuf>,

    #[serde(default = "default_recursion_depth")]
    pub recursion_default_depth: u32,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Log level/format, consulted by the CLI to install its `tracing-subscriber`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_engine() -> Engine {
    Engine::Sqlite
}

fn default_recursion_depth() -> u32 {
    DEFAULT_RECURSION_DEPTH
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from the default on-disk locations, merging
    /// `logica.toml` < `logica.local.toml` < `LOGICA_*` environment
    /// variables, in that order (later sources win).
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("logica.toml"))
            .merge(Toml::file("logica.local.toml"))
            .merge(Env::prefixed("LOGICA_").split("__"))
            .extract()
    }

    /// Load configuration from one explicit file path, still overridable by
    /// `LOGICA_*` environment variables.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LOGICA_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_engine: default_engine(),
            import_roots: Vec::new(),
            recursion_default_depth: default_recursion_depth(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sqlite_and_default_recursion_depth() {
        let config = Config::default();
        assert_eq!(config.default_engine, Engine::Sqlite);
        assert_eq!(config.recursion_default_depth, DEFAULT_RECURSION_DEPTH);
        assert!(config.import_roots.is_empty());
    }

    #[test]
    fn from_file_merges_env_overrides() {
        std::env::set_var("LOGICA_DEFAULT_ENGINE", "psql");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logica.toml");
        std::fs::write(&path, "recursion_default_depth = 3\n").unwrap();
        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.recursion_default_depth, 3);
        assert_eq!(config.default_engine, Engine::Psql);
        std::env::remove_var("LOGICA_DEFAULT_ENGINE");
    }
}
