//! Configuration loading and per-board settings resolution
//!
//! The settings document is a single JSON object, read either from a file
//! path or from standard input when the path is `-`. A missing or
//! malformed document is fatal at startup; everything board-specific is
//! resolved later, per board, by the [`resolver`].

mod models;
pub mod resolver;

pub use models::{BoardOverrides, BoardSettings, Config, RedisCacheConfig};

use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings: {0}")]
    Read(#[from] std::io::Error),

    #[error("settings document is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no `default` entry in board settings")]
    MissingDefaults,

    #[error("board {board}: `{field}` set neither on the board nor in defaults")]
    MissingField { board: String, field: &'static str },
}

impl Config {
    /// Load the settings document from `path`, or from standard input
    /// when `path` is `-`. The `default` inheritance base must be
    /// present; its absence fails the load before any board is attempted.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let document = if path == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(path)?
        };
        let config: Self = serde_json::from_str(&document)?;
        if !config.boards.contains_key("default") {
            return Err(ConfigError::MissingDefaults);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("asagi.json");
        fs::write(
            &path,
            r#"{"boards": {"default": {"path": "/archive"}, "g": {}}}"#,
        )
        .unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.boards.len(), 2);
        assert!(config.redis_cache.is_none());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load("/nonexistent/asagi.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }

    #[test]
    fn document_without_defaults_fails_the_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("asagi.json");
        fs::write(&path, r#"{"boards": {"a": {}, "b": {}}}"#).unwrap();

        let err = Config::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDefaults));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("asagi.json");
        fs::write(&path, "{boards: nope").unwrap();

        let err = Config::load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
