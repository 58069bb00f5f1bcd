//! Capability registry: closed engine sets for the three pipeline axes
//!
//! Each axis (source reader, storage backend, dumper) maps a
//! configuration-supplied name to one variant of a closed enum; the
//! variant carries the constructor for its implementation. Resolution is
//! a pure lookup fixed at build time, with an explicit unknown-name
//! error naming the axis.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::BoardSettings;
use crate::dumper::{BoardDumper, Dumper, RefreshMode};
use crate::source::{BoardSource, Result as SourceResult, YotsubaHtml, YotsubaJson};
use crate::storage::{Local, MysqlStorage, PgsqlStorage, Result as StorageResult, ThreadStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineAxis {
    Source,
    Storage,
    Dumper,
}

impl fmt::Display for EngineAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineAxis::Source => f.write_str("source"),
            EngineAxis::Storage => f.write_str("storage"),
            EngineAxis::Dumper => f.write_str("dumper"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown {axis} engine: {name}")]
    Unknown { axis: EngineAxis, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEngine {
    YotsubaJson,
    YotsubaHtml,
}

impl SourceEngine {
    pub fn resolve(name: &str) -> Result<Self, EngineError> {
        match name {
            "YotsubaJSON" => Ok(SourceEngine::YotsubaJson),
            "YotsubaHTML" => Ok(SourceEngine::YotsubaHtml),
            other => Err(EngineError::Unknown {
                axis: EngineAxis::Source,
                name: other.to_string(),
            }),
        }
    }

    pub fn build(
        self,
        board: &str,
        settings: &BoardSettings,
    ) -> SourceResult<Arc<dyn BoardSource>> {
        Ok(match self {
            SourceEngine::YotsubaJson => Arc::new(YotsubaJson::new(board, settings)?),
            SourceEngine::YotsubaHtml => Arc::new(YotsubaHtml::new(board, settings)?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEngine {
    Mysql,
    Pgsql,
}

impl StorageEngine {
    pub fn resolve(name: &str) -> Result<Self, EngineError> {
        match name {
            "Mysql" => Ok(StorageEngine::Mysql),
            "Pgsql" => Ok(StorageEngine::Pgsql),
            other => Err(EngineError::Unknown {
                axis: EngineAxis::Storage,
                name: other.to_string(),
            }),
        }
    }

    /// Each call constructs an independent backend instance (own pool);
    /// the factory calls this twice per board on purpose.
    pub fn build(self, settings: &BoardSettings) -> StorageResult<Arc<dyn ThreadStorage>> {
        Ok(match self {
            StorageEngine::Mysql => Arc::new(MysqlStorage::new(settings)?),
            StorageEngine::Pgsql => Arc::new(PgsqlStorage::new(settings)?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumperEngine {
    DumperJson,
    DumperClassic,
}

impl DumperEngine {
    pub fn resolve(name: &str) -> Result<Self, EngineError> {
        match name {
            "DumperJSON" => Ok(DumperEngine::DumperJson),
            "DumperClassic" => Ok(DumperEngine::DumperClassic),
            other => Err(EngineError::Unknown {
                axis: EngineAxis::Dumper,
                name: other.to_string(),
            }),
        }
    }

    pub fn build(
        self,
        board: &str,
        topics: Local,
        media: Local,
        source: Arc<dyn BoardSource>,
        settings: &BoardSettings,
    ) -> Box<dyn Dumper> {
        let mode = match self {
            DumperEngine::DumperJson => RefreshMode::Incremental,
            DumperEngine::DumperClassic => RefreshMode::Full,
        };
        Box::new(BoardDumper::new(board, topics, media, source, settings, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve() {
        assert_eq!(
            SourceEngine::resolve("YotsubaJSON").unwrap(),
            SourceEngine::YotsubaJson
        );
        assert_eq!(
            SourceEngine::resolve("YotsubaHTML").unwrap(),
            SourceEngine::YotsubaHtml
        );
        assert_eq!(StorageEngine::resolve("Mysql").unwrap(), StorageEngine::Mysql);
        assert_eq!(StorageEngine::resolve("Pgsql").unwrap(), StorageEngine::Pgsql);
        assert_eq!(
            DumperEngine::resolve("DumperJSON").unwrap(),
            DumperEngine::DumperJson
        );
        assert_eq!(
            DumperEngine::resolve("DumperClassic").unwrap(),
            DumperEngine::DumperClassic
        );
    }

    #[test]
    fn unknown_name_reports_axis_and_name() {
        let err = StorageEngine::resolve("Sqlite").unwrap_err();
        assert_eq!(err.to_string(), "unknown storage engine: Sqlite");

        let err = SourceEngine::resolve("Bogus").unwrap_err();
        assert_eq!(err.to_string(), "unknown source engine: Bogus");

        let err = DumperEngine::resolve("DumperXML").unwrap_err();
        assert_eq!(err.to_string(), "unknown dumper engine: DumperXML");
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!(StorageEngine::resolve("mysql").is_err());
    }
}
