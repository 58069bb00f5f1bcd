use serde::Deserialize;
use std::collections::HashMap;

/// Top-level settings document.
///
/// The `boards` map holds one entry per archived board plus a `default`
/// entry serving as the inheritance base; `default` itself is never
/// spawned.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Dumper engine name applied to every board. Defaults to "DumperJSON".
    pub dumper_engine: Option<String>,
    /// Source engine name applied to every board. Defaults to "YotsubaJSON".
    pub source_engine: Option<String>,
    #[serde(default)]
    pub boards: HashMap<String, BoardOverrides>,
    /// Presence enables the write-through Redis cache for every board.
    pub redis_cache: Option<RedisCacheConfig>,
}

/// Per-board settings as written in the document. Every field is optional;
/// unset fields inherit from the `default` entry during resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardOverrides {
    pub path: Option<String>,
    pub table: Option<String>,
    /// Storage engine name ("Mysql" or "Pgsql").
    pub engine: Option<String>,
    /// Database connection URL handed to the storage backend.
    pub database: Option<String>,
    pub thumb_threads: Option<u32>,
    pub media_threads: Option<u32>,
    /// Page depth past which a vanished thread counts as deleted.
    pub deleted_threads_threshold_page: Option<u32>,
    /// Seconds between fetch cycles.
    pub refresh_delay: Option<u64>,
}

/// Fully resolved settings for one board. Every field is populated once
/// resolution succeeds; nothing is re-resolved for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSettings {
    pub board: String,
    pub path: String,
    pub table: String,
    /// Left unset here when neither layer names an engine; the pipeline
    /// factory applies the built-in default.
    pub engine: Option<String>,
    pub database: Option<String>,
    pub thumb_threads: u32,
    pub media_threads: u32,
    pub deleted_threads_threshold_page: u32,
    pub refresh_delay: u64,
}

impl BoardSettings {
    /// Archive thumbnails for every thread, not just the top N.
    pub fn full_thumbs(&self) -> bool {
        self.thumb_threads != 0
    }

    /// Archive full media for every thread, not just the top N.
    pub fn full_media(&self) -> bool {
        self.media_threads != 0
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedisCacheConfig {
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    pub password: Option<String>,
}

fn default_redis_port() -> u16 {
    6379
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_settings_document() {
        let doc = r#"{
            "dumperEngine": "DumperJSON",
            "sourceEngine": "YotsubaJSON",
            "boards": {
                "default": {"path": "/archive", "database": "mysql://u:p@localhost/archive"},
                "g": {"thumbThreads": 10}
            },
            "redisCache": {"host": "127.0.0.1", "port": 6380, "password": "hunter2"}
        }"#;

        let config: Config = serde_json::from_str(doc).unwrap();
        assert_eq!(config.dumper_engine.as_deref(), Some("DumperJSON"));
        assert_eq!(config.boards.len(), 2);
        assert_eq!(config.boards["g"].thumb_threads, Some(10));

        let cache = config.redis_cache.unwrap();
        assert_eq!(cache.host, "127.0.0.1");
        assert_eq!(cache.port, 6380);
        assert_eq!(cache.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn redis_port_defaults() {
        let cache: RedisCacheConfig =
            serde_json::from_str(r#"{"host": "redis.local"}"#).unwrap();
        assert_eq!(cache.port, 6379);
        assert!(cache.password.is_none());
    }

    #[test]
    fn full_archival_flags_derive_from_thresholds() {
        let settings = BoardSettings {
            board: "g".into(),
            path: "/archive/g/".into(),
            table: "g".into(),
            engine: None,
            database: None,
            thumb_threads: 0,
            media_threads: 5,
            deleted_threads_threshold_page: 7,
            refresh_delay: 30,
        };
        assert!(!settings.full_thumbs());
        assert!(settings.full_media());
    }
}
