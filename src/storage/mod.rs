//! Storage seam: the backend trait, SQL implementations and the
//! path-aware `Local` adapter handed to dumpers

mod local;
mod mysql;
mod pgsql;

pub use local::Local;
pub use mysql::MysqlStorage;
pub use pgsql::PgsqlStorage;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::CacheError;
use crate::model::{DeletedPost, Media, MediaPost, Topic};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("board {0}: no database URL configured")]
    MissingDatabaseUrl(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Capability set shared by persistent backends and the cache layer.
///
/// Two instances are constructed per board (topic writes, media writes)
/// so the two streams never contend on one connection's session state.
#[async_trait]
pub trait ThreadStorage: Send + Sync {
    /// Acquire a connection and verify liveness.
    async fn connect(&self) -> Result<()>;

    /// Re-acquire after a transport failure.
    async fn reconnect(&self) -> Result<()>;

    /// Persist a topic and its posts. Re-inserting an unchanged topic
    /// must be harmless (upsert semantics).
    async fn insert(&self, topic: &Topic) -> Result<()>;

    /// Flag a post (or a whole thread via its opening post) as deleted
    /// at the source.
    async fn mark_deleted(&self, post: &DeletedPost) -> Result<()>;

    /// Look up a previously stored media record for dedup.
    async fn get_media(&self, post: &MediaPost) -> Result<Option<Media>>;
}
