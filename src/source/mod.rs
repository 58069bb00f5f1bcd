//! Source readers: fetch and parse board content from the remote site

mod yotsuba;

pub use yotsuba::{YotsubaHtml, YotsubaJson};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::model::Topic;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("thread {0} not found at source")]
    NotFound(u64),

    #[error("cannot parse source payload: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// One entry of the board's thread index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSummary {
    pub num: u64,
    pub last_modified: i64,
    /// Zero-based page the thread currently sits on.
    pub page: u32,
}

/// Fetch-and-parse seam for one board's remote source.
#[async_trait]
pub trait BoardSource: Send + Sync {
    /// The board's current thread index, front page first.
    async fn fetch_thread_list(&self) -> Result<Vec<ThreadSummary>>;

    /// One full thread with its posts.
    async fn fetch_thread(&self, num: u64) -> Result<Topic>;

    /// Raw media bytes for a stored filename (thumb or full image).
    async fn fetch_media(&self, filename: &str, thumb: bool) -> Result<Bytes>;
}
