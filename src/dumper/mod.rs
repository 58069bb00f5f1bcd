//! Dumpers own the per-board fetch/persist run loop
//!
//! The pipeline factory hands a dumper its source reader and both
//! storage adapters and starts it; from then on the dumper is the only
//! scheduler for its board.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::BoardSettings;
use crate::model::{DeletedPost, Media, Topic};
use crate::source::{BoardSource, SourceError, ThreadSummary};
use crate::storage::{Local, StorageError};

#[derive(Debug, Error)]
pub enum DumperError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A started dumper owns its run loop until the task is aborted at
/// shutdown.
#[async_trait]
pub trait Dumper: Send + Sync {
    fn board(&self) -> &str;

    /// Take ownership of the run loop.
    fn start(self: Box<Self>) -> JoinHandle<()>;
}

/// How the loop decides which listed threads to refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Trust the index's last-modified stamps (JSON API).
    Incremental,
    /// Refetch everything listed each cycle (HTML scrape has no stamps).
    Full,
}

#[derive(Debug, Clone, Copy)]
struct ThreadState {
    last_modified: i64,
    page: u32,
}

/// The interval-driven dumper behind both the "DumperJSON" and
/// "DumperClassic" engine names.
pub struct BoardDumper {
    board: String,
    topics: Local,
    media: Local,
    source: Arc<dyn BoardSource>,
    full_thumbs: bool,
    full_media: bool,
    page_limbo: u32,
    refresh_delay: Duration,
    mode: RefreshMode,
}

impl BoardDumper {
    pub fn new(
        board: &str,
        topics: Local,
        media: Local,
        source: Arc<dyn BoardSource>,
        settings: &BoardSettings,
        mode: RefreshMode,
    ) -> Self {
        Self {
            board: board.to_string(),
            topics,
            media,
            source,
            full_thumbs: settings.full_thumbs(),
            full_media: settings.full_media(),
            page_limbo: settings.deleted_threads_threshold_page,
            // interval periods must be non-zero
            refresh_delay: Duration::from_secs(settings.refresh_delay.max(1)),
            mode,
        }
    }

    async fn run(&self) {
        info!(board = %self.board, refresh = ?self.refresh_delay, "dumper running");
        let mut known: HashMap<u64, ThreadState> = HashMap::new();
        // First tick fires immediately, so a fresh board is archived
        // without waiting out a full refresh interval.
        let mut ticker = tokio::time::interval(self.refresh_delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.cycle(&mut known).await {
                warn!(board = %self.board, error = %err, "fetch cycle failed");
            }
        }
    }

    async fn cycle(&self, known: &mut HashMap<u64, ThreadState>) -> Result<(), DumperError> {
        let list = self.source.fetch_thread_list().await?;

        for summary in &list {
            if self.needs_fetch(summary, known) {
                self.refresh_thread(summary, known).await?;
            } else if let Some(state) = known.get_mut(&summary.num) {
                state.page = summary.page;
            }
        }

        self.sweep_vanished(&list, known).await?;
        Ok(())
    }

    fn needs_fetch(&self, summary: &ThreadSummary, known: &HashMap<u64, ThreadState>) -> bool {
        match known.get(&summary.num) {
            Some(state) => {
                self.mode == RefreshMode::Full || summary.last_modified > state.last_modified
            }
            None => true,
        }
    }

    async fn refresh_thread(
        &self,
        summary: &ThreadSummary,
        known: &mut HashMap<u64, ThreadState>,
    ) -> Result<(), DumperError> {
        match self.source.fetch_thread(summary.num).await {
            Ok(topic) => {
                self.topics.insert(&topic).await?;
                self.archive_media(&topic).await;
                known.insert(
                    summary.num,
                    ThreadState {
                        last_modified: summary.last_modified,
                        page: summary.page,
                    },
                );
            }
            Err(SourceError::NotFound(num)) => {
                // Gone between the index fetch and ours.
                self.topics.mark_deleted(&DeletedPost::thread(num)).await?;
                known.remove(&num);
            }
            Err(err) => {
                warn!(board = %self.board, thread = summary.num, error = %err, "thread fetch failed");
            }
        }
        Ok(())
    }

    /// Threads that vanished from the index while still above the limbo
    /// page were deleted at the source; ones past it fell off naturally.
    async fn sweep_vanished(
        &self,
        list: &[ThreadSummary],
        known: &mut HashMap<u64, ThreadState>,
    ) -> Result<(), DumperError> {
        let vanished: Vec<(u64, ThreadState)> = known
            .iter()
            .filter(|(num, _)| !list.iter().any(|s| s.num == **num))
            .map(|(num, state)| (*num, *state))
            .collect();

        for (num, state) in vanished {
            if state.page < self.page_limbo {
                info!(board = %self.board, thread = num, page = state.page, "thread deleted at source");
                self.topics.mark_deleted(&DeletedPost::thread(num)).await?;
            }
            known.remove(&num);
        }
        Ok(())
    }

    async fn archive_media(&self, topic: &Topic) {
        if !self.full_thumbs && !self.full_media {
            return;
        }
        for post in topic.media_posts() {
            match self.media.get_media(&post).await {
                Ok(Some(_)) => continue, // already archived (or banned)
                Ok(None) => {}
                Err(err) => {
                    warn!(board = %self.board, media_hash = %post.media_hash, error = %err, "media lookup failed");
                    continue;
                }
            }

            if self.full_thumbs {
                if let Some(preview) = post.preview_filename.clone() {
                    self.fetch_and_store(&post, &preview, true).await;
                }
            }
            if self.full_media {
                if let Some(filename) = post.media_filename.clone() {
                    self.fetch_and_store(&post, &filename, false).await;
                }
            }

            self.media
                .remember_media(&Media {
                    media_hash: post.media_hash.clone(),
                    media: post.media_filename.clone(),
                    preview_op: post.op.then(|| post.preview_filename.clone()).flatten(),
                    preview_reply: (!post.op).then(|| post.preview_filename.clone()).flatten(),
                    banned: false,
                })
                .await;
        }
    }

    async fn fetch_and_store(
        &self,
        post: &crate::model::MediaPost,
        filename: &str,
        thumb: bool,
    ) {
        match self.source.fetch_media(filename, thumb).await {
            Ok(bytes) => {
                if let Err(err) = self.media.store_media(post, &bytes, thumb).await {
                    warn!(board = %self.board, filename, error = %err, "media store failed");
                }
            }
            Err(err) => {
                warn!(board = %self.board, filename, error = %err, "media fetch failed");
            }
        }
    }
}

#[async_trait]
impl Dumper for BoardDumper {
    fn board(&self) -> &str {
        &self.board
    }

    fn start(self: Box<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
