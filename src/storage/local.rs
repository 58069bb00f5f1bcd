//! Path-aware storage adapter handed to dumpers as an opaque sink
//!
//! `Local` binds one backend instance to the board's archive directory
//! and interposes the optional cache: duplicate topics are skipped
//! before they reach persistent storage, media lookups hit the cache
//! first and prime it on backend hits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{Result, ThreadStorage};
use crate::cache::RedisCache;
use crate::model::{DeletedPost, Media, MediaPost, Topic};

pub struct Local {
    path: PathBuf,
    storage: Arc<dyn ThreadStorage>,
    cache: Option<Arc<RedisCache>>,
}

impl Local {
    /// Bind `storage` to the board directory, creating the media layout
    /// (`thumb/`, `media/`) if missing.
    pub fn new(
        path: impl Into<PathBuf>,
        storage: Arc<dyn ThreadStorage>,
        cache: Option<Arc<RedisCache>>,
    ) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(path.join("thumb"))?;
        std::fs::create_dir_all(path.join("media"))?;
        Ok(Self {
            path,
            storage,
            cache,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a topic, short-circuiting when the cache has already seen
    /// this exact content.
    pub async fn insert(&self, topic: &Topic) -> Result<()> {
        if let Some(cache) = &self.cache {
            if cache.is_duplicate(topic).await {
                debug!(thread = topic.num, "unchanged topic, skipping insert");
                return Ok(());
            }
        }
        self.storage.insert(topic).await?;
        if let Some(cache) = &self.cache {
            // Soft-fail: records the content hash when connected.
            cache.insert(topic).await?;
        }
        Ok(())
    }

    pub async fn mark_deleted(&self, post: &DeletedPost) -> Result<()> {
        self.storage.mark_deleted(post).await?;
        if let Some(cache) = &self.cache {
            cache.mark_deleted(post).await?;
        }
        Ok(())
    }

    /// Media dedup lookup: cache first, backend on miss, cache primed on
    /// a backend hit.
    pub async fn get_media(&self, post: &MediaPost) -> Result<Option<Media>> {
        if let Some(cache) = &self.cache {
            if let Some(media) = cache.get_media(post).await? {
                debug!(media_hash = %post.media_hash, "media served from cache");
                return Ok(Some(media));
            }
        }
        let media = self.storage.get_media(post).await?;
        if let (Some(cache), Some(media)) = (&self.cache, &media) {
            cache.put_media(media).await;
        }
        Ok(media)
    }

    /// Remember a freshly archived media row so the next dedup lookup is
    /// served from the cache. A no-op without a cache.
    pub async fn remember_media(&self, media: &Media) {
        if let Some(cache) = &self.cache {
            cache.put_media(media).await;
        }
    }

    /// Write fetched media bytes under the board directory.
    pub async fn store_media(&self, post: &MediaPost, bytes: &[u8], thumb: bool) -> Result<PathBuf> {
        let filename = if thumb {
            post.preview_filename.as_deref()
        } else {
            post.media_filename.as_deref()
        };
        let subdir = if thumb { "thumb" } else { "media" };
        let target = self
            .path
            .join(subdir)
            .join(filename.unwrap_or(&post.media_hash));
        tokio::fs::write(&target, bytes).await?;
        debug!(path = %target.display(), size = bytes.len(), "media stored");
        Ok(target)
    }
}
