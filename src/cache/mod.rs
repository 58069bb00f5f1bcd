//! Write-through Redis cache interposed in front of persistent storage
//!
//! The cache implements the same capability set as a storage backend but
//! is an optimization, never a correctness dependency: every operation
//! invoked while disconnected degrades to a logged no-op and the caller
//! falls through to persistent storage. Dedup keys:
//!
//! - `{table}:thread:{num}` holds a sha256 hash over the thread's post
//!   tuple; an unchanged hash means the topic write can be skipped.
//! - `{table}:media:{media_hash}` caches the serialized media row so a
//!   backend lookup (and a refetch) can be skipped.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{BoardSettings, RedisCacheConfig};
use crate::model::{DeletedPost, Media, MediaPost, Topic};
use crate::storage::{self, ThreadStorage};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis connection attempt timed out")]
    Timeout,
}

/// Per-board cache instance over the process-wide connection settings.
///
/// Constructed in the {Uninitialized} state; [`RedisCache::connect`]
/// moves it to {Connected}. There is no closed state: the connection
/// manager lives as long as the process.
pub struct RedisCache {
    table: String,
    client: redis::Client,
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisCache {
    pub fn new(config: &RedisCacheConfig, settings: &BoardSettings) -> Result<Self, CacheError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                password: config.password.clone(),
                ..Default::default()
            },
        };
        Ok(Self {
            table: settings.table.clone(),
            client: redis::Client::open(info)?,
            conn: RwLock::new(None),
        })
    }

    /// Acquire a managed connection and verify liveness with a PING.
    pub async fn connect(&self) -> Result<(), CacheError> {
        let mut manager = tokio::time::timeout(CONNECT_TIMEOUT, self.client.get_connection_manager())
            .await
            .map_err(|_| CacheError::Timeout)??;
        let _: String = redis::cmd("PING").query_async(&mut manager).await?;
        *self.conn.write().await = Some(manager);
        Ok(())
    }

    /// Whether a connection has been established. Documented precondition
    /// of every operation: without it they are no-ops.
    pub async fn is_connected(&self) -> bool {
        self.conn.read().await.is_some()
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.conn.read().await.clone()
    }

    fn thread_key(&self, num: u64) -> String {
        format!("{}:thread:{}", self.table, num)
    }

    fn media_key(&self, media_hash: &str) -> String {
        format!("{}:media:{}", self.table, media_hash)
    }

    /// True when the stored content hash for this thread matches, i.e.
    /// the topic is unchanged since the last recorded insert. Always
    /// false while disconnected.
    pub async fn is_duplicate(&self, topic: &Topic) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let key = self.thread_key(topic.num);
        match conn.get::<_, Option<String>>(&key).await {
            Ok(stored) => stored.as_deref() == Some(content_hash(topic).as_str()),
            Err(err) => {
                warn!(key, error = %err, "cache lookup failed, treating as miss");
                false
            }
        }
    }

    /// Prime the media key after a persistent-storage hit.
    pub async fn put_media(&self, media: &Media) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let Ok(value) = serde_json::to_string(media) else {
            return;
        };
        let key = self.media_key(&media.media_hash);
        if let Err(err) = conn.set::<_, _, ()>(&key, value).await {
            warn!(key, error = %err, "cache media write failed");
        }
    }
}

#[async_trait]
impl ThreadStorage for RedisCache {
    async fn connect(&self) -> storage::Result<()> {
        RedisCache::connect(self).await?;
        Ok(())
    }

    async fn reconnect(&self) -> storage::Result<()> {
        RedisCache::connect(self).await?;
        Ok(())
    }

    /// Record the topic's content hash. A no-op while disconnected.
    async fn insert(&self, topic: &Topic) -> storage::Result<()> {
        let Some(mut conn) = self.connection().await else {
            debug!(thread = topic.num, "cache disconnected, skipping insert");
            return Ok(());
        };
        let key = self.thread_key(topic.num);
        if let Err(err) = conn.set::<_, _, ()>(&key, content_hash(topic)).await {
            warn!(key, error = %err, "cache insert failed");
        }
        Ok(())
    }

    /// Drop the thread key so a resurrected thread is never suppressed
    /// by a stale hash. A no-op while disconnected.
    async fn mark_deleted(&self, post: &DeletedPost) -> storage::Result<()> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };
        let key = self.thread_key(post.thread_num);
        if let Err(err) = conn.del::<_, ()>(&key).await {
            warn!(key, error = %err, "cache delete failed");
        }
        Ok(())
    }

    /// Cached media row, or None on miss or while disconnected.
    async fn get_media(&self, post: &MediaPost) -> storage::Result<Option<Media>> {
        let Some(mut conn) = self.connection().await else {
            return Ok(None);
        };
        let key = self.media_key(&post.media_hash);
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(value)) => Ok(serde_json::from_str(&value).ok()),
            Ok(None) => Ok(None),
            Err(err) => {
                warn!(key, error = %err, "cache media lookup failed, treating as miss");
                Ok(None)
            }
        }
    }
}

/// Content hash over the tuple of post fields that matter for re-insert
/// decisions. Stable across fetches of an unchanged thread.
pub fn content_hash(topic: &Topic) -> String {
    let mut hasher = Sha256::new();
    for post in &topic.posts {
        hasher.update(post.num.to_be_bytes());
        hasher.update(post.subnum.to_be_bytes());
        hasher.update(post.comment.as_deref().unwrap_or("").as_bytes());
        hasher.update([post.deleted as u8]);
        hasher.update(post.media_hash.as_deref().unwrap_or("").as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Post;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    /// Minimal RESP server backed by a shared key/value map. Answers
    /// PING/GET/SET/DEL and acknowledges everything else with +OK.
    async fn serve_client(socket: TcpStream, store: Arc<Mutex<HashMap<String, String>>>) {
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Some(argc) = line.strip_prefix('*').and_then(|n| n.parse::<usize>().ok())
            else {
                continue;
            };
            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
                // Bulk length line, then the argument itself.
                let Ok(Some(_)) = lines.next_line().await else { return };
                let Ok(Some(arg)) = lines.next_line().await else { return };
                args.push(arg);
            }
            let reply = match args.first().map(|c| c.to_ascii_uppercase()).as_deref() {
                Some("PING") => "+PONG\r\n".to_string(),
                Some("GET") => {
                    match args.get(1).and_then(|k| store.lock().unwrap().get(k).cloned()) {
                        Some(value) => format!("${}\r\n{value}\r\n", value.len()),
                        None => "$-1\r\n".to_string(),
                    }
                }
                Some("SET") => {
                    if let (Some(key), Some(value)) = (args.get(1), args.get(2)) {
                        store.lock().unwrap().insert(key.clone(), value.clone());
                    }
                    "+OK\r\n".to_string()
                }
                Some("DEL") => {
                    if let Some(key) = args.get(1) {
                        store.lock().unwrap().remove(key);
                    }
                    ":1\r\n".to_string()
                }
                _ => "+OK\r\n".to_string(),
            };
            if write.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    async fn spawn_redis_stub() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_client(socket, store.clone()));
            }
        });
        addr
    }

    fn settings() -> BoardSettings {
        BoardSettings {
            board: "g".into(),
            path: "/archive/g/".into(),
            table: "g".into(),
            engine: None,
            database: None,
            thumb_threads: 0,
            media_threads: 0,
            deleted_threads_threshold_page: 0,
            refresh_delay: 30,
        }
    }

    fn unreachable_cache() -> RedisCache {
        let config = RedisCacheConfig {
            host: "127.0.0.1".into(),
            port: 1,
            password: None,
        };
        RedisCache::new(&config, &settings()).unwrap()
    }

    fn topic(comment: &str) -> Topic {
        Topic {
            num: 100,
            last_modified: None,
            posts: vec![Post {
                num: 100,
                op: true,
                comment: Some(comment.into()),
                ..Default::default()
            }],
        }
    }

    #[tokio::test]
    async fn operations_while_disconnected_never_error() {
        let cache = unreachable_cache();
        assert!(!cache.is_connected().await);

        assert!(ThreadStorage::insert(&cache, &topic("hello")).await.is_ok());
        assert!(
            ThreadStorage::mark_deleted(&cache, &DeletedPost::thread(100))
                .await
                .is_ok()
        );
        let media = ThreadStorage::get_media(
            &cache,
            &MediaPost {
                thread_num: 100,
                num: 100,
                op: true,
                media_hash: "abc".into(),
                media_filename: None,
                preview_filename: None,
            },
        )
        .await
        .unwrap();
        assert!(media.is_none());
        assert!(!cache.is_duplicate(&topic("hello")).await);
    }

    #[tokio::test]
    async fn reconnect_restores_cache_operation() {
        let addr = spawn_redis_stub().await;
        let config = RedisCacheConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            password: None,
        };
        let cache = RedisCache::new(&config, &settings()).unwrap();

        // Disconnected phase: the insert is accepted but records nothing.
        ThreadStorage::insert(&cache, &topic("hello")).await.unwrap();
        assert!(!cache.is_duplicate(&topic("hello")).await);

        ThreadStorage::reconnect(&cache).await.unwrap();
        assert!(cache.is_connected().await);

        // The same insert now lands and dedup sees the content hash.
        ThreadStorage::insert(&cache, &topic("hello")).await.unwrap();
        assert!(cache.is_duplicate(&topic("hello")).await);
        assert!(!cache.is_duplicate(&topic("edited")).await);

        // Deleting the thread drops the recorded hash.
        ThreadStorage::mark_deleted(&cache, &DeletedPost::thread(100))
            .await
            .unwrap();
        assert!(!cache.is_duplicate(&topic("hello")).await);
    }

    #[tokio::test]
    async fn connect_against_unreachable_host_errors() {
        let cache = unreachable_cache();
        assert!(cache.connect().await.is_err());
        // Still usable as a degraded no-op layer afterwards.
        assert!(ThreadStorage::insert(&cache, &topic("hello")).await.is_ok());
    }

    #[test]
    fn content_hash_tracks_post_changes() {
        let a = content_hash(&topic("hello"));
        let b = content_hash(&topic("hello"));
        let c = content_hash(&topic("edited"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
