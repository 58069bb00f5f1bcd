//! Payload types flowing between source readers, storage sinks and dumpers

use serde::{Deserialize, Serialize};

/// One thread together with its posts, as returned by a source reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Thread number (the opening post's number).
    pub num: u64,
    /// Unix timestamp of the last change seen at the source, when known.
    pub last_modified: Option<i64>,
    pub posts: Vec<Post>,
}

impl Topic {
    /// Iterate posts carrying a media attachment.
    pub fn media_posts(&self) -> impl Iterator<Item = MediaPost> + '_ {
        self.posts.iter().filter_map(|p| p.media_post(self.num))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub num: u64,
    /// Ghost-post sub-number; 0 for regular posts.
    pub subnum: u64,
    pub op: bool,
    pub timestamp: i64,
    pub name: Option<String>,
    pub trip: Option<String>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub sticky: bool,
    pub locked: bool,
    pub deleted: bool,
    pub media_hash: Option<String>,
    pub media_filename: Option<String>,
    pub preview_filename: Option<String>,
    pub media_size: Option<u64>,
}

impl Post {
    fn media_post(&self, thread_num: u64) -> Option<MediaPost> {
        let media_hash = self.media_hash.clone()?;
        Some(MediaPost {
            thread_num,
            num: self.num,
            op: self.op,
            media_hash,
            media_filename: self.media_filename.clone(),
            preview_filename: self.preview_filename.clone(),
        })
    }
}

/// Reference to a post no longer present at the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedPost {
    pub thread_num: u64,
    pub num: u64,
    pub subnum: u64,
}

impl DeletedPost {
    /// A whole-thread deletion marker (the opening post).
    pub fn thread(num: u64) -> Self {
        Self {
            thread_num: num,
            num,
            subnum: 0,
        }
    }
}

/// Reference to a media attachment, used for dedup lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPost {
    pub thread_num: u64,
    pub num: u64,
    pub op: bool,
    pub media_hash: String,
    pub media_filename: Option<String>,
    pub preview_filename: Option<String>,
}

/// Previously stored record for a media attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub media_hash: String,
    pub media: Option<String>,
    pub preview_op: Option<String>,
    pub preview_reply: Option<String>,
    pub banned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_posts_skips_posts_without_attachment() {
        let topic = Topic {
            num: 100,
            last_modified: None,
            posts: vec![
                Post {
                    num: 100,
                    op: true,
                    media_hash: Some("abc".into()),
                    media_filename: Some("1234.jpg".into()),
                    ..Default::default()
                },
                Post {
                    num: 101,
                    ..Default::default()
                },
            ],
        };

        let media: Vec<_> = topic.media_posts().collect();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].media_hash, "abc");
        assert_eq!(media[0].thread_num, 100);
        assert!(media[0].op);
    }
}
