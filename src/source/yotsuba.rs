//! Yotsuba-style source readers: the JSON API and the legacy HTML scrape

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{BoardSource, Result, SourceError, ThreadSummary};
use crate::config::BoardSettings;
use crate::model::{Post, Topic};

const API_BASE: &str = "https://a.4cdn.org";
const MEDIA_BASE: &str = "https://i.4cdn.org";
const HTML_BASE: &str = "https://boards.4chan.org";
const USER_AGENT: &str = concat!("boardbox/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

async fn fetch_media_file(
    client: &reqwest::Client,
    board: &str,
    filename: &str,
) -> Result<Bytes> {
    let url = format!("{MEDIA_BASE}/{board}/{filename}");
    let response = client.get(&url).send().await?.error_for_status()?;
    Ok(response.bytes().await?)
}

// --- JSON API ("YotsubaJSON") ---------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPage {
    page: u32,
    threads: Vec<RawThreadRef>,
}

#[derive(Debug, Deserialize)]
struct RawThreadRef {
    no: u64,
    last_modified: i64,
}

#[derive(Debug, Deserialize)]
struct RawThread {
    posts: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    no: u64,
    #[serde(default)]
    resto: u64,
    #[serde(default)]
    time: i64,
    name: Option<String>,
    trip: Option<String>,
    sub: Option<String>,
    com: Option<String>,
    md5: Option<String>,
    tim: Option<u64>,
    ext: Option<String>,
    fsize: Option<u64>,
    #[serde(default)]
    sticky: u8,
    #[serde(default)]
    closed: u8,
}

impl RawPost {
    fn into_post(self) -> Post {
        let media_filename = match (self.tim, self.ext.as_deref()) {
            (Some(tim), Some(ext)) => Some(format!("{tim}{ext}")),
            _ => None,
        };
        let preview_filename = self.tim.map(|tim| format!("{tim}s.jpg"));
        Post {
            num: self.no,
            subnum: 0,
            op: self.resto == 0,
            timestamp: self.time,
            name: self.name,
            trip: self.trip,
            title: self.sub,
            comment: self.com,
            sticky: self.sticky != 0,
            locked: self.closed != 0,
            deleted: false,
            media_hash: self.md5,
            media_filename,
            preview_filename,
            media_size: self.fsize,
        }
    }
}

/// Reader for the read-only JSON API.
pub struct YotsubaJson {
    board: String,
    client: reqwest::Client,
}

impl YotsubaJson {
    /// `settings` is accepted for seam parity with other engines; the
    /// JSON reader needs nothing beyond the board name today.
    pub fn new(board: &str, _settings: &BoardSettings) -> Result<Self> {
        Ok(Self {
            board: board.to_string(),
            client: http_client()?,
        })
    }
}

#[async_trait]
impl BoardSource for YotsubaJson {
    async fn fetch_thread_list(&self) -> Result<Vec<ThreadSummary>> {
        let url = format!("{API_BASE}/{}/threads.json", self.board);
        let pages: Vec<RawPage> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut summaries = Vec::new();
        for page in pages {
            for thread in page.threads {
                summaries.push(ThreadSummary {
                    num: thread.no,
                    last_modified: thread.last_modified,
                    page: page.page,
                });
            }
        }
        debug!(board = %self.board, threads = summaries.len(), "thread list fetched");
        Ok(summaries)
    }

    async fn fetch_thread(&self, num: u64) -> Result<Topic> {
        let url = format!("{API_BASE}/{}/thread/{num}.json", self.board);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(num));
        }
        let raw: RawThread = response.error_for_status()?.json().await?;

        Ok(Topic {
            num,
            last_modified: None,
            posts: raw.posts.into_iter().map(RawPost::into_post).collect(),
        })
    }

    async fn fetch_media(&self, filename: &str, _thumb: bool) -> Result<Bytes> {
        fetch_media_file(&self.client, &self.board, filename).await
    }
}

// --- Legacy HTML scrape ("YotsubaHTML") -----------------------------------

/// Reader scraping the rendered board pages. Reduced fidelity compared
/// to the JSON API: no last-modified stamps, so every listed thread is
/// refetched each cycle.
pub struct YotsubaHtml {
    board: String,
    client: reqwest::Client,
    thread_re: Regex,
    post_re: Regex,
    tag_re: Regex,
}

impl YotsubaHtml {
    pub fn new(board: &str, _settings: &BoardSettings) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| SourceError::Parse(e.to_string()))
        };
        Ok(Self {
            board: board.to_string(),
            client: http_client()?,
            thread_re: compile(r#"<div class="thread" id="t(\d+)""#)?,
            post_re: compile(
                r#"(?s)<blockquote class="postMessage" id="m(\d+)">(.*?)</blockquote>"#,
            )?,
            tag_re: compile(r"<[^>]+>")?,
        })
    }

    async fn fetch_page(&self, page: u32) -> Result<String> {
        let url = if page == 0 {
            format!("{HTML_BASE}/{}/", self.board)
        } else {
            format!("{HTML_BASE}/{}/{}", self.board, page + 1)
        };
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            // Past the last page.
            return Ok(String::new());
        }
        Ok(response.error_for_status()?.text().await?)
    }

    fn strip_tags(&self, html: &str) -> String {
        let text = html.replace("<br>", "\n");
        self.tag_re.replace_all(&text, "").into_owned()
    }
}

const HTML_PAGE_COUNT: u32 = 10;

#[async_trait]
impl BoardSource for YotsubaHtml {
    async fn fetch_thread_list(&self) -> Result<Vec<ThreadSummary>> {
        let mut summaries = Vec::new();
        for page in 0..HTML_PAGE_COUNT {
            let html = self.fetch_page(page).await?;
            if html.is_empty() {
                break;
            }
            for capture in self.thread_re.captures_iter(&html) {
                let num = capture[1]
                    .parse()
                    .map_err(|_| SourceError::Parse("bad thread id".into()))?;
                summaries.push(ThreadSummary {
                    num,
                    last_modified: 0,
                    page,
                });
            }
        }
        Ok(summaries)
    }

    async fn fetch_thread(&self, num: u64) -> Result<Topic> {
        let url = format!("{HTML_BASE}/{}/thread/{num}", self.board);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(num));
        }
        let html = response.error_for_status()?.text().await?;

        let mut posts = Vec::new();
        for capture in self.post_re.captures_iter(&html) {
            let post_num: u64 = capture[1]
                .parse()
                .map_err(|_| SourceError::Parse("bad post id".into()))?;
            posts.push(Post {
                num: post_num,
                op: post_num == num,
                comment: Some(self.strip_tags(&capture[2])),
                ..Default::default()
            });
        }
        if posts.is_empty() {
            return Err(SourceError::Parse(format!(
                "no posts found in thread {num} markup"
            )));
        }

        Ok(Topic {
            num,
            last_modified: None,
            posts,
        })
    }

    async fn fetch_media(&self, filename: &str, _thumb: bool) -> Result<Bytes> {
        fetch_media_file(&self.client, &self.board, filename).await
    }
}
