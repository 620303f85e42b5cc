//! RSS and Atom feeds fetched over HTTP.

use async_trait::async_trait;
use feed_rs::model::Entry;
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::{Client, Url};
use scraper::Html;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::collaborators::{FeedSource, FeedStream};
use crate::config::FeedConfig;
use crate::core::FeedItem;
use crate::errors::{FeedError, InitializationError};

const SOURCE_NAME: &str = "rss";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("newsdesk/", env!("CARGO_PKG_VERSION"));

/// Reads a fixed list of feeds, taking the newest entries of each.
///
/// Feeds are fetched one after another while the stream is polled. A feed
/// that cannot be fetched or parsed is skipped with a warning.
#[derive(Debug, Clone)]
pub struct RssFeedSource {
    client: Client,
    urls: Vec<Url>,
    items_per_feed: usize,
}

impl RssFeedSource {
    /// Validates the feed list and builds the HTTP client.
    pub fn new(config: &FeedConfig) -> Result<Self, InitializationError> {
        if config.urls.is_empty() {
            return Err(InitializationError::new(SOURCE_NAME, "no feed URLs configured"));
        }

        let urls = config
            .urls
            .iter()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    InitializationError::new(SOURCE_NAME, format!("invalid feed URL '{raw}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| InitializationError::new(SOURCE_NAME, format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            urls,
            items_per_feed: config.items_per_feed.max(1),
        })
    }

    /// Configured feeds.
    #[must_use]
    pub fn urls(&self) -> &[Url] {
        &self.urls
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch(&self) -> Result<FeedStream, InitializationError> {
        let client = self.client.clone();
        let limit = self.items_per_feed;

        let items = stream::iter(self.urls.clone())
            .then(move |url| {
                let client = client.clone();
                async move {
                    match fetch_feed(&client, &url, limit).await {
                        Ok(items) => {
                            info!(feed = %url, items = items.len(), "Fetched feed");
                            items
                        }
                        Err(e) => {
                            warn!(feed = %url, error = %e, "Skipping feed");
                            Vec::new()
                        }
                    }
                }
            })
            .flat_map(|items| stream::iter(items.into_iter().map(Ok)));

        Ok(items.boxed())
    }
}

async fn fetch_feed(client: &Client, url: &Url, limit: usize) -> Result<Vec<FeedItem>, FeedError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| FeedError(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError(format!("HTTP {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| FeedError(format!("cannot read body: {e}")))?;

    parse_feed(url.as_str(), &body, limit)
}

/// Parses a feed document into at most `limit` items, newest first.
///
/// Entries without a date keep their document order after dated ones.
pub fn parse_feed(feed_url: &str, body: &[u8], limit: usize) -> Result<Vec<FeedItem>, FeedError> {
    let feed = feed_rs::parser::parse(body).map_err(|e| FeedError(format!("malformed feed: {e}")))?;
    if feed.entries.is_empty() {
        return Err(FeedError("feed has no entries".to_string()));
    }

    let mut entries = feed.entries;
    entries.sort_by_key(|e| std::cmp::Reverse(e.published.or(e.updated)));
    debug!(feed = feed_url, entries = entries.len(), "Parsed feed");

    Ok(entries
        .into_iter()
        .take(limit)
        .map(|entry| to_feed_item(feed_url, entry))
        .collect())
}

fn to_feed_item(feed_url: &str, entry: Entry) -> FeedItem {
    let title = entry
        .title
        .map(|t| collapse_whitespace(&t.content))
        .unwrap_or_default();
    let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
    let summary_html = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();
    let summary = strip_html(&summary_html);

    let id = if !entry.id.trim().is_empty() {
        entry.id
    } else if !link.is_empty() {
        link.clone()
    } else {
        let digest = Sha256::digest(format!("{feed_url}\n{title}").as_bytes());
        hex::encode(digest)
    };

    let raw_text = format!("Title: {title}\nLink: {link}\nSummary: {summary}");
    let item = FeedItem::new(id, title, link, raw_text);
    match entry.published.or(entry.updated) {
        Some(at) => item.with_published_at(at),
        None => item,
    }
}

/// Visible text of an HTML fragment with whitespace collapsed.
pub(crate) fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    collapse_whitespace(&text.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Option<Regex>> = OnceLock::new();
    let trimmed = text.trim();
    match WHITESPACE.get_or_init(|| Regex::new(r"\s+").ok()) {
        Some(re) => re.replace_all(trimmed, " ").into_owned(),
        None => trimmed.to_string(),
    }
}
