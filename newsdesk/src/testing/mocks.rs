//! Scripted collaborators for testing.
//!
//! Each double answers from a queue of scripted results and falls back to a
//! deterministic success once the queue is empty. All of them record their
//! calls.

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::collaborators::{Drafter, FeedSource, FeedStream, Publisher, Summarizer};
use crate::core::{Article, FeedItem, PostId};
use crate::errors::{CollaboratorError, FeedError, InitializationError};

/// Feed source serving a fixed list of items.
#[derive(Debug, Default)]
pub struct StaticFeedSource {
    items: Vec<FeedItem>,
    truncate_after: Option<usize>,
    init_error: Option<String>,
    fetches: AtomicUsize,
}

impl StaticFeedSource {
    /// Creates a source serving `items` on every fetch.
    #[must_use]
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Creates a source that fails to start.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            init_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Ends every pass with a feed error after `count` items.
    #[must_use]
    pub fn truncated_after(mut self, count: usize) -> Self {
        self.truncate_after = Some(count);
        self
    }

    /// Number of fetches so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<FeedStream, InitializationError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.init_error {
            return Err(InitializationError::new(self.name(), message.clone()));
        }

        let mut results: Vec<Result<FeedItem, FeedError>> = match self.truncate_after {
            Some(count) => self.items.iter().take(count).cloned().map(Ok).collect(),
            None => self.items.iter().cloned().map(Ok).collect(),
        };
        if self.truncate_after.is_some() {
            results.push(Err(FeedError("connection reset".to_string())));
        }
        Ok(Box::pin(stream::iter(results)))
    }
}

/// Summarizer answering from per-text scripts.
///
/// Unscripted text is summarized as `"summary of {text}"`.
#[derive(Debug, Default)]
pub struct ScriptedSummarizer {
    scripts: Mutex<HashMap<String, VecDeque<Result<String, CollaboratorError>>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSummarizer {
    /// Creates a summarizer with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues results for calls with exactly `text`.
    #[must_use]
    pub fn script(
        self,
        text: &str,
        results: impl IntoIterator<Item = Result<String, CollaboratorError>>,
    ) -> Self {
        self.scripts
            .lock()
            .entry(text.to_string())
            .or_default()
            .extend(results);
        self
    }

    /// Makes every call with `text` take `delay` before answering.
    #[must_use]
    pub fn delay(self, text: &str, delay: Duration) -> Self {
        self.delays.lock().insert(text.to_string(), delay);
        self
    }

    /// Every text received, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls made with `text`.
    #[must_use]
    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().iter().filter(|t| *t == text).count()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, CollaboratorError> {
        self.calls.lock().push(text.to_string());

        let delay = self.delays.lock().get(text).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripts
            .lock()
            .get_mut(text)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(format!("summary of {text}")))
    }
}

/// Drafter answering from a queue.
///
/// Unscripted calls produce an article titled `"Digest of N stories"` with
/// the summaries joined as body.
#[derive(Debug, Default)]
pub struct ScriptedDrafter {
    script: Mutex<VecDeque<Result<Article, CollaboratorError>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedDrafter {
    /// Creates a drafter with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues results for the next calls.
    #[must_use]
    pub fn script(self, results: impl IntoIterator<Item = Result<Article, CollaboratorError>>) -> Self {
        self.script.lock().extend(results);
        self
    }

    /// Summaries received by each call.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Drafter for ScriptedDrafter {
    async fn draft(&self, summaries: &[String]) -> Result<Article, CollaboratorError> {
        self.calls.lock().push(summaries.to_vec());

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(Article::new(
                format!("Digest of {} stories", summaries.len()),
                summaries.join("\n\n"),
            )
            .with_tags(["tech"]))
        })
    }
}

/// Publisher answering from a queue.
///
/// Unscripted calls succeed with post ids `"post-1"`, `"post-2"`, ...
#[derive(Debug, Default)]
pub struct ScriptedPublisher {
    script: Mutex<VecDeque<Result<PostId, CollaboratorError>>>,
    published: Mutex<Vec<Article>>,
    calls: AtomicUsize,
}

impl ScriptedPublisher {
    /// Creates a publisher with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues results for the next calls.
    #[must_use]
    pub fn script(self, results: impl IntoIterator<Item = Result<PostId, CollaboratorError>>) -> Self {
        self.script.lock().extend(results);
        self
    }

    /// Articles that were accepted.
    #[must_use]
    pub fn published(&self) -> Vec<Article> {
        self.published.lock().clone()
    }

    /// Number of calls so far, failed ones included.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    async fn publish(&self, article: &Article) -> Result<PostId, CollaboratorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let scripted = self.script.lock().pop_front();
        let result = scripted.unwrap_or_else(|| Ok(PostId::new(format!("post-{call}"))));
        if result.is_ok() {
            self.published.lock().push(article.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testing::feed_items;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_static_source_truncation() {
        let source = StaticFeedSource::new(feed_items(&["a", "b", "c"])).truncated_after(2);
        let results: Vec<_> = source.fetch().await.unwrap().collect().await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[2].is_err());
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_summarizer_falls_back_after_script() {
        let summarizer = ScriptedSummarizer::new().script(
            "a",
            [Err(CollaboratorError::generation(ErrorKind::Transport, "down"))],
        );

        assert!(summarizer.summarize("a").await.is_err());
        assert_eq!(summarizer.summarize("a").await.unwrap(), "summary of a");
        assert_eq!(summarizer.calls_for("a"), 2);
    }

    #[tokio::test]
    async fn test_scripted_publisher_numbers_posts() {
        let publisher = ScriptedPublisher::new();
        let article = Article::new("t", "b");

        assert_eq!(publisher.publish(&article).await.unwrap(), PostId::new("post-1"));
        assert_eq!(publisher.publish(&article).await.unwrap(), PostId::new("post-2"));
        assert_eq!(publisher.published().len(), 2);
    }
}
