//! Contracts the orchestrator needs from the outside world.
//!
//! Concrete implementations are injected into the
//! [`PipelineOrchestrator`](crate::pipeline::PipelineOrchestrator); the
//! orchestrator never reaches for a global registry.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

use crate::core::{Article, FeedItem, PostId};
use crate::errors::{CollaboratorError, FeedError, InitializationError};

/// Lazy, finite sequence of feed items. An `Err` ends the sequence early.
pub type FeedStream = BoxStream<'static, Result<FeedItem, FeedError>>;

/// Produces the candidate items of a run.
///
/// Fetching is read-only, so a source may be iterated again on the next run.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Starts a new pass over the feed.
    async fn fetch(&self) -> Result<FeedStream, InitializationError>;
}

/// Condenses the raw text of one item.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns a summary of `text`.
    async fn summarize(&self, text: &str) -> Result<String, CollaboratorError>;
}

/// Synthesizes one article from a batch of summaries.
#[async_trait]
pub trait Drafter: Send + Sync {
    /// Drafts an article covering every summary.
    async fn draft(&self, summaries: &[String]) -> Result<Article, CollaboratorError>;
}

/// Pushes an article to the target site.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Creates the post and returns its id.
    async fn publish(&self, article: &Article) -> Result<PostId, CollaboratorError>;
}

#[async_trait]
impl<T: Summarizer + ?Sized> Summarizer for Arc<T> {
    async fn summarize(&self, text: &str) -> Result<String, CollaboratorError> {
        (**self).summarize(text).await
    }
}

#[async_trait]
impl<T: Drafter + ?Sized> Drafter for Arc<T> {
    async fn draft(&self, summaries: &[String]) -> Result<Article, CollaboratorError> {
        (**self).draft(summaries).await
    }
}

#[async_trait]
impl<T: Publisher + ?Sized> Publisher for Arc<T> {
    async fn publish(&self, article: &Article) -> Result<PostId, CollaboratorError> {
        (**self).publish(article).await
    }
}

#[async_trait]
impl<T: FeedSource + ?Sized> FeedSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self) -> Result<FeedStream, InitializationError> {
        (**self).fetch().await
    }
}
