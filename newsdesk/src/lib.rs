//! # Newsdesk
//!
//! Turns news-feed items into published blog posts.
//!
//! A run pulls items from a feed, skips the ones an earlier run already
//! published, summarizes the rest, drafts one article per batch of summaries
//! and publishes it. The outcome of every item is persisted so the next run
//! does not publish it twice.
//!
//! - **Injected collaborators**: feed source, summarizer, drafter and
//!   publisher are traits; RSS, Ollama and WordPress implementations sit
//!   behind cargo features
//! - **Bounded retries**: every collaborator call has a timeout and a retry
//!   policy
//! - **Durable idempotency**: a processed-item store remembers published items
//! - **Run reports**: per-item records, per-batch outcomes and a
//!   reconciliation list for outcomes the store never saw
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use newsdesk::prelude::*;
//!
//! let orchestrator = PipelineOrchestrator::builder()
//!     .source(RssFeedSource::new(&config.feeds)?)
//!     .summarizer(ollama.clone())
//!     .drafter(ollama)
//!     .publisher(WordPressPublisher::new(&config.wordpress)?)
//!     .store(Arc::new(JsonFileProcessedItemStore::open("state.json").await?))
//!     .build()?;
//!
//! let report = orchestrator.run().await?;
//! std::process::exit(report.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod collaborators;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod generation;
pub mod observability;
pub mod pipeline;
pub mod publishing;
pub mod sources;
pub mod store;
pub mod testing;

#[cfg(any(feature = "ollama", feature = "wordpress"))]
mod http;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::collaborators::{Drafter, FeedSource, FeedStream, Publisher, Summarizer};
    pub use crate::config::AppConfig;
    pub use crate::core::{
        Article, BatchOutcome, FeedItem, PostId, ProcessingRecord, ReconciliationEntry,
        RunCounts, RunReport, RunStatus, Stage,
    };
    pub use crate::errors::{
        CollaboratorError, ErrorKind, InitializationError, PipelineError, StoreError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{
        BatchSize, OrchestratorBuilder, OrchestratorConfig, PipelineOrchestrator, RetryPolicy,
    };
    pub use crate::store::{
        InMemoryProcessedItemStore, JsonFileProcessedItemStore, ProcessedItemStore,
    };

    #[cfg(feature = "ollama")]
    pub use crate::generation::OllamaClient;
    #[cfg(feature = "wordpress")]
    pub use crate::publishing::WordPressPublisher;
    #[cfg(feature = "rss")]
    pub use crate::sources::RssFeedSource;
}
