//! Run orchestration.
//!
//! This module provides:
//! - The [`PipelineOrchestrator`] and its builder
//! - The retry policy wrapped around every collaborator call
//! - Batch planning for the drafting stage

mod batching;
mod orchestrator;
mod retry;

pub use batching::{plan_batches, BatchSize};
pub use orchestrator::{
    OrchestratorBuilder, OrchestratorConfig, PipelineOrchestrator, DEFAULT_CALL_TIMEOUT,
};
pub use retry::{call_with_retry, Attempted, BackoffStrategy, JitterStrategy, RetryPolicy};
