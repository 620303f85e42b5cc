//! Grouping of summarized items into drafting batches.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// How many summarized items go into one drafted article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSize {
    /// One article for the whole run.
    #[default]
    All,
    /// At most this many items per article.
    Fixed(NonZeroUsize),
}

impl BatchSize {
    /// Fixed batch size; zero means [`BatchSize::All`].
    #[must_use]
    pub fn fixed(size: usize) -> Self {
        NonZeroUsize::new(size).map_or(Self::All, Self::Fixed)
    }
}

/// Splits `items` into batches, keeping their order.
///
/// An empty input yields no batches; the last batch may be short.
#[must_use]
pub fn plan_batches<T>(items: Vec<T>, size: BatchSize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }

    match size {
        BatchSize::All => vec![items],
        BatchSize::Fixed(n) => {
            let n = n.get();
            let mut batches = Vec::with_capacity(items.len().div_ceil(n));
            let mut current = Vec::with_capacity(n);
            for item in items {
                current.push(item);
                if current.len() == n {
                    batches.push(std::mem::replace(&mut current, Vec::with_capacity(n)));
                }
            }
            if !current.is_empty() {
                batches.push(current);
            }
            batches
        }
    }
}
