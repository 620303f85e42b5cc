//! Feed source implementations.

#[cfg(feature = "rss")]
mod rss;

#[cfg(feature = "rss")]
pub use rss::{parse_feed, RssFeedSource};
