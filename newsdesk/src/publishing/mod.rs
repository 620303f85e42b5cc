//! Publishing destinations.

#[cfg(feature = "wordpress")]
mod wordpress;

#[cfg(feature = "wordpress")]
pub use wordpress::{
    existing_term_id, find_tag, post_id_from_response, tags_endpoint, WordPressPublisher,
    WordPressTag,
};
