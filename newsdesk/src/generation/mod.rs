//! Text generation collaborators.

#[cfg(feature = "ollama")]
mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{draft_prompt, parse_article, summarize_prompt, OllamaClient};
