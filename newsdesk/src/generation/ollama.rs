//! Summarizer and drafter backed by an Ollama runtime.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::collaborators::{Drafter, Summarizer};
use crate::config::OllamaConfig;
use crate::core::Article;
use crate::errors::{CollaboratorError, ErrorKind, InitializationError};
use crate::http;

const CLIENT_NAME: &str = "ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Client for `POST {base}/api/generate`, used for both summaries and drafts.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    /// Creates a client for `config`.
    pub fn new(config: &OllamaConfig) -> Result<Self, InitializationError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| {
            InitializationError::new(CLIENT_NAME, format!("invalid base URL '{base_url}': {e}"))
        })?;
        let client = http::build_client()
            .map_err(|e| InitializationError::new(CLIENT_NAME, format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Model used for generation.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Checks that the runtime answers, returning its version.
    pub async fn health_check(&self) -> Result<String, InitializationError> {
        let url = format!("{}/api/version", self.base_url);
        let unusable = |detail: String| {
            InitializationError::new(
                CLIENT_NAME,
                format!("runtime at {} is not usable: {detail}", self.base_url),
            )
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unusable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unusable(format!("HTTP {}", response.status())));
        }
        let version: VersionResponse = response.json().await.map_err(|e| unusable(e.to_string()))?;

        info!(version = %version.version, model = %self.model, "Generation runtime is up");
        Ok(version.version)
    }

    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError::generation(http::transport_kind(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::generation(
                http::status_kind(status),
                format!("HTTP {status}: {}", http::excerpt(&body)),
            ));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            CollaboratorError::generation(ErrorKind::InvalidResponse, format!("unreadable response: {e}"))
        })?;
        let text = body.response.trim();
        if text.is_empty() {
            return Err(CollaboratorError::generation(
                ErrorKind::InvalidResponse,
                "empty completion",
            ));
        }
        debug!(model = %self.model, chars = text.len(), "Generated completion");
        Ok(text.to_string())
    }
}

#[async_trait]
impl Summarizer for OllamaClient {
    async fn summarize(&self, text: &str) -> Result<String, CollaboratorError> {
        if text.trim().is_empty() {
            return Err(CollaboratorError::generation(
                ErrorKind::MalformedInput,
                "nothing to summarize",
            ));
        }
        self.generate(&summarize_prompt(text)).await
    }
}

#[async_trait]
impl Drafter for OllamaClient {
    async fn draft(&self, summaries: &[String]) -> Result<Article, CollaboratorError> {
        if summaries.is_empty() {
            return Err(CollaboratorError::generation(
                ErrorKind::MalformedInput,
                "no summaries to draft from",
            ));
        }
        let completion = self.generate(&draft_prompt(summaries)).await?;
        parse_article(&completion)
    }
}

/// Prompt asking for bullet-point highlights of one story.
#[must_use]
pub fn summarize_prompt(text: &str) -> String {
    format!(
        "You are a skilled writer who turns raw tech news into sharp summaries.\n\
         Write a short bullet-point summary of the news item below. Focus on:\n\
         - Key technological advancements\n\
         - Industry impacts\n\
         - Main announcements\n\
         - Critical insights\n\
         Answer with the bullet points only.\n\n\
         News item:\n{text}\n"
    )
}

/// Prompt asking for one blog post synthesizing every summary.
#[must_use]
pub fn draft_prompt(summaries: &[String]) -> String {
    let mut prompt = String::from(
        "You are a tech blogger who writes engaging and informative articles.\n\
         Write a blog post that synthesizes the news summaries below. Include:\n\
         - A compelling introduction\n\
         - Content organized by themes\n\
         - Technological implications\n\
         - Industry analysis\n\
         - Future predictions\n\n\
         Start your answer with a line `TITLE: <an SEO-friendly title>`, then a line\n\
         `TAGS: <comma-separated tags>`, then the body of the post.\n\n",
    );
    for (index, summary) in summaries.iter().enumerate() {
        prompt.push_str(&format!("Summary {}:\n{}\n\n", index + 1, summary.trim()));
    }
    prompt
}

fn label_pattern() -> Option<&'static Regex> {
    static LABEL: OnceLock<Option<Regex>> = OnceLock::new();
    LABEL
        .get_or_init(|| Regex::new(r"(?i)^\s*[*#]*\s*(title|tags)\s*\**\s*:\s*\**\s*(.*?)\s*\**\s*$").ok())
        .as_ref()
}

/// Splits a completion into an article.
///
/// `TITLE:` and `TAGS:` lines are picked up anywhere, markdown emphasis
/// tolerated. Without a `TITLE:` line the first non-empty line is the title
/// and the rest the body.
pub fn parse_article(completion: &str) -> Result<Article, CollaboratorError> {
    let mut title = None;
    let mut tags = Vec::new();
    let mut body_lines = Vec::new();

    for line in completion.lines() {
        let labelled = label_pattern().and_then(|re| re.captures(line));
        match labelled {
            Some(caps) if title.is_none() && caps[1].eq_ignore_ascii_case("title") => {
                title = Some(caps[2].to_string());
            }
            Some(caps) if caps[1].eq_ignore_ascii_case("tags") => {
                tags.extend(
                    caps[2]
                        .split(',')
                        .map(|t| t.trim().trim_start_matches('#').to_string()),
                );
            }
            _ => body_lines.push(line),
        }
    }

    let (title, body) = match title {
        Some(title) => (title, body_lines.join("\n")),
        None => {
            let rest = body_lines.join("\n");
            let rest = rest.trim_start();
            let (first, body) = rest.split_once('\n').unwrap_or((rest, ""));
            (first.trim_matches(|c: char| c == '#' || c == '*' || c.is_whitespace()).to_string(), body.to_string())
        }
    };

    let title = title.trim();
    let body = body.trim();
    if title.is_empty() || body.is_empty() {
        return Err(CollaboratorError::generation(
            ErrorKind::InvalidResponse,
            "completion has no usable title and body",
        ));
    }

    Ok(Article::new(title, body).with_tags(tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_labelled_article() {
        let article = parse_article(
            "TITLE: Chips, Clouds and Cars\nTAGS: AI, #hardware , cloud\n\nIntro paragraph.\n\nMore text.",
        )
        .unwrap();

        assert_eq!(article.title, "Chips, Clouds and Cars");
        assert_eq!(article.body, "Intro paragraph.\n\nMore text.");
        assert_eq!(
            article.tags.into_iter().collect::<Vec<_>>(),
            vec!["AI".to_string(), "cloud".to_string(), "hardware".to_string()]
        );
    }

    #[test]
    fn test_parse_markdown_labels() {
        let article = parse_article("**Title:** Weekly roundup\n**Tags:** news\nBody here.").unwrap();
        assert_eq!(article.title, "Weekly roundup");
        assert_eq!(article.body, "Body here.");
        assert!(article.tags.contains("news"));
    }

    #[test]
    fn test_parse_falls_back_to_first_line() {
        let article = parse_article("\n# The week in tech\nFirst paragraph.\nSecond.").unwrap();
        assert_eq!(article.title, "The week in tech");
        assert_eq!(article.body, "First paragraph.\nSecond.");
        assert!(article.tags.is_empty());
    }

    #[test]
    fn test_parse_rejects_title_only() {
        let err = parse_article("TITLE: Lonely title").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert!(err.is_retryable());

        assert!(parse_article("just one line").is_err());
        assert!(parse_article("   ").is_err());
    }

    #[test]
    fn test_prompts_carry_input() {
        assert!(summarize_prompt("Title: A\nSummary: B").contains("Summary: B"));

        let prompt = draft_prompt(&["first".to_string(), "second".to_string()]);
        assert!(prompt.contains("Summary 1:\nfirst"));
        assert!(prompt.contains("Summary 2:\nsecond"));
        assert!(prompt.contains("TITLE:"));
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let config = OllamaConfig {
            base_url: "not a url".to_string(),
            ..OllamaConfig::default()
        };
        assert!(OllamaClient::new(&config).is_err());

        let client = OllamaClient::new(&OllamaConfig::default()).unwrap();
        assert_eq!(client.model(), "mistral:7b");
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected_before_any_request() {
        let client = OllamaClient::new(&OllamaConfig::default()).unwrap();

        let err = client.summarize("  ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(!err.is_retryable());

        let err = client.draft(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
