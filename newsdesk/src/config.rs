//! Configuration loaded from the process environment.
//!
//! [`AppConfig::from_env`] reads `std::env`; [`AppConfig::from_env_with`]
//! takes any key lookup so tests never touch the real environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::observability::LogFormat;
use crate::pipeline::{BatchSize, OrchestratorConfig, RetryPolicy};

/// Feeds read when `NEWSDESK_FEEDS` is not set.
pub const DEFAULT_FEEDS: [&str; 4] = [
    "https://techcrunch.com/feed/",
    "https://www.theverge.com/rss/index.xml",
    "https://www.wired.com/feed/rss",
    "https://feeds.arstechnica.com/arstechnica/index",
];

/// Default generation endpoint.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
/// Default generation model.
pub const DEFAULT_OLLAMA_MODEL: &str = "mistral:7b";
/// Default sampling temperature.
pub const DEFAULT_OLLAMA_TEMPERATURE: f32 = 0.7;
/// Default number of entries taken from each feed.
pub const DEFAULT_ITEMS_PER_FEED: usize = 3;
/// Default location of the JSON store.
pub const DEFAULT_STORE_PATH: &str = "newsdesk-state.json";

/// Configuration errors. Each one names the offending variable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is missing or blank.
    #[error("{0} must be set")]
    Missing(&'static str),
    /// A variable holds a value that cannot be used.
    #[error("{var} is invalid: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Credentials for the publishing endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum WordPressAuth {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// HTTP basic auth, usually with an application password.
    Basic {
        /// User name.
        user: String,
        /// Password.
        password: String,
    },
}

impl fmt::Debug for WordPressAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Status given to created posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Visible immediately.
    #[default]
    Publish,
    /// Kept as a draft for review.
    Draft,
}

impl PostStatus {
    /// Value sent to the endpoint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Draft => "draft",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publish" => Ok(Self::Publish),
            "draft" => Ok(Self::Draft),
            other => Err(format!("expected 'publish' or 'draft', got '{other}'")),
        }
    }
}

/// Publishing endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPressConfig {
    /// Posts endpoint, e.g. `https://site/wp-json/wp/v2/posts`.
    pub posts_url: String,
    /// Credentials.
    pub auth: WordPressAuth,
    /// Status of created posts.
    pub status: PostStatus,
}

/// Generation endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Base URL of the runtime.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            temperature: DEFAULT_OLLAMA_TEMPERATURE,
        }
    }
}

/// Feed settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Feed URLs, read in order.
    pub urls: Vec<String>,
    /// Newest entries taken from each feed.
    pub items_per_feed: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            urls: DEFAULT_FEEDS.iter().map(ToString::to_string).collect(),
            items_per_feed: DEFAULT_ITEMS_PER_FEED,
        }
    }
}

/// Everything the binary needs to wire a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Publishing endpoint.
    pub wordpress: WordPressConfig,
    /// Generation endpoint.
    pub ollama: OllamaConfig,
    /// Feeds.
    pub feeds: FeedConfig,
    /// JSON store location.
    pub store_path: PathBuf,
    /// Orchestrator tunables.
    pub pipeline: OrchestratorConfig,
    /// Console log format.
    pub log_format: LogFormat,
    /// Optional log file.
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Loads the configuration from the process environment.
    ///
    /// Call [`dotenvy::dotenv`] (or `from_path`) first to pick up a `.env`
    /// file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `get_env`.
    ///
    /// Blank values count as unset.
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get_env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let posts_url = get("WORDPRESS_URL").ok_or(ConfigError::Missing("WORDPRESS_URL"))?;
        let auth = match get("WORDPRESS_TOKEN") {
            Some(token) => WordPressAuth::Bearer(token),
            None => WordPressAuth::Basic {
                user: get("WORDPRESS_USER").ok_or(ConfigError::Missing("WORDPRESS_USER"))?,
                password: get("WORDPRESS_PASS").ok_or(ConfigError::Missing("WORDPRESS_PASS"))?,
            },
        };
        let wordpress = WordPressConfig {
            posts_url,
            auth,
            status: parse_or(&get, "WORDPRESS_POST_STATUS", PostStatus::Publish)?,
        };

        let ollama = OllamaConfig {
            base_url: get("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            temperature: parse_or(&get, "OLLAMA_TEMPERATURE", DEFAULT_OLLAMA_TEMPERATURE)?,
        };

        let urls = match get("NEWSDESK_FEEDS") {
            Some(list) => {
                let urls: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(ToString::to_string)
                    .collect();
                if urls.is_empty() {
                    return Err(ConfigError::Invalid {
                        var: "NEWSDESK_FEEDS",
                        reason: "no feed URLs listed".to_string(),
                    });
                }
                urls
            }
            None => FeedConfig::default().urls,
        };
        let items_per_feed = parse_or(&get, "NEWSDESK_ITEMS_PER_FEED", DEFAULT_ITEMS_PER_FEED)?;
        if items_per_feed == 0 {
            return Err(ConfigError::Invalid {
                var: "NEWSDESK_ITEMS_PER_FEED",
                reason: "must be at least 1".to_string(),
            });
        }

        let max_attempts: u32 = parse_or(&get, "NEWSDESK_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "NEWSDESK_MAX_ATTEMPTS",
                reason: "must be at least 1".to_string(),
            });
        }
        let backoff_ms = match get("NEWSDESK_BACKOFF_MS") {
            Some(list) => parse_backoff(&list)?,
            None => RetryPolicy::default().backoff_ms,
        };
        let call_timeout_secs: u64 = parse_or(&get, "NEWSDESK_CALL_TIMEOUT_SECS", 120)?;
        if call_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "NEWSDESK_CALL_TIMEOUT_SECS",
                reason: "must be at least 1".to_string(),
            });
        }

        let pipeline = OrchestratorConfig {
            retry: RetryPolicy::default()
                .with_max_attempts(max_attempts)
                .with_backoff_ms(backoff_ms),
            call_timeout: Duration::from_secs(call_timeout_secs),
            batch_size: BatchSize::fixed(parse_or(&get, "NEWSDESK_BATCH_SIZE", 0)?),
            summarize_concurrency: parse_or(&get, "NEWSDESK_SUMMARIZE_CONCURRENCY", 1usize)?.max(1),
        };

        Ok(Self {
            wordpress,
            ollama,
            feeds: FeedConfig {
                urls,
                items_per_feed,
            },
            store_path: get("NEWSDESK_STORE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from),
            pipeline,
            log_format: parse_or(&get, "NEWSDESK_LOG_FORMAT", LogFormat::Pretty)?,
            log_file: get("NEWSDESK_LOG_FILE").map(PathBuf::from),
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(var).map_or(Ok(default), |raw| {
        raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("'{raw}': {e}"),
        })
    })
}

fn parse_backoff(list: &str) -> Result<Vec<u64>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "NEWSDESK_BACKOFF_MS",
                reason: format!("'{part}': {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_token() {
        let config = AppConfig::from_env_with(env(&[
            ("WORDPRESS_URL", "https://blog.example.com/wp-json/wp/v2/posts"),
            ("WORDPRESS_TOKEN", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.wordpress.auth, WordPressAuth::Bearer("secret".to_string()));
        assert_eq!(config.wordpress.status, PostStatus::Publish);
        assert_eq!(config.ollama, OllamaConfig::default());
        assert_eq!(config.feeds, FeedConfig::default());
        assert_eq!(config.store_path, PathBuf::from(DEFAULT_STORE_PATH));
        assert_eq!(config.pipeline, OrchestratorConfig::default());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_basic_auth_and_overrides() {
        let config = AppConfig::from_env_with(env(&[
            ("WORDPRESS_URL", "https://blog.example.com/wp-json/wp/v2/posts"),
            ("WORDPRESS_USER", "editor"),
            ("WORDPRESS_PASS", "app-pass"),
            ("WORDPRESS_POST_STATUS", "draft"),
            ("OLLAMA_MODEL", "llama3"),
            ("OLLAMA_TEMPERATURE", "0.2"),
            ("NEWSDESK_FEEDS", "https://a.example/feed, https://b.example/rss,"),
            ("NEWSDESK_BATCH_SIZE", "2"),
            ("NEWSDESK_MAX_ATTEMPTS", "5"),
            ("NEWSDESK_BACKOFF_MS", "10, 20"),
            ("NEWSDESK_CALL_TIMEOUT_SECS", "30"),
            ("NEWSDESK_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(
            config.wordpress.auth,
            WordPressAuth::Basic {
                user: "editor".to_string(),
                password: "app-pass".to_string(),
            }
        );
        assert_eq!(config.wordpress.status, PostStatus::Draft);
        assert_eq!(config.ollama.model, "llama3");
        assert!((config.ollama.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(
            config.feeds.urls,
            vec!["https://a.example/feed".to_string(), "https://b.example/rss".to_string()]
        );
        assert_eq!(config.pipeline.batch_size, BatchSize::fixed(2));
        assert_eq!(config.pipeline.retry.max_attempts, 5);
        assert_eq!(config.pipeline.retry.backoff_ms, vec![10, 20]);
        assert_eq!(config.pipeline.call_timeout, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_values_name_the_variable() {
        assert_eq!(
            AppConfig::from_env_with(env(&[])).unwrap_err(),
            ConfigError::Missing("WORDPRESS_URL")
        );
        assert_eq!(
            AppConfig::from_env_with(env(&[
                ("WORDPRESS_URL", "https://x/wp-json/wp/v2/posts"),
                ("WORDPRESS_USER", "editor"),
            ]))
            .unwrap_err(),
            ConfigError::Missing("WORDPRESS_PASS")
        );
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        let base = [
            ("WORDPRESS_URL", "https://x/wp-json/wp/v2/posts"),
            ("WORDPRESS_TOKEN", "t"),
        ];
        for (var, value) in [
            ("NEWSDESK_MAX_ATTEMPTS", "three"),
            ("NEWSDESK_MAX_ATTEMPTS", "0"),
            ("NEWSDESK_BACKOFF_MS", "10,x"),
            ("NEWSDESK_ITEMS_PER_FEED", "0"),
            ("WORDPRESS_POST_STATUS", "pending"),
            ("NEWSDESK_FEEDS", " , "),
        ] {
            let mut pairs = base.to_vec();
            pairs.push((var, value));
            match AppConfig::from_env_with(env(&pairs)) {
                Err(ConfigError::Invalid { var: got, .. }) => assert_eq!(got, var),
                other => panic!("expected {var} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_auth_debug_redacts_secrets() {
        let debug = format!("{:?}", WordPressAuth::Bearer("s3cret".to_string()));
        assert!(!debug.contains("s3cret"));
    }
}
