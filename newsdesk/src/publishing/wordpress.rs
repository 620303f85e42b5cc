//! Publisher for the WordPress REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collaborators::Publisher;
use crate::config::{PostStatus, WordPressAuth, WordPressConfig};
use crate::core::{Article, PostId};
use crate::errors::{CollaboratorError, ErrorKind, InitializationError};
use crate::http;

const CLIENT_NAME: &str = "wordpress";

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
    tags: Vec<u64>,
}

#[derive(Debug, Serialize)]
struct NewTag<'a> {
    name: &'a str,
}

/// A tag as listed by the tags endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WordPressTag {
    /// Term id.
    pub id: u64,
    /// Display name.
    pub name: String,
}

/// Creates posts through `POST {posts_url}`, resolving tag names to ids.
#[derive(Debug, Clone)]
pub struct WordPressPublisher {
    client: Client,
    posts_url: Url,
    tags_url: Option<Url>,
    auth: WordPressAuth,
    status: PostStatus,
}

impl WordPressPublisher {
    /// Creates a publisher for `config`.
    pub fn new(config: &WordPressConfig) -> Result<Self, InitializationError> {
        let posts_url = Url::parse(&config.posts_url).map_err(|e| {
            InitializationError::new(
                CLIENT_NAME,
                format!("invalid posts URL '{}': {e}", config.posts_url),
            )
        })?;
        let tags_url = tags_endpoint(&posts_url);
        if tags_url.is_none() {
            warn!(posts_url = %posts_url, "Posts URL does not end in 'posts', tags will not be sent");
        }
        let client = http::build_client()
            .map_err(|e| InitializationError::new(CLIENT_NAME, format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            posts_url,
            tags_url,
            auth: config.auth.clone(),
            status: config.status,
        })
    }

    /// Tags endpoint derived from the posts endpoint.
    #[must_use]
    pub fn tags_url(&self) -> Option<&Url> {
        self.tags_url.as_ref()
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            WordPressAuth::Bearer(token) => request.bearer_auth(token),
            WordPressAuth::Basic { user, password } => request.basic_auth(user, Some(password)),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, CollaboratorError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| CollaboratorError::publish(http::transport_kind(&e), e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CollaboratorError::publish(http::transport_kind(&e), e.to_string()))?;

        if !status.is_success() {
            // A tag created concurrently comes back as 400 `term_exists`; callers inspect the body.
            let body = serde_json::from_str(&text).unwrap_or(Value::Null);
            if existing_term_id(&body).is_some() {
                return Ok(body);
            }
            return Err(CollaboratorError::publish(
                http::status_kind(status),
                format!("HTTP {status}: {}", http::excerpt(&text)),
            ));
        }

        let body = serde_json::from_str(&text).map_err(|e| {
            CollaboratorError::publish(ErrorKind::InvalidResponse, format!("response is not JSON: {e}"))
                .with_retryable(false)
        })?;
        Ok(body)
    }

    async fn resolve_tag(&self, tags_url: &Url, name: &str) -> Result<u64, CollaboratorError> {
        let listed = self
            .send(self.client.get(tags_url.clone()).query(&[("search", name)]))
            .await?;
        let listed: Vec<WordPressTag> = serde_json::from_value(listed).map_err(|e| {
            CollaboratorError::publish(ErrorKind::InvalidResponse, format!("unexpected tag listing: {e}"))
        })?;
        if let Some(tag) = find_tag(&listed, name) {
            return Ok(tag.id);
        }

        let created = self
            .send(self.client.post(tags_url.clone()).json(&NewTag { name }))
            .await?;
        let id = created
            .get("id")
            .and_then(Value::as_u64)
            .or_else(|| existing_term_id(&created))
            .ok_or_else(|| {
                CollaboratorError::publish(ErrorKind::InvalidResponse, format!("tag '{name}' has no id"))
            })?;
        debug!(tag = name, id, "Created tag");
        Ok(id)
    }

    async fn resolve_tags(&self, article: &Article) -> Result<Vec<u64>, CollaboratorError> {
        let Some(tags_url) = &self.tags_url else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::with_capacity(article.tags.len());
        for name in &article.tags {
            ids.push(self.resolve_tag(tags_url, name).await?);
        }
        Ok(ids)
    }
}

#[async_trait]
impl Publisher for WordPressPublisher {
    async fn publish(&self, article: &Article) -> Result<PostId, CollaboratorError> {
        let title = article.title.trim();
        if title.is_empty() {
            return Err(CollaboratorError::publish(
                ErrorKind::MalformedInput,
                "post title cannot be empty",
            ));
        }

        let tags = self.resolve_tags(article).await?;
        info!(title, tags = tags.len(), status = self.status.as_str(), "Creating post");

        let post = NewPost {
            title,
            content: &article.body,
            status: self.status.as_str(),
            tags,
        };
        let body = self
            .send(self.client.post(self.posts_url.clone()).json(&post))
            .await?;

        let post_id = post_id_from_response(&body)?;
        let link = post_link(&body);
        info!(post_id = %post_id, link, "Post created");
        Ok(post_id)
    }
}

/// Replaces a trailing `posts` path segment with `tags`.
#[must_use]
pub fn tags_endpoint(posts_url: &Url) -> Option<Url> {
    let segments: Vec<&str> = posts_url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let (last, parent) = segments.split_last()?;
    if *last != "posts" {
        return None;
    }
    let mut tags_url = posts_url.clone();
    tags_url.set_path(&format!("/{}/tags", parent.join("/")).replace("//", "/"));
    tags_url.set_query(None);
    Some(tags_url)
}

/// Exact, case-insensitive match among listed tags.
#[must_use]
pub fn find_tag<'a>(listed: &'a [WordPressTag], name: &str) -> Option<&'a WordPressTag> {
    listed.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

/// Term id carried by a `term_exists` error body.
#[must_use]
pub fn existing_term_id(body: &Value) -> Option<u64> {
    if body.get("code").and_then(Value::as_str) != Some("term_exists") {
        return None;
    }
    let data = body.get("data")?;
    data.get("term_id").and_then(Value::as_u64)
}

/// Public link of a created post, or `"unknown"` when the response has none.
#[must_use]
pub fn post_link(body: &Value) -> &str {
    body.get("link").and_then(Value::as_str).unwrap_or("unknown")
}

/// Post id of a create-post response.
///
/// A response without an id is a non-retryable `InvalidResponse`: the post
/// may exist, and retrying could create it twice.
pub fn post_id_from_response(body: &Value) -> Result<PostId, CollaboratorError> {
    match body.get("id") {
        Some(Value::Number(id)) => Ok(PostId::new(id.to_string())),
        Some(Value::String(id)) if !id.is_empty() => Ok(PostId::new(id.clone())),
        _ => Err(
            CollaboratorError::publish(ErrorKind::InvalidResponse, "post id not found in response")
                .with_retryable(false),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> WordPressConfig {
        WordPressConfig {
            posts_url: "https://blog.example.com/wp-json/wp/v2/posts".to_string(),
            auth: WordPressAuth::Bearer("token".to_string()),
            status: PostStatus::Draft,
        }
    }

    #[test]
    fn test_tags_endpoint() {
        let posts = Url::parse("https://blog.example.com/wp-json/wp/v2/posts").unwrap();
        assert_eq!(
            tags_endpoint(&posts).unwrap().as_str(),
            "https://blog.example.com/wp-json/wp/v2/tags"
        );

        let trailing = Url::parse("https://blog.example.com/wp-json/wp/v2/posts/").unwrap();
        assert_eq!(
            tags_endpoint(&trailing).unwrap().as_str(),
            "https://blog.example.com/wp-json/wp/v2/tags"
        );

        let other = Url::parse("https://blog.example.com/api/articles").unwrap();
        assert!(tags_endpoint(&other).is_none());
    }

    #[test]
    fn test_post_id_from_response() {
        assert_eq!(
            post_id_from_response(&json!({"id": 42, "link": "https://blog/x"})).unwrap(),
            PostId::new("42")
        );
        assert_eq!(post_id_from_response(&json!({"id": "abc"})).unwrap(), PostId::new("abc"));

        let err = post_id_from_response(&json!({"link": "https://blog/x"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_post_link() {
        assert_eq!(post_link(&json!({"id": 42, "link": "https://blog/x"})), "https://blog/x");
        assert_eq!(post_link(&json!({"id": 42})), "unknown");
        assert_eq!(post_link(&json!({"link": 7})), "unknown");
    }

    #[test]
    fn test_existing_term_id() {
        let body = json!({"code": "term_exists", "message": "exists", "data": {"status": 400, "term_id": 17}});
        assert_eq!(existing_term_id(&body), Some(17));
        assert_eq!(existing_term_id(&json!({"code": "rest_forbidden"})), None);
        assert_eq!(existing_term_id(&Value::Null), None);
    }

    #[test]
    fn test_find_tag_is_case_insensitive_and_exact() {
        let listed = vec![
            WordPressTag { id: 1, name: "AI Safety".to_string() },
            WordPressTag { id: 2, name: "AI".to_string() },
        ];
        assert_eq!(find_tag(&listed, "ai").map(|t| t.id), Some(2));
        assert!(find_tag(&listed, "robots").is_none());
    }

    #[test]
    fn test_new_validates_url() {
        let publisher = WordPressPublisher::new(&config()).unwrap();
        assert_eq!(
            publisher.tags_url().map(Url::as_str),
            Some("https://blog.example.com/wp-json/wp/v2/tags")
        );

        let mut bad = config();
        bad.posts_url = "blog.example.com/posts".to_string();
        assert!(WordPressPublisher::new(&bad).is_err());
    }

    #[tokio::test]
    async fn test_empty_title_is_rejected_before_any_request() {
        let publisher = WordPressPublisher::new(&config()).unwrap();
        let err = publisher.publish(&Article::new("  ", "body")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(!err.is_retryable());
    }
}
