//! Shared plumbing for the HTTP collaborators.

use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::errors::ErrorKind;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("newsdesk/", env!("CARGO_PKG_VERSION"));

/// Client shared by the generation and publishing collaborators.
///
/// Whole-call timeouts are left to the retry policy; only connecting is
/// bounded here.
pub(crate) fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}

/// Kind of a request that never produced a response.
pub(crate) fn transport_kind(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_decode() {
        ErrorKind::InvalidResponse
    } else {
        ErrorKind::Transport
    }
}

/// Kind of an unsuccessful response.
pub(crate) fn status_kind(status: StatusCode) -> ErrorKind {
    ErrorKind::from_status(status.as_u16())
}

/// First few hundred characters of an error body, for messages.
pub(crate) fn excerpt(body: &str) -> &str {
    const LIMIT: usize = 300;
    match body.char_indices().nth(LIMIT) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_kind() {
        assert_eq!(status_kind(StatusCode::UNAUTHORIZED), ErrorKind::Authentication);
        assert_eq!(status_kind(StatusCode::FORBIDDEN), ErrorKind::Authentication);
        assert_eq!(status_kind(StatusCode::TOO_MANY_REQUESTS), ErrorKind::RateLimited);
        assert_eq!(status_kind(StatusCode::BAD_GATEWAY), ErrorKind::ServerError);
        assert_eq!(status_kind(StatusCode::NOT_FOUND), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let long = "é".repeat(400);
        assert_eq!(excerpt(&long).chars().count(), 300);
        assert_eq!(excerpt("short"), "short");
    }
}
