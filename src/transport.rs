//! Per-invocation HTTP transport settings and response handling shared by
//! the HTTP adapters.

use reqwest::header::HeaderValue;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Deserializer};

use crate::error::{Result, RotationError};

const BODY_SNIPPET_LEN: usize = 200;

/// Transport settings handed to an adapter when it is built.
///
/// Nothing here is process-wide: each adapter builds its own client from
/// its own copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
    /// Replace the backend's default endpoint (regional clouds, tests).
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

impl TransportConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn client(&self) -> Result<Client> {
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("credrotate/{}", env!("CARGO_PKG_VERSION")));

        Client::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .user_agent(user_agent)
            .build()
            .map_err(|e| RotationError::Transport(format!("failed to build HTTP client: {e}")))
    }

    /// The configured base URL, or `default`, without a trailing slash.
    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Build a header value that is redacted from debug output.
pub(crate) fn sensitive_header(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        RotationError::Authentication("credential contains characters not allowed in a header".to_string())
    })?;
    header.set_sensitive(true);
    Ok(header)
}

pub(crate) fn send_failed(action: &str, err: reqwest::Error) -> RotationError {
    // The URL stays out of the status line.
    RotationError::Transport(format!("{action}: {}", err.without_url()))
}

/// Turn a non-success response into a typed error.
///
/// 401/403 mean the administrative credential was rejected.
pub(crate) async fn expect_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, action, &body))
}

pub(crate) fn status_error(status: StatusCode, action: &str, body: &str) -> RotationError {
    let detail = snippet(body);
    let message = if detail.is_empty() {
        format!("{action}: HTTP {status}")
    } else {
        format!("{action}: HTTP {status}: {detail}")
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RotationError::Authentication(message),
        _ => RotationError::Transport(message),
    }
}

/// Parse a JSON response body. Parse errors never quote the body.
pub(crate) async fn read_json<T: for<'de> Deserialize<'de>>(
    response: Response,
    action: &str,
) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| send_failed(action, e))?;

    serde_json::from_str(&body).map_err(|e| {
        RotationError::Transport(format!(
            "{action}: unexpected response body ({:?} error at line {}, column {})",
            e.classify(),
            e.line(),
            e.column()
        ))
    })
}

pub(crate) fn snippet(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Accept remote ids given as either JSON strings or numbers.
pub(crate) fn deserialize_remote_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn base_url_override_strips_trailing_slash() {
        let config = TransportConfig::default();
        assert_eq!(config.base_url_or("https://api.meraki.com/api/v1/"), "https://api.meraki.com/api/v1");

        let config = config.with_base_url("http://127.0.0.1:8080/");
        assert_eq!(config.base_url_or("https://api.meraki.com/api/v1"), "http://127.0.0.1:8080");
    }

    #[test]
    fn auth_statuses_map_to_authentication() {
        let err = status_error(StatusCode::UNAUTHORIZED, "list users", "");
        assert_eq!(err.kind(), ErrorKind::AuthenticationError);
        assert_eq!(err.to_string(), "backend rejected the administrative credential: list users: HTTP 401 Unauthorized");

        let err = status_error(StatusCode::FORBIDDEN, "list users", "denied");
        assert_eq!(err.kind(), ErrorKind::AuthenticationError);

        let err = status_error(StatusCode::BAD_GATEWAY, "list users", "upstream");
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert!(err.to_string().ends_with("HTTP 502 Bad Gateway: upstream"));
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let body = "x".repeat(500);
        let cut = snippet(&body);
        assert_eq!(cut.len(), BODY_SNIPPET_LEN + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(snippet("  short \n"), "short");
    }

    #[test]
    fn remote_ids_accept_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "deserialize_remote_id")]
            id: String,
        }

        let row: Row = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(row.id, "42");
        let row: Row = serde_json::from_str(r#"{"id": "L_646829496481105433"}"#).unwrap();
        assert_eq!(row.id, "L_646829496481105433");
    }

    #[test]
    fn sensitive_header_rejects_newlines() {
        assert!(sensitive_header("accessKey=a;secretKey=b").is_ok());
        let err = sensitive_header("bad\nvalue").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationError);
    }
}
