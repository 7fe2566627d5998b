use std::fmt;
use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{prelude::*, Error};

/// Longest raw body excerpt carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Deserialize, Debug)]
struct ErrorData {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Supplies the bearer token attached to every outgoing request.
///
/// Minting and refreshing tokens is the caller's business; a 401 comes back
/// as [`Error::Unauthorized`] and the caller decides how to re-authenticate.
pub trait TokenSource: Send + Sync + fmt::Debug {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, e.g. read once from the environment.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
    pub base_url: String,
    pub(crate) token_source: Option<Arc<dyn TokenSource>>,
}

/// Join `segments` onto `base_url`, percent-encoding each one as a single path segment.
pub(crate) fn build_url(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| Error::network(format!("invalid base url '{base_url}': {e}")))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::network(format!("base url '{base_url}' cannot carry a path")))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

/// Classify a non-success response. No retries: the caller sees the first failure.
pub(crate) fn classify_failure(status: u16, body: &str) -> Error {
    let message = error_message(status, body);
    match status {
        401 => Error::unauthorized(message),
        404 => Error::not_found(message),
        _ => Error::server_error(status, message),
    }
}

fn error_message(status: u16, body: &str) -> String {
    if let Ok(data) = serde_json::from_str::<ErrorData>(body) {
        match (data.detail, data.message) {
            (Some(serde_json::Value::String(detail)), _) => return detail,
            (Some(detail), _) if !detail.is_null() => return detail.to_string(),
            (_, Some(message)) => return message,
            _ => {}
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown error")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

async fn parse_response(response: Response) -> Result<String> {
    let status_code = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| Error::network(e.to_string()))?;

    if status_code < 400 {
        return Ok(text);
    }
    Err(classify_failure(status_code, &text))
}

impl HttpClient {
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        build_url(&self.base_url, segments)
    }

    pub async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<String> {
        let request = self.client.get(url).query(query);
        self.execute(request).await
    }

    pub async fn post(&self, url: Url) -> Result<String> {
        let request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        self.execute(request).await
    }

    async fn execute(&self, mut request: RequestBuilder) -> Result<String> {
        if let Some(token) = self
            .token_source
            .as_ref()
            .and_then(|source| source.bearer_token())
        {
            request = request.bearer_auth(token);
        }

        let request = request
            .build()
            .map_err(|e| Error::network(e.to_string()))?;
        debug!(method = %request.method(), url = %request.url(), "Sending risk API request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_build_url_encodes_subject() {
        let url = build_url("https://api.example.com", &["api", "risk", "score", "acme/eu 1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/risk/score/acme%2Feu%201"
        );
    }

    #[test]
    fn test_build_url_keeps_base_path() {
        let url = build_url("https://example.com/v2/", &["api", "risk"]).unwrap();
        assert_eq!(url.path(), "/v2/api/risk");
    }

    #[test]
    fn test_build_url_rejects_garbage_base() {
        let err = build_url("not a url", &["api"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_classify_status_codes() {
        assert_eq!(classify_failure(401, "").kind(), ErrorKind::Unauthorized);
        assert_eq!(classify_failure(404, "").kind(), ErrorKind::NotFound);
        assert_eq!(classify_failure(400, "").kind(), ErrorKind::Server);
        assert_eq!(classify_failure(500, "").kind(), ErrorKind::Server);
        assert_eq!(classify_failure(503, "").kind(), ErrorKind::Server);
    }

    #[test]
    fn test_fastapi_detail_becomes_message() {
        let err = classify_failure(404, r#"{"detail": "Supplier not found"}"#);
        assert_eq!(err, Error::not_found("Supplier not found"));
    }

    #[test]
    fn test_message_field_and_fallbacks() {
        let err = classify_failure(500, r#"{"message": "db down"}"#);
        assert_eq!(err, Error::server_error(500, "db down"));

        let err = classify_failure(502, "");
        assert_eq!(err, Error::server_error(502, "Bad Gateway"));

        let long = "x".repeat(1000);
        match classify_failure(500, &long) {
            Error::Server { message, .. } => assert_eq!(message.len(), MAX_ERROR_BODY_CHARS),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_static_token_debug_is_redacted() {
        let token = StaticToken::new("secret");
        assert!(!format!("{token:?}").contains("secret"));
        assert_eq!(token.bearer_token().as_deref(), Some("secret"));
    }
}
