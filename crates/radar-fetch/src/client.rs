//! HTTP client abstraction.
//!
//! The fetcher only needs `get`/`post` returning status, headers and body, so
//! remote APIs sit behind the [`HttpClient`] trait and tests can script
//! responses without a network.

use crate::error::{FetchError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers with lowercase names
    pub headers: HashMap<String, String>,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Build a response with a JSON body and no headers.
    #[must_use]
    pub fn json_body(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
        }
    }

    /// Add a header, normalising the name to lowercase.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status signals a secondary rate limit.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status == 403 || self.status == 429
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| FetchError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

/// Minimal HTTP surface consumed by the fetcher and collectors.
///
/// `path` is relative to the client's base URL unless it is an absolute
/// `http(s)://` URL.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request with query parameters.
    ///
    /// # Errors
    /// Returns [`FetchError::Transport`] when no response was received. Non-2xx
    /// statuses are returned as responses, not errors.
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<HttpResponse>;

    /// Issue a POST request with a JSON body.
    async fn post(&self, path: &str, body: &Value) -> Result<HttpResponse>;
}

/// `reqwest`-backed client bound to one API base URL.
pub struct ReqwestClient {
    client: Client,
    base_url: String,
}

impl ReqwestClient {
    /// Create a client for `base_url` with an optional bearer token.
    pub fn new(base_url: impl Into<String>, token: Option<&str>, timeout: Duration) -> Result<Self> {
        Self::with_headers(base_url, token, timeout, &[])
    }

    /// Create a client that also sends the given default headers.
    pub fn with_headers(
        base_url: impl Into<String>,
        token: Option<&str>,
        timeout: Duration,
        extra_headers: &[(&str, &str)],
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("radar/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| FetchError::Client(format!("invalid token header: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::Client(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::Client(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    async fn buffer(path: &str, response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| transport(path, &e))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport(path: &str, err: &reqwest::Error) -> FetchError {
    FetchError::Transport {
        path: path.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<HttpResponse> {
        let url = self.url(path);
        tracing::debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| transport(path, &e))?;

        Self::buffer(path, response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<HttpResponse> {
        let url = self.url(path);
        tracing::debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport(path, &e))?;

        Self::buffer(path, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::json_body(200, &json!({"login": "octocat"}))
            .with_header("X-RateLimit-Remaining", "42");

        assert!(response.is_success());
        assert!(!response.is_rate_limited());
        assert_eq!(response.header("x-ratelimit-remaining"), Some("42"));
        assert_eq!(response.header("X-RATELIMIT-REMAINING"), Some("42"));

        let body: Value = response.json("/users/octocat").expect("decode body");
        assert_eq!(body["login"], "octocat");
    }

    #[test]
    fn test_rate_limited_statuses() {
        assert!(HttpResponse::json_body(403, &json!({})).is_rate_limited());
        assert!(HttpResponse::json_body(429, &json!({})).is_rate_limited());
        assert!(!HttpResponse::json_body(404, &json!({})).is_rate_limited());
    }

    #[test]
    fn test_decode_error_names_path() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: "<html>".to_string(),
        };
        let err = response.json::<Value>("/repos/a/b").unwrap_err();
        assert!(err.to_string().contains("/repos/a/b"));
    }

    #[test]
    fn test_url_joining() {
        let client = ReqwestClient::new(
            "https://api.github.com/",
            Some("token"),
            Duration::from_secs(5),
        )
        .expect("build client");

        assert_eq!(client.url("/users/octocat"), "https://api.github.com/users/octocat");
        assert_eq!(client.url("users/octocat"), "https://api.github.com/users/octocat");
        assert_eq!(
            client.url("https://raw.githubusercontent.com/a/b/main/x.py"),
            "https://raw.githubusercontent.com/a/b/main/x.py"
        );
    }
}
