use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ClipFetchError, Result};

const DEFAULT_USER_AGENT: &str = concat!("clipfetch/", env!("CARGO_PKG_VERSION"));

/// Status, content type and raw body of a finished HTTP exchange.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(ClipFetchError::from)
    }
}

/// Outbound HTTP seam shared by the metadata and download components.
///
/// Implementations return `Err` only when no response was obtained at all
/// (connection failure, timeout). Non-2xx statuses come back as a normal
/// [`HttpResponse`] so callers can read the error body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .default_headers(get_default_headers())
            .build()?;
        Ok(Self { client })
    }
}

/// Get default headers for requests
fn get_default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ClipFetchError::RequestTimeout(url.to_string())
            } else {
                ClipFetchError::NetworkError(e)
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ClipFetchError::RequestTimeout(url.to_string())
            } else {
                ClipFetchError::NetworkError(e)
            }
        })?;

        tracing::debug!(url, status, len = bytes.len(), "HTTP exchange finished");

        Ok(HttpResponse {
            status,
            content_type,
            body: bytes.to_vec(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        let ok = HttpResponse {
            status: 204,
            ..Default::default()
        };
        let redirect = HttpResponse {
            status: 304,
            ..Default::default()
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn test_json_body() {
        let response = mock::json_response(200, serde_json::json!({ "title": "x" }));
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["title"], "x");

        let garbage = HttpResponse {
            status: 200,
            content_type: None,
            body: b"<html>".to_vec(),
        };
        assert!(matches!(
            garbage.json::<serde_json::Value>(),
            Err(ClipFetchError::JsonError(_))
        ));
    }

    #[tokio::test]
    async fn test_client_builds_with_timeout() {
        assert!(ReqwestTransport::new(Duration::from_secs(5)).is_ok());
    }
}
