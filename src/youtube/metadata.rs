use std::sync::Arc;

use crate::core::VideoMeta;
use crate::download::HttpTransport;
use crate::error::{ClipFetchError, Result};
use crate::youtube::types::{LinkRequest, MetadataResponse};
use crate::youtube::utils::VideoLink;

/// Resolves a validated link into [`VideoMeta`] through the metadata endpoint.
///
/// One outbound call per [`fetch`](Self::fetch); failures are never retried here.
#[derive(Clone)]
pub struct MetadataFetcher {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl MetadataFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub async fn fetch(&self, link: &VideoLink) -> Result<VideoMeta> {
        let body = serde_json::to_value(LinkRequest { url: &link.url })?;
        tracing::debug!(id = %link.identifier, endpoint = %self.endpoint, "Fetching video metadata");

        let response = self
            .transport
            .post_json(&self.endpoint, &body)
            .await
            .map_err(|e| {
                ClipFetchError::MetadataFetchFailure(format!("Failed to fetch video metadata: {e}"))
            })?;

        if !response.is_success() {
            return Err(ClipFetchError::MetadataFetchFailure(format!(
                "Failed to fetch video metadata (HTTP {}).",
                response.status
            )));
        }

        let parsed: MetadataResponse = response.json().map_err(|e| {
            ClipFetchError::MetadataFetchFailure(format!("Malformed metadata response: {e}"))
        })?;
        Ok(parsed.into())
    }
}
