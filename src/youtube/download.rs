use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::core::AssetBlob;
use crate::download::HttpTransport;
use crate::error::{ClipFetchError, Result};
use crate::youtube::types::{JobErrorBody, LinkRequest};
use crate::youtube::utils::VideoLink;

pub const GENERIC_JOB_FAILURE: &str = "The server could not process the video.";
const FALLBACK_STEM: &str = "video";
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
/// Per-component limit on common filesystems, in bytes.
const MAX_FILE_NAME_BYTES: usize = 255;

/// Replace every character of `<>:"/\|?*` with `_`.
///
/// Titles that are still unsafe afterwards (control characters, reserved
/// device names) go through `sanitize_filename` with the same replacement.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let safe = if sanitize_filename::is_sanitized(&replaced) {
        replaced
    } else {
        sanitize_filename::sanitize_with_options(
            &replaced,
            sanitize_filename::Options {
                windows: true,
                truncate: true,
                replacement: "_",
            },
        )
    };

    if safe.trim().is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        safe
    }
}

fn truncate_on_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// File name for `title`, with the stem cut so the whole name fits in
/// [`MAX_FILE_NAME_BYTES`] once the extension is appended.
pub fn file_name_for(title: &str, extension: &str) -> String {
    let stem = sanitize_title(title);
    let budget = MAX_FILE_NAME_BYTES.saturating_sub(extension.len() + 1);
    let stem = truncate_on_char_boundary(&stem, budget).trim_end_matches([' ', '.']);
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };
    format!("{}.{}", stem, extension)
}

/// Triggers the backend download job and writes the returned asset to disk.
#[derive(Clone)]
pub struct DownloadInitiator {
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
    output_dir: PathBuf,
    extension: String,
}

impl DownloadInitiator {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        endpoint: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    /// Ask the backend for the asset behind `link`.
    pub async fn start(&self, link: &VideoLink) -> Result<AssetBlob> {
        let body = serde_json::to_value(LinkRequest { url: &link.url })?;
        tracing::info!(id = %link.identifier, endpoint = %self.endpoint, "Starting download job");

        let response = self
            .transport
            .post_json(&self.endpoint, &body)
            .await
            .map_err(|e| ClipFetchError::DownloadFailure(e.to_string()))?;

        if !response.is_success() {
            let reason = response
                .json::<JobErrorBody>()
                .ok()
                .and_then(|body| body.error)
                .filter(|msg| !msg.trim().is_empty())
                .unwrap_or_else(|| GENERIC_JOB_FAILURE.to_string());
            tracing::warn!(status = response.status, %reason, "Download job failed");
            return Err(ClipFetchError::DownloadFailure(reason));
        }

        Ok(AssetBlob {
            bytes: response.body,
            content_type: response.content_type,
        })
    }

    /// Write `blob` into the output directory under a name derived from `title`.
    ///
    /// Bytes go to a temporary file first; it is removed on every failure path
    /// and renamed into place only once fully written.
    pub fn deliver(&self, blob: &AssetBlob, title: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let target = self.output_dir.join(file_name_for(title, &self.extension));

        let mut staged = NamedTempFile::new_in(&self.output_dir)?;
        staged.write_all(&blob.bytes)?;
        staged.as_file().sync_all()?;
        // dropping the PersistError's file removes the staged copy
        staged
            .persist(&target)
            .map_err(|e| ClipFetchError::IoError(e.error))?;

        tracing::info!(
            path = %target.display(),
            bytes = blob.len(),
            content_type = blob.content_type.as_deref().unwrap_or("unknown"),
            "Saved video"
        );
        Ok(target)
    }

    pub async fn acquire(&self, link: &VideoLink, title: &str) -> Result<PathBuf> {
        let blob = self.start(link).await?;
        if blob.is_empty() {
            return Err(ClipFetchError::DownloadFailure(
                GENERIC_JOB_FAILURE.to_string(),
            ));
        }
        let initiator = self.clone();
        let title = title.to_string();
        tokio::task::spawn_blocking(move || initiator.deliver(&blob, &title))
            .await
            .map_err(|e| ClipFetchError::IoError(std::io::Error::other(e)))?
    }
}
