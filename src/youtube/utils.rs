use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{ClipFetchError, Result};

pub const INVALID_LINK_MESSAGE: &str = "Invalid YouTube link.";
pub const EMPTY_LINK_MESSAGE: &str = "Paste a YouTube link first.";

/// Same pattern shared links and bookmarks were validated with; keep it byte-compatible.
static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?|shorts)/|.*[?&]v=)|youtu\.be/)([^"&?/ ]{11})"#,
    )
    .expect("video id pattern compiles")
});

/// The 11-character token naming a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoIdentifier(String);

impl VideoIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A link that passed validation, kept together with its identifier.
///
/// The backend receives `url` verbatim; `identifier` is only used locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLink {
    pub url: String,
    pub identifier: VideoIdentifier,
}

/// Extract the video identifier from a YouTube URL
pub fn extract_identifier(text: &str) -> Option<VideoIdentifier> {
    VIDEO_ID_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| VideoIdentifier(m.as_str().to_string()))
}

pub fn is_valid_link(text: &str) -> bool {
    extract_identifier(text).is_some()
}

/// First whitespace-separated token of a paste that holds a video link.
pub fn normalize_paste(text: &str) -> Option<&str> {
    text.split_whitespace().find(|token| is_valid_link(token))
}

/// Validate typed input into a [`VideoLink`].
pub fn parse_link(text: &str) -> Result<VideoLink> {
    let url = text.trim();
    if url.is_empty() {
        return Err(ClipFetchError::ValidationFailure(
            EMPTY_LINK_MESSAGE.to_string(),
        ));
    }
    let identifier = extract_identifier(url)
        .ok_or_else(|| ClipFetchError::InvalidReference(INVALID_LINK_MESSAGE.to_string()))?;
    Ok(VideoLink {
        url: url.to_string(),
        identifier,
    })
}

/// Construct YouTube watch URL from video ID
pub fn build_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
