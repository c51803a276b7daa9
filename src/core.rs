use std::path::PathBuf;

/// Raw input as the user supplied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoReference {
    /// Dropped or picked file; never normalized.
    File(PathBuf),
    /// Typed or pasted text.
    Text(String),
}

impl From<PathBuf> for VideoReference {
    fn from(path: PathBuf) -> Self {
        VideoReference::File(path)
    }
}

impl From<String> for VideoReference {
    fn from(text: String) -> Self {
        VideoReference::Text(text)
    }
}

impl From<&str> for VideoReference {
    fn from(text: &str) -> Self {
        VideoReference::Text(text.to_string())
    }
}

/// Descriptive metadata for a resolved video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMeta {
    pub id: Option<String>,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_display: String,
    pub channel_title: String,
}

impl VideoMeta {
    /// Create metadata with only a title set
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            thumbnail_url: String::new(),
            duration_display: String::new(),
            channel_title: String::new(),
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = url.into();
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration_display = duration.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel_title = channel.into();
        self
    }
}

/// Binary payload returned by the download job
#[derive(Debug, Clone, Default)]
pub struct AssetBlob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl AssetBlob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Render a duration in seconds as `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
