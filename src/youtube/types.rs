use serde::{Deserialize, Serialize};

use crate::core::{VideoMeta, format_duration};

#[derive(Debug, Serialize)]
pub struct LinkRequest<'a> {
    pub url: &'a str,
}

/// `duration` arrives either preformatted or as a number of seconds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DurationField {
    Text(String),
    Seconds(f64),
}

impl DurationField {
    pub fn display(&self) -> String {
        match self {
            DurationField::Text(text) => text.clone(),
            DurationField::Seconds(secs) if secs.is_finite() && *secs >= 0.0 => {
                format_duration(secs.round() as u64)
            }
            DurationField::Seconds(_) => String::new(),
        }
    }
}

/// Body of a successful metadata lookup
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub duration: Option<DurationField>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(rename = "channelTitle", default)]
    pub channel_title: Option<String>,
}

impl From<MetadataResponse> for VideoMeta {
    fn from(response: MetadataResponse) -> Self {
        let channel_title = [response.author, response.channel_title]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or_default();
        VideoMeta {
            id: response.id,
            title: response.title,
            thumbnail_url: response.thumbnail,
            duration_display: response
                .duration
                .map(|duration| duration.display())
                .unwrap_or_default(),
            channel_title,
        }
    }
}

/// Error body the download job may return with a failing status
#[derive(Debug, Clone, Deserialize)]
pub struct JobErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
