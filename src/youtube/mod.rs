pub mod download;
pub mod metadata;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use download::{DownloadInitiator, file_name_for, sanitize_title};
pub use metadata::MetadataFetcher;
pub use types::{DurationField, MetadataResponse};
pub use utils::{
    VideoIdentifier, VideoLink, extract_identifier, is_valid_link, normalize_paste, parse_link,
};
