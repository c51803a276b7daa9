pub mod config;
pub mod core;
pub mod debounce;
pub mod download;
pub mod error;
pub mod file;
pub mod session;
pub mod state;
pub mod youtube;

pub use config::Config;
pub use crate::core::{AssetBlob, VideoMeta, VideoReference};
pub use debounce::{DebounceHandle, Debouncer};
pub use download::{HttpResponse, HttpTransport, ReqwestTransport};
pub use error::{ClipFetchError, Result};
pub use file::{AssetSelector, LocalFile};
pub use session::{AcquisitionSession, DownloadGate, SessionUpdate};
pub use state::{AcquisitionEvent, AcquisitionMachine, AcquisitionState, Applied, RequestSequence};
pub use youtube::{DownloadInitiator, MetadataFetcher, VideoIdentifier, VideoLink};

