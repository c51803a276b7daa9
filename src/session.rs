//! One user's acquisition session.
//!
//! The session is the only writer of its [`AcquisitionMachine`]. Network work
//! runs on spawned tasks that report back through an internal channel, and
//! [`AcquisitionSession::step`] applies those reports one at a time, so the
//! state is only ever touched from the task driving the session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::core::{VideoMeta, VideoReference};
use crate::debounce::Debouncer;
use crate::download::{HttpTransport, ReqwestTransport};
use crate::error::{ClipFetchError, Result};
use crate::file::{AssetSelector, LocalFile};
use crate::state::{
    AcquisitionEvent, AcquisitionMachine, AcquisitionState, Applied, RequestSequence, Status,
};
use crate::youtube::{DownloadInitiator, MetadataFetcher, VideoIdentifier, VideoLink};
use crate::youtube::utils::{normalize_paste, parse_link};

enum Message {
    Settled(String),
    Lookup {
        request: RequestSequence,
        result: Result<VideoMeta>,
    },
    Download {
        request: RequestSequence,
        result: Result<PathBuf>,
    },
}

/// What a single [`AcquisitionSession::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    LookupStarted {
        request: RequestSequence,
        identifier: VideoIdentifier,
    },
    InputRejected {
        reason: String,
    },
    MetadataApplied {
        request: RequestSequence,
    },
    Delivered {
        request: RequestSequence,
        path: PathBuf,
    },
    DownloadFailed {
        request: RequestSequence,
        reason: String,
    },
    /// A response for a request that was superseded; dropped.
    Stale {
        request: RequestSequence,
    },
    /// Settled text that no longer matches the input, or input that arrived
    /// while a download was running.
    Ignored,
}

/// Outcome of asking for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadGate {
    Started(RequestSequence),
    /// Nothing to download yet, or a download is already running.
    Disabled,
}

pub struct AcquisitionSession {
    machine: AcquisitionMachine,
    input: String,
    link: Option<VideoLink>,
    debounce: Duration,
    debouncer: Debouncer<Message>,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
    in_flight: usize,
    fetcher: MetadataFetcher,
    downloader: DownloadInitiator,
    selector: Option<Arc<dyn AssetSelector>>,
}

impl AcquisitionSession {
    pub fn new(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            machine: AcquisitionMachine::new(),
            input: String::new(),
            link: None,
            debounce: config.debounce,
            debouncer: Debouncer::new(tx.clone()),
            tx,
            rx,
            in_flight: 0,
            fetcher: MetadataFetcher::new(transport.clone(), config.metadata_endpoint()),
            downloader: DownloadInitiator::new(
                transport,
                config.download_endpoint(),
                config.output_dir.clone(),
                config.extension.clone(),
            ),
            selector: None,
        }
    }

    /// Session talking to the configured backend over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn with_selector(mut self, selector: Arc<dyn AssetSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn state(&self) -> &AcquisitionState {
        self.machine.state()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn submit(&mut self, reference: VideoReference) -> Result<()> {
        match reference {
            VideoReference::File(path) => self.select_file(path).map(|_| ()),
            VideoReference::Text(text) => {
                self.edit_input(text);
                Ok(())
            }
        }
    }

    /// Replace the input text. Blank text resets the session right away;
    /// anything else is looked at once it stops changing.
    ///
    /// The input is frozen while a download is running.
    pub fn edit_input(&mut self, text: impl Into<String>) {
        if self.machine.state().status() == Status::Downloading {
            tracing::debug!("Input edit ignored while downloading");
            return;
        }
        self.input = text.into();

        if self.input.trim().is_empty() {
            self.debouncer.cancel_all();
            if self.machine.apply(AcquisitionEvent::InputCleared) == Applied::Committed {
                self.link = None;
            }
            return;
        }

        self.debouncer
            .schedule(Message::Settled(self.input.clone()), self.debounce);
    }

    /// Paste handling: a link found among the pasted words replaces the
    /// whole input, otherwise the text is taken as typed.
    pub fn paste(&mut self, text: &str) {
        match normalize_paste(text) {
            Some(link) => self.edit_input(link),
            None => self.edit_input(text),
        }
    }

    /// Hand a local file to the asset selector, bypassing the link pipeline.
    pub fn select_file(&mut self, path: impl Into<PathBuf>) -> Result<LocalFile> {
        let file = LocalFile::open(path.into())?;
        let selector = self.selector.as_ref().ok_or_else(|| {
            ClipFetchError::ConfigError("no asset selector configured".to_string())
        })?;
        tracing::info!(name = %file.file_name(), mime = %file.mime, "Local file selected");
        selector.select(file.clone());
        Ok(file)
    }

    pub fn request_download(&mut self) -> DownloadGate {
        let (Some(link), Some(meta)) = (self.link.clone(), self.machine.state().meta()) else {
            return DownloadGate::Disabled;
        };
        let title = meta.title.clone();
        let Some(request) = self.machine.begin_download() else {
            return DownloadGate::Disabled;
        };

        tracing::info!(%request, id = %link.identifier, "Download requested");
        let downloader = self.downloader.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = downloader.acquire(&link, &title).await;
            let _ = tx.send(Message::Download { request, result });
        });
        DownloadGate::Started(request)
    }

    /// Whether a timer or request is still outstanding.
    pub fn has_pending_work(&self) -> bool {
        self.in_flight > 0 || self.debouncer.is_pending() || !self.rx.is_empty()
    }

    /// Wait for the next internal message and apply it.
    pub async fn step(&mut self) -> Option<SessionUpdate> {
        let message = self.rx.recv().await?;
        Some(self.handle(message))
    }

    /// Step until nothing is outstanding.
    pub async fn settle(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while self.has_pending_work() {
            match self.step().await {
                Some(update) => updates.push(update),
                None => break,
            }
        }
        updates
    }

    /// Stop the debounce timer; in-flight requests still report but nothing new starts.
    pub fn shutdown(&mut self) {
        self.debouncer.cancel_all();
    }

    fn handle(&mut self, message: Message) -> SessionUpdate {
        match message {
            Message::Settled(text) => self.on_settled(text),
            Message::Lookup { request, result } => self.on_lookup(request, result),
            Message::Download { request, result } => self.on_download(request, result),
        }
    }

    fn on_settled(&mut self, text: String) -> SessionUpdate {
        if text != self.input || self.machine.state().status() == Status::Downloading {
            return SessionUpdate::Ignored;
        }

        let link = match parse_link(&text) {
            Ok(link) => link,
            Err(e) => {
                let reason = e.reason();
                tracing::debug!(%reason, "Input rejected");
                self.machine.apply(AcquisitionEvent::InputRejected {
                    reason: reason.clone(),
                });
                self.link = None;
                return SessionUpdate::InputRejected { reason };
            }
        };

        let Some(request) = self.machine.begin_lookup() else {
            return SessionUpdate::Ignored;
        };

        tracing::info!(%request, id = %link.identifier, "Looking up video metadata");
        let identifier = link.identifier.clone();
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        self.link = Some(link.clone());
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = fetcher.fetch(&link).await;
            let _ = tx.send(Message::Lookup { request, result });
        });

        SessionUpdate::LookupStarted {
            request,
            identifier,
        }
    }

    fn on_lookup(&mut self, request: RequestSequence, result: Result<VideoMeta>) -> SessionUpdate {
        self.in_flight = self.in_flight.saturating_sub(1);

        let event = match result {
            Ok(meta) => AcquisitionEvent::LookupSucceeded { request, meta },
            Err(e) => {
                tracing::warn!(%request, error = %e, "Metadata lookup failed");
                AcquisitionEvent::LookupFailed {
                    request,
                    reason: e.reason(),
                }
            }
        };

        match self.machine.apply(event) {
            Applied::Committed => SessionUpdate::MetadataApplied { request },
            Applied::Stale => SessionUpdate::Stale { request },
            Applied::Rejected => SessionUpdate::Ignored,
        }
    }

    fn on_download(&mut self, request: RequestSequence, result: Result<PathBuf>) -> SessionUpdate {
        self.in_flight = self.in_flight.saturating_sub(1);

        match result {
            Ok(path) => {
                match self
                    .machine
                    .apply(AcquisitionEvent::DownloadSucceeded { request })
                {
                    Applied::Committed => {
                        self.debouncer.cancel_all();
                        self.input.clear();
                        self.link = None;
                        SessionUpdate::Delivered { request, path }
                    }
                    Applied::Stale => SessionUpdate::Stale { request },
                    Applied::Rejected => SessionUpdate::Ignored,
                }
            }
            Err(e) => {
                let reason = e.reason();
                tracing::warn!(%request, %reason, "Download failed");
                match self.machine.apply(AcquisitionEvent::DownloadFailed {
                    request,
                    reason: reason.clone(),
                }) {
                    Applied::Committed => SessionUpdate::DownloadFailed { request, reason },
                    Applied::Stale => SessionUpdate::Stale { request },
                    Applied::Rejected => SessionUpdate::Ignored,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::mock::{MockTransport, json_response};
    use serde_json::json;
    use std::sync::Mutex;

    const LINK: &str = "https://youtu.be/dQw4w9WgXcQ";

    fn session(transport: &Arc<MockTransport>, output_dir: &std::path::Path) -> AcquisitionSession {
        let config = Config {
            output_dir: output_dir.to_path_buf(),
            ..Config::default()
        };
        AcquisitionSession::new(&config, transport.clone())
    }

    fn meta_body(title: &str) -> serde_json::Value {
        json!({
            "title": title,
            "thumbnail": "https://img/x.jpg",
            "duration": "3:21",
            "author": "Acme"
        })
    }

    async fn ready_session(
        transport: &Arc<MockTransport>,
        dir: &std::path::Path,
        title: &str,
    ) -> AcquisitionSession {
        transport.reply_json(200, meta_body(title));
        let mut session = session(transport, dir);
        session.edit_input(LINK);
        session.settle().await;
        assert_eq!(session.state().status(), Status::Ready);
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_typing_triggers_one_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.reply_json(200, meta_body("Test Video"));
        let mut session = session(&transport, dir.path());

        for text in [
            "https://youtu.be/d",
            "https://youtu.be/dQw4w",
            "https://youtu.be/dQw4w9WgXc",
            LINK,
        ] {
            session.edit_input(text);
            tokio::time::sleep(Duration::from_millis(120)).await;
        }
        let updates = session.settle().await;

        assert_eq!(transport.calls().len(), 1);
        assert_eq!(transport.calls()[0].1, json!({ "url": LINK }));
        assert!(matches!(
            updates.first(),
            Some(SessionUpdate::LookupStarted { identifier, .. }) if identifier.as_str() == "dQw4w9WgXcQ"
        ));
        let meta = session.state().meta().unwrap();
        assert_eq!(meta.title, "Test Video");
        assert_eq!(meta.channel_title, "Acme");
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_lookup_resolving_last_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let reply_a = transport.reply_later();
        let reply_b = transport.reply_later();
        let mut session = session(&transport, dir.path());

        session.edit_input("https://youtu.be/aaaaaaaaaaa");
        let Some(SessionUpdate::LookupStarted { request: a, .. }) = session.step().await else {
            panic!("lookup A did not start");
        };
        session.edit_input("https://youtu.be/bbbbbbbbbbb");
        let Some(SessionUpdate::LookupStarted { request: b, .. }) = session.step().await else {
            panic!("lookup B did not start");
        };

        reply_b.send(Ok(json_response(200, meta_body("B")))).unwrap();
        assert_eq!(
            session.step().await,
            Some(SessionUpdate::MetadataApplied { request: b })
        );
        reply_a.send(Ok(json_response(200, meta_body("A")))).unwrap();
        assert_eq!(session.step().await, Some(SessionUpdate::Stale { request: a }));

        assert_eq!(session.state().meta().unwrap().title, "B");
        assert!(!session.has_pending_work());
    }

    #[tokio::test(start_paused = true)]
    async fn test_paste_keeps_only_the_link() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.reply_json(200, meta_body("Test Video"));
        let mut session = session(&transport, dir.path());

        session.paste("check this out https://youtu.be/dQw4w9WgXcQ thanks");
        assert_eq!(session.input(), LINK);
        session.settle().await;
        assert_eq!(transport.calls()[0].1, json!({ "url": LINK }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_link_fails_without_request() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let mut session = session(&transport, dir.path());

        session.paste("just some words");
        assert_eq!(session.input(), "just some words");
        session.settle().await;

        assert_eq!(
            session.state(),
            &AcquisitionState::Failed("Invalid YouTube link.".to_string())
        );
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_failure_then_clear() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        transport.reply_json(503, json!({}));
        let mut session = session(&transport, dir.path());

        session.edit_input(LINK);
        session.settle().await;
        assert_eq!(session.state().status(), Status::Failed);

        session.edit_input("");
        assert_eq!(session.state(), &AcquisitionState::Idle);
        assert_eq!(session.request_download(), DownloadGate::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_from_ready_returns_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let mut session = ready_session(&transport, dir.path(), "T").await;

        session.edit_input("   ");
        assert_eq!(session.state(), &AcquisitionState::Idle);
        assert!(session.state().meta().is_none());
        assert!(session.state().error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_while_validating_drops_result() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let reply = transport.reply_later();
        let mut session = session(&transport, dir.path());

        session.edit_input(LINK);
        let Some(SessionUpdate::LookupStarted { request, .. }) = session.step().await else {
            panic!("lookup did not start");
        };
        session.edit_input("");
        assert_eq!(session.state(), &AcquisitionState::Idle);

        reply.send(Ok(json_response(200, meta_body("late")))).unwrap();
        assert_eq!(session.step().await, Some(SessionUpdate::Stale { request }));
        assert_eq!(session.state(), &AcquisitionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_delivers_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let mut session = ready_session(&transport, dir.path(), "Clip: a/b?").await;
        transport.reply_bytes(200, "video/mp4", b"movie");

        let DownloadGate::Started(request) = session.request_download() else {
            panic!("download not started");
        };
        assert_eq!(session.state().status(), Status::Downloading);
        assert_eq!(session.request_download(), DownloadGate::Disabled);

        let updates = session.settle().await;
        let expected = dir.path().join("Clip_ a_b_.mp4");
        assert_eq!(
            updates,
            vec![SessionUpdate::Delivered {
                request,
                path: expected.clone()
            }]
        );
        assert_eq!(std::fs::read(expected).unwrap(), b"movie");
        assert_eq!(session.state(), &AcquisitionState::Idle);
        assert_eq!(session.input(), "");
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(transport.calls()[1].1, json!({ "url": LINK }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_error_message_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let mut session = ready_session(&transport, dir.path(), "T").await;
        transport.reply_json(500, json!({ "error": "quota exceeded" }));

        assert!(matches!(session.request_download(), DownloadGate::Started(_)));
        session.settle().await;

        assert_eq!(
            session.state(),
            &AcquisitionState::Failed("quota exceeded".to_string())
        );
        assert_eq!(session.input(), LINK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_during_download_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let mut session = ready_session(&transport, dir.path(), "T").await;
        let reply = transport.reply_later();

        assert!(matches!(session.request_download(), DownloadGate::Started(_)));
        session.edit_input("https://youtu.be/bbbbbbbbbbb");
        session.paste("look https://youtu.be/ccccccccccc");
        session.edit_input("");
        assert_eq!(session.input(), LINK);
        assert_eq!(session.state().status(), Status::Downloading);

        reply
            .send(Ok(json_response(500, json!({ "error": "quota exceeded" }))))
            .unwrap();
        let updates = session.settle().await;
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], SessionUpdate::DownloadFailed { .. }));

        assert_eq!(
            session.state(),
            &AcquisitionState::Failed("quota exceeded".to_string())
        );
        assert_eq!(session.input(), LINK);
        // no lookup was ever started for the ignored edits
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!session.has_pending_work());
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_accepted_again_after_download() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MockTransport::new());
        let mut session = ready_session(&transport, dir.path(), "T").await;
        transport.reply_bytes(200, "video/mp4", b"x");

        session.request_download();
        session.edit_input("https://youtu.be/bbbbbbbbbbb");
        session.settle().await;
        assert_eq!(session.state(), &AcquisitionState::Idle);
        assert_eq!(session.input(), "");

        session.edit_input("https://youtu.be/bbbbbbbbbbb");
        assert_eq!(session.input(), "https://youtu.be/bbbbbbbbbbb");
    }

    #[derive(Default)]
    struct RecordingSelector {
        selected: Mutex<Vec<LocalFile>>,
    }

    impl AssetSelector for RecordingSelector {
        fn select(&self, file: LocalFile) {
            self.selected.lock().unwrap().push(file);
        }
    }

    #[tokio::test]
    async fn test_file_reference_goes_to_selector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.webm");
        std::fs::write(&path, b"webm").unwrap();

        let transport = Arc::new(MockTransport::new());
        let selector = Arc::new(RecordingSelector::default());
        let mut session = session(&transport, dir.path()).with_selector(selector.clone());

        session.submit(VideoReference::File(path.clone())).unwrap();

        let selected = selector.selected.lock().unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].path, path);
        assert_eq!(session.state(), &AcquisitionState::Idle);
        assert_eq!(session.input(), "");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_file_reference_without_selector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.mp4");
        std::fs::write(&path, b"mp4").unwrap();
        let transport = Arc::new(MockTransport::new());
        let mut session = session(&transport, dir.path());

        assert!(matches!(
            session.submit(VideoReference::File(path)),
            Err(ClipFetchError::ConfigError(_))
        ));
    }
}
