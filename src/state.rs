//! Acquisition state machine.
//!
//! [`reduce`] is the pure transition table. [`AcquisitionMachine`] owns the
//! single [`AcquisitionState`] of a session together with the request
//! sequence counter, and drops results whose request was superseded.

use std::fmt;

use strum_macros::{AsRefStr, Display};

use crate::core::VideoMeta;

/// Sequence number handed out when a metadata or download request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestSequence(u64);

impl fmt::Display for RequestSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic counter; only the most recently issued number is current.
#[derive(Debug, Default)]
pub struct SequenceGuard {
    latest: u64,
}

impl SequenceGuard {
    pub fn issue(&mut self) -> RequestSequence {
        self.latest += 1;
        RequestSequence(self.latest)
    }

    /// Supersede every issued number without starting a request.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    pub fn is_current(&self, request: RequestSequence) -> bool {
        request.0 == self.latest
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AcquisitionState {
    #[default]
    Idle,
    Validating,
    Ready(VideoMeta),
    Failed(String),
    Downloading(VideoMeta),
}

/// Tag of an [`AcquisitionState`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Idle,
    Validating,
    Ready,
    Failed,
    Downloading,
}

impl AcquisitionState {
    pub fn status(&self) -> Status {
        match self {
            AcquisitionState::Idle => Status::Idle,
            AcquisitionState::Validating => Status::Validating,
            AcquisitionState::Ready(_) => Status::Ready,
            AcquisitionState::Failed(_) => Status::Failed,
            AcquisitionState::Downloading(_) => Status::Downloading,
        }
    }

    pub fn meta(&self) -> Option<&VideoMeta> {
        match self {
            AcquisitionState::Ready(meta) | AcquisitionState::Downloading(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AcquisitionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// A request is outstanding and the state will change on its own.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AcquisitionState::Validating | AcquisitionState::Downloading(_)
        )
    }

    pub fn can_download(&self) -> bool {
        matches!(self, AcquisitionState::Ready(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    /// Settled input held an identifier and a lookup is starting.
    LookupStarted { request: RequestSequence },
    LookupSucceeded {
        request: RequestSequence,
        meta: VideoMeta,
    },
    LookupFailed {
        request: RequestSequence,
        reason: String,
    },
    /// Settled input is not empty but holds no identifier.
    InputRejected { reason: String },
    InputCleared,
    DownloadRequested { request: RequestSequence },
    DownloadSucceeded { request: RequestSequence },
    DownloadFailed {
        request: RequestSequence,
        reason: String,
    },
}

impl AcquisitionEvent {
    /// Sequence of the request whose completion this event reports.
    fn completes(&self) -> Option<RequestSequence> {
        match self {
            AcquisitionEvent::LookupSucceeded { request, .. }
            | AcquisitionEvent::LookupFailed { request, .. }
            | AcquisitionEvent::DownloadSucceeded { request }
            | AcquisitionEvent::DownloadFailed { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Transition table. `None` means the event is not accepted in `state`.
pub fn reduce(state: &AcquisitionState, event: &AcquisitionEvent) -> Option<AcquisitionState> {
    use AcquisitionEvent as E;
    use AcquisitionState as S;

    match (state, event) {
        (S::Downloading(_), E::LookupStarted { .. } | E::InputRejected { .. }) => None,
        (_, E::LookupStarted { .. }) => Some(S::Validating),
        (_, E::InputRejected { reason }) => Some(S::Failed(reason.clone())),

        (S::Validating, E::LookupSucceeded { meta, .. }) => Some(S::Ready(meta.clone())),
        (S::Validating, E::LookupFailed { reason, .. }) => Some(S::Failed(reason.clone())),

        (S::Downloading(_), E::InputCleared) => None,
        (_, E::InputCleared) => Some(S::Idle),

        (S::Ready(meta), E::DownloadRequested { .. }) => Some(S::Downloading(meta.clone())),
        (S::Downloading(_), E::DownloadSucceeded { .. }) => Some(S::Idle),
        (S::Downloading(_), E::DownloadFailed { reason, .. }) => Some(S::Failed(reason.clone())),

        _ => None,
    }
}

/// Result of feeding one event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Committed,
    /// Completion of a superseded request; state untouched.
    Stale,
    /// Not a legal transition from the current state; state untouched.
    Rejected,
}

/// Sole owner and writer of a session's [`AcquisitionState`].
#[derive(Debug, Default)]
pub struct AcquisitionMachine {
    state: AcquisitionState,
    sequence: SequenceGuard,
}

impl AcquisitionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    pub fn is_current(&self, request: RequestSequence) -> bool {
        self.sequence.is_current(request)
    }

    /// Enter `Validating` under a fresh sequence number.
    pub fn begin_lookup(&mut self) -> Option<RequestSequence> {
        self.begin(|request| AcquisitionEvent::LookupStarted { request })
    }

    /// Enter `Downloading` under a fresh sequence number. `None` while the
    /// action is unavailable, including while a download is already running.
    pub fn begin_download(&mut self) -> Option<RequestSequence> {
        self.begin(|request| AcquisitionEvent::DownloadRequested { request })
    }

    fn begin(
        &mut self,
        event: impl FnOnce(RequestSequence) -> AcquisitionEvent,
    ) -> Option<RequestSequence> {
        let mut candidate = SequenceGuard {
            latest: self.sequence.latest,
        };
        let request = candidate.issue();
        let next = reduce(&self.state, &event(request))?;
        self.sequence = candidate;
        self.commit(next);
        Some(request)
    }

    pub fn apply(&mut self, event: AcquisitionEvent) -> Applied {
        if let Some(request) = event.completes()
            && !self.sequence.is_current(request)
        {
            tracing::debug!(%request, "Discarding stale response");
            return Applied::Stale;
        }

        let Some(next) = reduce(&self.state, &event) else {
            tracing::debug!(state = %self.state.status(), ?event, "Transition rejected");
            return Applied::Rejected;
        };

        if matches!(
            event,
            AcquisitionEvent::InputCleared | AcquisitionEvent::InputRejected { .. }
        ) {
            // a lookup still in flight must not land after the input moved on
            self.sequence.invalidate();
        }
        self.commit(next);
        Applied::Committed
    }

    fn commit(&mut self, next: AcquisitionState) {
        tracing::debug!(from = %self.state.status(), to = %next.status(), "State transition");
        self.state = next;
    }
}
