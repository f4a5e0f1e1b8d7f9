use std::collections::BTreeMap;
use std::fmt;

use tracker_core::{Generation, PollFailure, Seq, StatusBatch, TaskId};

/// Task id to display name, from the profile listing.
pub type LabelMap = BTreeMap<TaskId, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StatusesFetched {
        seq: Seq,
        result: Result<StatusBatch, StatusError>,
    },
    LabelsFetched {
        seq: Seq,
        result: Result<LabelMap, StatusError>,
    },
    StopAcknowledged {
        task_id: TaskId,
        generation: Generation,
        result: Result<(), StatusError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StatusError {
    pub kind: FailureKind,
    pub message: String,
}

impl StatusError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == FailureKind::Unauthorized
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    /// HTTP 401. Never folded into `HttpStatus`.
    Unauthorized,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Unauthorized => write!(f, "unauthorized"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

impl From<StatusError> for PollFailure {
    fn from(err: StatusError) -> Self {
        if err.is_unauthorized() {
            PollFailure::Unauthorized
        } else {
            PollFailure::Network(err.to_string())
        }
    }
}
