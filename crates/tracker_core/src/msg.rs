use std::collections::BTreeMap;
use std::time::Duration;

use crate::{Generation, Seq, TaskId, TaskStatus};

/// Snapshots returned by one status request, keyed by task id.
pub type StatusBatch = BTreeMap<TaskId, TaskStatus>;

/// Why a backend request failed, as far as the tracker cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    /// Transport error, timeout, non-2xx other than 401, or an undecodable body.
    Network(String),
    /// The backend rejected the session (HTTP 401).
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A session became available (startup with credentials, or a new login).
    SessionStarted { now: Duration },
    /// User logged out.
    Logout,
    /// The session layer learned the session is no longer valid.
    SessionExpired,
    /// User started a task or opened a progress view for one.
    AddTask(TaskId),
    /// User dismissed a task's progress view.
    RemoveTask(TaskId),
    /// User asked the backend to abort a running task.
    StopClicked(TaskId),
    /// Timer tick; `now` is the coordinator's clock reading.
    Tick { now: Duration },
    /// Result of a status request issued by `Effect::FetchStatuses`/`FetchStatus`.
    StatusesFetched {
        seq: Seq,
        result: Result<StatusBatch, PollFailure>,
    },
    /// Result of a label refresh issued by `Effect::FetchLabels`.
    LabelsFetched {
        seq: Seq,
        result: Result<BTreeMap<TaskId, String>, PollFailure>,
    },
    /// Result of a stop request issued by `Effect::SendStop`.
    StopAcknowledged {
        task_id: TaskId,
        generation: Generation,
        result: Result<(), PollFailure>,
    },
    /// Carries nothing. Lets a platform layer wake the loop without changing state.
    NoOp,
}
