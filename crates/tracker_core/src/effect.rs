use crate::{Generation, Seq, TaskId, TaskState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Aggregate status request for every registered id.
    FetchStatuses { seq: Seq, task_ids: Vec<TaskId> },
    /// Single-task status request, used when exactly one id is registered.
    FetchStatus { seq: Seq, task_id: TaskId },
    /// Slow-cadence refresh of task display names.
    FetchLabels { seq: Seq },
    /// Abort request, tagged with the session it was sent in.
    SendStop {
        task_id: TaskId,
        generation: Generation,
    },
    /// A task reached a terminal state for the first time in its lifetime.
    NotifyTerminal { task_id: TaskId, state: TaskState },
    /// The backend moved a task outside the expected state machine. Applied anyway.
    UnexpectedTransition {
        task_id: TaskId,
        from: TaskState,
        to: TaskState,
    },
    /// Registry membership changed and should be persisted.
    PersistTasks { task_ids: Vec<TaskId> },
    /// The backend rejected the session; the tracker has already torn down.
    SessionExpired,
}
