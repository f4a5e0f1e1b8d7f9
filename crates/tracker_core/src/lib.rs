//! Tracker core: pure task-status state machine and view-model helpers.
mod cadence;
mod effect;
mod msg;
mod reconcile;
mod registry;
mod settings;
mod state;
mod status;
mod task_id;
mod update;
mod view_model;

pub use cadence::{Cadence, TickDecision};
pub use effect::Effect;
pub use msg::{Msg, PollFailure, StatusBatch};
pub use reconcile::{Applied, Reconciled, Seq, StateReconciler};
pub use registry::TaskRegistry;
pub use settings::PollSettings;
pub use state::{Generation, SessionState, TrackerState};
pub use status::{Counters, LogEntry, Phase, PlannedUnit, SearchPlan, TaskState, TaskStatus};
pub use task_id::TaskId;
pub use update::update;
pub use view_model::{
    badge_tone, default_task_name, derive, percent, tab_label, AppViewModel, BadgeTone, PlanRow,
    ProgressView, TaskTab, TaskView, UnitMark,
};
