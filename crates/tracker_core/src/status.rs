use chrono::{DateTime, Utc};

/// Lifecycle state of a search task as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TaskState {
    #[default]
    Unknown,
    Pending,
    Generating,
    Searching,
    Analyzing,
    Done,
    Error,
    Stopped,
}

impl TaskState {
    pub const TERMINAL: [TaskState; 3] = [TaskState::Done, TaskState::Error, TaskState::Stopped];

    /// Maps a wire value to a state. Anything unrecognized is `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => TaskState::Pending,
            "generating" => TaskState::Generating,
            "searching" => TaskState::Searching,
            "analyzing" => TaskState::Analyzing,
            "done" => TaskState::Done,
            "error" => TaskState::Error,
            "stopped" => TaskState::Stopped,
            _ => TaskState::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Unknown => "unknown",
            TaskState::Pending => "pending",
            TaskState::Generating => "generating",
            TaskState::Searching => "searching",
            TaskState::Analyzing => "analyzing",
            TaskState::Done => "done",
            TaskState::Error => "error",
            TaskState::Stopped => "stopped",
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// States in which the backend is actively working and accepts a stop request.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            TaskState::Generating | TaskState::Searching | TaskState::Analyzing
        )
    }

    /// Position on the happy path `pending → generating → searching → analyzing → done`.
    fn happy_path_rank(self) -> Option<u8> {
        match self {
            TaskState::Pending => Some(1),
            TaskState::Generating => Some(2),
            TaskState::Searching => Some(3),
            TaskState::Analyzing => Some(4),
            TaskState::Done => Some(5),
            TaskState::Unknown | TaskState::Error | TaskState::Stopped => None,
        }
    }

    /// Whether `self → next` is a transition the state machine expects.
    ///
    /// Staying in the same state is always allowed (progress updates). Intermediate
    /// happy-path states may be skipped.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (TaskState::Unknown, _) => true,
            (_, TaskState::Unknown) => false,
            (_, TaskState::Error) => true,
            (from, TaskState::Stopped) => from.is_running(),
            (from, to) => match (from.happy_path_rank(), to.happy_path_rank()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }
}

/// Phase-specific view of a status snapshot, keyed by state.
///
/// Only `Searching` carries data of its own: the label of the unit in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Unknown,
    Pending,
    Generating,
    Searching {
        current_label: Option<String>,
    },
    Analyzing,
    Done,
    Error,
    Stopped,
}

impl Phase {
    /// Builds the phase for `state`, keeping `label` only where it is meaningful.
    pub fn from_state(state: TaskState, label: Option<String>) -> Self {
        match state {
            TaskState::Unknown => Phase::Unknown,
            TaskState::Pending => Phase::Pending,
            TaskState::Generating => Phase::Generating,
            TaskState::Searching => Phase::Searching {
                current_label: label.filter(|l| !l.trim().is_empty()),
            },
            TaskState::Analyzing => Phase::Analyzing,
            TaskState::Done => Phase::Done,
            TaskState::Error => Phase::Error,
            TaskState::Stopped => Phase::Stopped,
        }
    }

    pub fn state(&self) -> TaskState {
        match self {
            Phase::Unknown => TaskState::Unknown,
            Phase::Pending => TaskState::Pending,
            Phase::Generating => TaskState::Generating,
            Phase::Searching { .. } => TaskState::Searching,
            Phase::Analyzing => TaskState::Analyzing,
            Phase::Done => TaskState::Done,
            Phase::Error => TaskState::Error,
            Phase::Stopped => TaskState::Stopped,
        }
    }

    pub fn current_label(&self) -> Option<&str> {
        match self {
            Phase::Searching { current_label } => current_label.as_deref(),
            _ => None,
        }
    }
}

/// One generated sub-task (a search query) of a task's plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUnit {
    pub kind: String,
    pub value: String,
}

/// Unit progress, present once the backend has computed a plan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPlan {
    total_units: u32,
    current_unit_index: u32,
    planned_units: Vec<PlannedUnit>,
}

impl SearchPlan {
    /// `current_unit_index` is clamped to `total_units`.
    pub fn new(total_units: u32, current_unit_index: u32, planned_units: Vec<PlannedUnit>) -> Self {
        Self {
            total_units,
            current_unit_index: current_unit_index.min(total_units),
            planned_units,
        }
    }

    pub fn total_units(&self) -> u32 {
        self.total_units
    }

    pub fn current_unit_index(&self) -> u32 {
        self.current_unit_index
    }

    pub fn planned_units(&self) -> &[PlannedUnit] {
        &self.planned_units
    }

    pub(crate) fn keep_planned_units_from(&mut self, previous: &SearchPlan) {
        if !previous.planned_units.is_empty() {
            self.planned_units = previous.planned_units.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub new_count: u32,
    pub duplicate_count: u32,
    pub skipped_count: u32,
    pub error_count: u32,
}

impl Counters {
    /// Field-wise maximum, so counters never move backwards within a lifetime.
    pub fn max_with(self, other: Counters) -> Counters {
        Counters {
            new_count: self.new_count.max(other.new_count),
            duplicate_count: self.duplicate_count.max(other.duplicate_count),
            skipped_count: self.skipped_count.max(other.skipped_count),
            error_count: self.error_count.max(other.error_count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub message: String,
}

/// One status snapshot for a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskStatus {
    pub phase: Phase,
    pub plan: Option<SearchPlan>,
    pub counters: Counters,
    pub log: Vec<LogEntry>,
}

impl TaskStatus {
    pub fn with_state(state: TaskState) -> Self {
        Self {
            phase: Phase::from_state(state, None),
            ..Self::default()
        }
    }

    pub fn state(&self) -> TaskState {
        self.phase.state()
    }

    /// `(current_unit_index, total_units)`, zero when no plan is known.
    pub fn progress(&self) -> (u32, u32) {
        self.plan
            .as_ref()
            .map(|plan| (plan.current_unit_index(), plan.total_units()))
            .unwrap_or((0, 0))
    }

    pub fn planned_units(&self) -> &[PlannedUnit] {
        self.plan
            .as_ref()
            .map(SearchPlan::planned_units)
            .unwrap_or(&[])
    }
}
