use crate::{Counters, LogEntry, SessionState, TaskId, TaskState, TaskStatus};

/// Severity tone of the state badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Neutral,
    Info,
    Warning,
    Success,
    Danger,
}

/// Where a planned unit stands relative to the unit in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitMark {
    Done,
    Current,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRow {
    pub kind: String,
    pub value: String,
    pub mark: UnitMark,
}

/// Display fields for one task's progress view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub state: TaskState,
    pub percent: u8,
    pub headline: &'static str,
    pub phase_caption: String,
    pub badge: BadgeTone,
    pub can_stop: bool,
    pub can_dismiss: bool,
    pub counters: Counters,
    pub total_units: u32,
    pub plan_rows: Vec<PlanRow>,
    /// The full log, oldest first. No cap is applied here.
    pub log_tail: Vec<LogEntry>,
}

/// One entry of the multiplexed task tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTab {
    pub task_id: TaskId,
    pub label: String,
    pub state: Option<TaskState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub task_id: TaskId,
    pub progress: ProgressView,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub tabs: Vec<TaskTab>,
    pub tasks: Vec<TaskView>,
    pub last_poll_error: Option<String>,
    pub notice: Option<String>,
    pub dirty: bool,
}

/// Derives the display fields of one snapshot. Total over any snapshot.
pub fn derive(status: &TaskStatus) -> ProgressView {
    let state = status.state();
    let (index, total) = status.progress();

    ProgressView {
        state,
        percent: percent(state, index, total),
        headline: headline(state),
        phase_caption: phase_caption(status),
        badge: badge_tone(state),
        can_stop: state.is_running(),
        can_dismiss: state.is_terminal(),
        counters: status.counters,
        total_units: total,
        plan_rows: plan_rows(status, index),
        log_tail: status.log.clone(),
    }
}

/// Percentage complete, always within `0..=100`.
pub fn percent(state: TaskState, current_unit_index: u32, total_units: u32) -> u8 {
    if state.is_terminal() {
        return 100;
    }
    if total_units == 0 {
        return 0;
    }
    let ratio = f64::from(current_unit_index) / f64::from(total_units) * 100.0;
    ratio.round().clamp(0.0, 100.0) as u8
}

pub fn badge_tone(state: TaskState) -> BadgeTone {
    match state {
        TaskState::Unknown | TaskState::Pending => BadgeTone::Neutral,
        TaskState::Generating | TaskState::Analyzing => BadgeTone::Info,
        TaskState::Searching => BadgeTone::Warning,
        TaskState::Done => BadgeTone::Success,
        TaskState::Error | TaskState::Stopped => BadgeTone::Danger,
    }
}

fn headline(state: TaskState) -> &'static str {
    match state {
        TaskState::Unknown => "Connecting",
        TaskState::Pending => "Queued",
        TaskState::Generating | TaskState::Searching | TaskState::Analyzing => "Agent Active",
        TaskState::Done => "Mission Complete",
        TaskState::Error => "Mission Failed",
        TaskState::Stopped => "Mission Aborted",
    }
}

fn phase_caption(status: &TaskStatus) -> String {
    match status.state() {
        TaskState::Unknown => "Connecting to search agent...".to_string(),
        TaskState::Pending => "Waiting for the search agent...".to_string(),
        TaskState::Generating => "Generating search queries...".to_string(),
        TaskState::Searching => {
            let (index, total) = status.progress();
            match status.phase.current_label() {
                Some(label) => format!("Searching {index}/{total}: {label}"),
                None => format!("Searching {index}/{total}"),
            }
        }
        TaskState::Analyzing => "Analyzing jobs...".to_string(),
        TaskState::Done => "All searches complete.".to_string(),
        TaskState::Error => "Search failed.".to_string(),
        TaskState::Stopped => "Search aborted.".to_string(),
    }
}

fn plan_rows(status: &TaskStatus, current_unit_index: u32) -> Vec<PlanRow> {
    let finished = status.state() == TaskState::Done || status.state() == TaskState::Analyzing;
    status
        .planned_units()
        .iter()
        .enumerate()
        .map(|(i, unit)| {
            // `current_unit_index` is 1-based: the unit at position index-1 is in progress.
            let position = u32::try_from(i + 1).unwrap_or(u32::MAX);
            let mark = if finished || position < current_unit_index {
                UnitMark::Done
            } else if position == current_unit_index {
                UnitMark::Current
            } else {
                UnitMark::Pending
            };
            PlanRow {
                kind: unit.kind.clone(),
                value: unit.value.clone(),
                mark,
            }
        })
        .collect()
}

/// Tab label: the task name, tagged with `(Active)` while running or the state otherwise.
pub fn tab_label(name: &str, state: Option<TaskState>) -> String {
    match state {
        None | Some(TaskState::Unknown) => name.to_string(),
        Some(state) if state.is_running() => format!("{name} (Active)"),
        Some(state) => format!("{name} ({})", state.as_str()),
    }
}

/// Fallback name for a task whose label has not been fetched.
pub fn default_task_name(id: &TaskId) -> String {
    format!("Search #{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Phase, PlannedUnit, SearchPlan};

    #[test]
    fn percent_is_forced_for_terminal_states() {
        assert_eq!(percent(TaskState::Error, 1, 10), 100);
        assert_eq!(percent(TaskState::Stopped, 0, 0), 100);
    }

    #[test]
    fn percent_stays_in_range() {
        for total in 0..12u32 {
            for index in 0..30u32 {
                let value = percent(TaskState::Searching, index, total);
                assert!(value <= 100, "index {index} total {total} gave {value}");
            }
        }
        assert_eq!(percent(TaskState::Searching, u32::MAX, 1), 100);
        assert_eq!(percent(TaskState::Searching, 1, 3), 33);
        assert_eq!(percent(TaskState::Searching, 2, 3), 67);
    }

    #[test]
    fn searching_caption_interpolates_progress_and_label() {
        let status = TaskStatus {
            phase: Phase::Searching {
                current_label: Some("rust developer".into()),
            },
            plan: Some(SearchPlan::new(5, 2, Vec::new())),
            ..TaskStatus::default()
        };
        let view = derive(&status);
        assert_eq!(view.phase_caption, "Searching 2/5: rust developer");
        assert_eq!(view.badge, BadgeTone::Warning);
        assert!(view.can_stop);
        assert!(!view.can_dismiss);
    }

    #[test]
    fn plan_rows_mark_current_unit() {
        let units = (1..=3)
            .map(|n| PlannedUnit {
                kind: "keyword".into(),
                value: format!("q{n}"),
            })
            .collect();
        let status = TaskStatus {
            phase: Phase::Searching {
                current_label: None,
            },
            plan: Some(SearchPlan::new(3, 2, units)),
            ..TaskStatus::default()
        };
        let marks: Vec<UnitMark> = derive(&status).plan_rows.iter().map(|r| r.mark).collect();
        assert_eq!(marks, vec![UnitMark::Done, UnitMark::Current, UnitMark::Pending]);
    }

    #[test]
    fn tab_labels_follow_state() {
        assert_eq!(tab_label("Rust jobs", None), "Rust jobs");
        assert_eq!(
            tab_label("Rust jobs", Some(TaskState::Searching)),
            "Rust jobs (Active)"
        );
        assert_eq!(
            tab_label("Rust jobs", Some(TaskState::Done)),
            "Rust jobs (done)"
        );
    }

    #[test]
    fn unknown_snapshot_derives_defaults() {
        let view = derive(&TaskStatus::default());
        assert_eq!(view.percent, 0);
        assert_eq!(view.badge, BadgeTone::Neutral);
        assert_eq!(view.phase_caption, "Connecting to search agent...");
        assert!(view.log_tail.is_empty());
    }
}
