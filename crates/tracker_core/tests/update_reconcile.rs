use std::collections::BTreeMap;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tracker_core::{
    derive, update, Effect, Msg, Phase, SearchPlan, Seq, TaskId, TaskState, TaskStatus,
    TrackerState,
};

fn started() -> TrackerState {
    let (state, _) = update(
        TrackerState::default(),
        Msg::SessionStarted {
            now: Duration::ZERO,
        },
    );
    state
}

fn add(state: TrackerState, id: &str) -> TrackerState {
    update(state, Msg::AddTask(TaskId::from(id))).0
}

fn searching(index: u32, total: u32) -> TaskStatus {
    TaskStatus {
        phase: Phase::Searching {
            current_label: Some("rust developer".into()),
        },
        plan: Some(SearchPlan::new(total, index, Vec::new())),
        ..TaskStatus::default()
    }
}

fn deliver(
    state: TrackerState,
    seq: Seq,
    batch: Vec<(&str, TaskStatus)>,
) -> (TrackerState, Vec<Effect>) {
    let batch = batch
        .into_iter()
        .map(|(id, status)| (TaskId::from(id), status))
        .collect::<BTreeMap<_, _>>();
    update(
        state,
        Msg::StatusesFetched {
            seq,
            result: Ok(batch),
        },
    )
}

/// Ticks the status cadence once and feeds `status` back as the response for `id`.
fn poll_once(
    state: TrackerState,
    now: &mut Duration,
    id: &str,
    status: TaskStatus,
) -> (TrackerState, Vec<Effect>) {
    let (state, effects) = update(state, Msg::Tick { now: *now });
    *now += Duration::from_millis(1500);
    let seq = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::FetchStatus { seq, .. } | Effect::FetchStatuses { seq, .. } => Some(*seq),
            _ => None,
        })
        .expect("status request effect");
    deliver(state, seq, vec![(id, status)])
}

fn terminal_notices(effects: &[Effect]) -> Vec<(TaskId, TaskState)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::NotifyTerminal { task_id, state } => Some((task_id.clone(), *state)),
            _ => None,
        })
        .collect()
}

#[test]
fn task_seven_progresses_to_done_and_notifies_once() {
    let mut now = Duration::ZERO;
    let mut state = add(started(), "7");
    let id = TaskId::from(7u64);

    let snapshots = vec![
        TaskStatus::with_state(TaskState::Pending),
        TaskStatus::with_state(TaskState::Generating),
        searching(2, 5),
        searching(5, 5),
        TaskStatus {
            plan: Some(SearchPlan::new(5, 5, Vec::new())),
            ..TaskStatus::with_state(TaskState::Done)
        },
    ];

    let mut percents = Vec::new();
    let mut notices = Vec::new();
    for snapshot in snapshots {
        let (next, effects) = poll_once(state, &mut now, "7", snapshot);
        percents.push(derive(next.status(&id).expect("stored")).percent);
        notices.push(terminal_notices(&effects));
        state = next;
    }

    assert_eq!(percents, vec![0, 0, 40, 100, 100]);
    assert_eq!(
        notices,
        vec![
            vec![],
            vec![],
            vec![],
            vec![],
            vec![(id.clone(), TaskState::Done)]
        ]
    );

    // The terminal snapshot keeps arriving; the notification does not repeat.
    let (state, effects) = poll_once(state, &mut now, "7", TaskStatus::with_state(TaskState::Done));
    assert!(terminal_notices(&effects).is_empty());
    assert_eq!(state.notified_state(&id), Some(TaskState::Done));
}

#[test]
fn partial_batch_does_not_drop_other_tasks() {
    let state = add(add(started(), "1"), "2");
    let (state, _) = deliver(
        state,
        1,
        vec![
            ("1", TaskStatus::with_state(TaskState::Searching)),
            ("2", TaskStatus::with_state(TaskState::Generating)),
        ],
    );
    let (state, _) = deliver(state, 2, vec![("1", TaskStatus::with_state(TaskState::Analyzing))]);

    let statuses = state.statuses();
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[&TaskId::from("1")].state(), TaskState::Analyzing);
    assert_eq!(statuses[&TaskId::from("2")].state(), TaskState::Generating);
}

#[test]
fn older_response_never_overwrites_newer_one() {
    let state = add(started(), "1");
    let (state, _) = deliver(state, 4, vec![("1", TaskStatus::with_state(TaskState::Analyzing))]);
    let (state, effects) = deliver(state, 3, vec![("1", searching(1, 5))]);

    assert!(effects.is_empty());
    assert_eq!(
        state.status(&TaskId::from("1")).map(TaskStatus::state),
        Some(TaskState::Analyzing)
    );
}

#[test]
fn terminal_state_is_not_regressed_by_late_snapshot() {
    let state = add(started(), "3");
    let (state, effects) = deliver(
        state,
        1,
        vec![("3", TaskStatus::with_state(TaskState::Stopped))],
    );
    assert_eq!(
        terminal_notices(&effects),
        vec![(TaskId::from("3"), TaskState::Stopped)]
    );

    let (state, effects) = deliver(state, 2, vec![("3", searching(3, 5))]);
    assert!(effects.is_empty());
    assert_eq!(
        state.status(&TaskId::from("3")).map(TaskStatus::state),
        Some(TaskState::Stopped)
    );

    let (state, effects) = deliver(state, 3, vec![("3", TaskStatus::with_state(TaskState::Error))]);
    assert!(effects.is_empty());
    assert_eq!(state.notified_state(&TaskId::from("3")), Some(TaskState::Stopped));
}

#[test]
fn re_adding_a_task_resets_terminal_eligibility() {
    let mut now = Duration::ZERO;
    let state = add(started(), "8");
    let (state, effects) = poll_once(
        state,
        &mut now,
        "8",
        TaskStatus::with_state(TaskState::Error),
    );
    assert_eq!(terminal_notices(&effects).len(), 1);

    let (state, _) = update(state, Msg::RemoveTask(TaskId::from("8")));
    assert_eq!(state.notified_state(&TaskId::from("8")), None);
    let state = add(state, "8");

    // A new run of the same task starts from scratch instead of being held at `error`.
    let (state, effects) = poll_once(
        state,
        &mut now,
        "8",
        TaskStatus::with_state(TaskState::Pending),
    );
    assert!(terminal_notices(&effects).is_empty());
    assert_eq!(
        state.status(&TaskId::from("8")).map(TaskStatus::state),
        Some(TaskState::Pending)
    );

    let (_, effects) = poll_once(state, &mut now, "8", TaskStatus::with_state(TaskState::Done));
    assert_eq!(
        terminal_notices(&effects),
        vec![(TaskId::from("8"), TaskState::Done)]
    );
}

#[test]
fn response_issued_before_re_add_is_stale() {
    let state = add(started(), "4");
    let (state, effects) = update(state, Msg::Tick { now: Duration::ZERO });
    assert!(matches!(effects.as_slice(), [Effect::FetchStatus { seq: 1, .. }, ..]));

    let (state, _) = update(state, Msg::RemoveTask(TaskId::from("4")));
    let state = add(state, "4");

    let (state, effects) = deliver(state, 1, vec![("4", TaskStatus::with_state(TaskState::Done))]);
    assert!(effects.is_empty());
    assert!(state.status(&TaskId::from("4")).is_none());
}

#[test]
fn removed_task_is_collected_on_next_successful_poll() {
    let state = add(add(started(), "1"), "2");
    let (state, _) = deliver(
        state,
        1,
        vec![
            ("1", TaskStatus::with_state(TaskState::Searching)),
            ("2", TaskStatus::with_state(TaskState::Searching)),
        ],
    );

    let (state, _) = update(state, Msg::RemoveTask(TaskId::from("2")));
    // Lingers until the next cycle.
    assert_eq!(state.statuses().len(), 2);
    assert_eq!(state.tasks(), &[TaskId::from("1")]);

    let (state, _) = deliver(
        state,
        2,
        vec![
            ("1", TaskStatus::with_state(TaskState::Searching)),
            ("2", TaskStatus::with_state(TaskState::Done)),
        ],
    );
    assert_eq!(state.statuses().len(), 1);
    assert!(state.status(&TaskId::from("2")).is_none());
}

#[test]
fn backward_move_is_applied_and_reported() {
    let state = add(started(), "6");
    let (state, effects) = deliver(
        state,
        1,
        vec![("6", TaskStatus::with_state(TaskState::Analyzing))],
    );
    assert!(effects.is_empty());

    let (state, effects) = deliver(
        state,
        2,
        vec![("6", TaskStatus::with_state(TaskState::Generating))],
    );
    assert_eq!(
        effects,
        vec![Effect::UnexpectedTransition {
            task_id: TaskId::from("6"),
            from: TaskState::Analyzing,
            to: TaskState::Generating,
        }]
    );
    assert_eq!(
        state.status(&TaskId::from("6")).map(TaskStatus::state),
        Some(TaskState::Generating)
    );

    // Repeating the same state is ordinary progress.
    let (_, effects) = deliver(
        state,
        3,
        vec![("6", TaskStatus::with_state(TaskState::Generating))],
    );
    assert!(effects.is_empty());
}
