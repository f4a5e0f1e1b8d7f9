use std::collections::BTreeMap;
use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tracker_core::{
    update, Effect, Msg, PollFailure, PollSettings, TaskId, TaskState, TaskStatus, TrackerState,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(tracker_logging::initialize_for_tests);
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn started() -> TrackerState {
    let (state, _) = update(TrackerState::default(), Msg::SessionStarted { now: ms(0) });
    state
}

fn with_tasks(ids: &[&str]) -> TrackerState {
    ids.iter().fold(started(), |state, id| {
        update(state, Msg::AddTask(TaskId::from(*id))).0
    })
}

fn tick(state: TrackerState, now: u64) -> (TrackerState, Vec<Effect>) {
    update(state, Msg::Tick { now: ms(now) })
}

fn status_requests(effects: &[Effect]) -> Vec<Effect> {
    effects
        .iter()
        .filter(|effect| {
            matches!(
                effect,
                Effect::FetchStatus { .. } | Effect::FetchStatuses { .. }
            )
        })
        .cloned()
        .collect()
}

#[test]
fn empty_registry_skips_network_but_keeps_cadence() {
    init_logging();
    let (state, effects) = tick(started(), 0);
    assert!(effects.is_empty());
    assert_eq!(state.polls_fired(), 0);
    assert!(state.is_polling());

    let (state, _) = update(state, Msg::AddTask("4".into()));
    let (state, effects) = tick(state, 1500);
    assert_eq!(
        status_requests(&effects),
        vec![Effect::FetchStatus {
            seq: 1,
            task_id: TaskId::from("4"),
        }]
    );
    assert_eq!(state.polls_fired(), 1);
}

#[test]
fn single_task_uses_single_endpoint_and_many_use_aggregate() {
    init_logging();
    let (_, effects) = tick(with_tasks(&["9"]), 0);
    assert!(matches!(
        status_requests(&effects).as_slice(),
        [Effect::FetchStatus { .. }]
    ));

    let (_, effects) = tick(with_tasks(&["2", "1"]), 0);
    assert_eq!(
        status_requests(&effects),
        vec![Effect::FetchStatuses {
            seq: 1,
            task_ids: vec![TaskId::from("2"), TaskId::from("1")],
        }]
    );
}

#[test]
fn outstanding_request_skips_ticks_until_settled() {
    init_logging();
    let (state, effects) = tick(with_tasks(&["1", "2"]), 0);
    assert_eq!(status_requests(&effects).len(), 1);
    assert!(state.status_request_outstanding());

    let (state, effects) = tick(state, 1500);
    assert!(status_requests(&effects).is_empty());
    let (state, effects) = tick(state, 3000);
    assert!(status_requests(&effects).is_empty());

    let (state, _) = update(
        state,
        Msg::StatusesFetched {
            seq: 1,
            result: Ok(BTreeMap::new()),
        },
    );
    assert!(!state.status_request_outstanding());

    let (state, effects) = tick(state, 4500);
    assert_eq!(
        status_requests(&effects),
        vec![Effect::FetchStatuses {
            seq: 2,
            task_ids: vec![TaskId::from("1"), TaskId::from("2")],
        }]
    );
    assert_eq!(state.polls_fired(), 2);
}

#[test]
fn network_failure_keeps_last_known_snapshots() {
    init_logging();
    let (state, _) = tick(with_tasks(&["1"]), 0);
    let (state, _) = update(
        state,
        Msg::StatusesFetched {
            seq: 1,
            result: Ok(BTreeMap::from([(
                TaskId::from("1"),
                TaskStatus::with_state(TaskState::Searching),
            )])),
        },
    );

    let (state, _) = tick(state, 1500);
    let (mut state, effects) = update(
        state,
        Msg::StatusesFetched {
            seq: 2,
            result: Err(PollFailure::Network("connection reset".into())),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(
        state.status(&TaskId::from("1")).map(TaskStatus::state),
        Some(TaskState::Searching)
    );
    let view = state.view();
    assert_eq!(view.last_poll_error.as_deref(), Some("connection reset"));
    assert!(state.consume_dirty());

    // The next tick retries on the normal cadence.
    let (_, effects) = tick(state, 3000);
    assert_eq!(status_requests(&effects).len(), 1);
}

#[test]
fn label_refresh_runs_on_its_own_slower_cadence() {
    init_logging();
    let settings = PollSettings {
        status_interval: ms(1000),
        label_interval: ms(10_000),
    };
    let (state, _) = update(TrackerState::new(settings), Msg::SessionStarted { now: ms(0) });
    let (state, _) = update(state, Msg::AddTask("3".into()));

    let (state, effects) = tick(state, 0);
    assert!(effects.contains(&Effect::FetchLabels { seq: 1 }));

    let (state, _) = update(
        state,
        Msg::LabelsFetched {
            seq: 1,
            result: Ok(BTreeMap::from([(TaskId::from("3"), "Rust in Zurich".to_string())])),
        },
    );
    assert_eq!(state.view().tabs[0].label, "Rust in Zurich");

    let (state, effects) = tick(state, 1000);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::FetchLabels { .. })));
    assert!(state.is_refreshing_labels());

    let (_, effects) = tick(state, 10_000);
    assert!(effects.contains(&Effect::FetchLabels { seq: 2 }));
}

#[test]
fn stop_is_only_sent_for_running_tasks() {
    init_logging();
    let (state, effects) = update(with_tasks(&["5"]), Msg::StopClicked("5".into()));
    assert!(effects.is_empty());

    let (state, _) = tick(state, 0);
    let (state, _) = update(
        state,
        Msg::StatusesFetched {
            seq: 1,
            result: Ok(BTreeMap::from([(
                TaskId::from("5"),
                TaskStatus::with_state(TaskState::Generating),
            )])),
        },
    );
    let (state, effects) = update(state, Msg::StopClicked("5".into()));
    assert_eq!(
        effects,
        vec![Effect::SendStop {
            task_id: TaskId::from("5"),
            generation: state.generation(),
        }]
    );

    let (state, _) = update(
        state,
        Msg::StopAcknowledged {
            task_id: TaskId::from("5"),
            generation: 1,
            result: Ok(()),
        },
    );
    // Stopping does not change local state; the backend reports `stopped` later.
    assert_eq!(
        state.status(&TaskId::from("5")).map(TaskStatus::state),
        Some(TaskState::Generating)
    );
    assert!(state.view().notice.is_some());
}
