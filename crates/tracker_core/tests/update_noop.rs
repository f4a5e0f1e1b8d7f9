use tracker_core::{update, Msg, TrackerState};

#[test]
fn update_is_noop() {
    let state = TrackerState::default();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn messages_without_session_are_ignored() {
    let state = TrackerState::default();
    let (next, effects) = update(state.clone(), Msg::AddTask("7".into()));
    assert_eq!(state, next);
    assert!(effects.is_empty());

    let (next, effects) = update(
        next,
        Msg::Tick {
            now: std::time::Duration::from_secs(3),
        },
    );
    assert_eq!(state, next);
    assert!(effects.is_empty());
}
