use std::collections::BTreeMap;
use std::time::Duration;

use crate::{
    Effect, Msg, PollFailure, Reconciled, Seq, SessionState, StatusBatch, TaskId, TickDecision,
    TrackerState,
};

const LOGGED_OUT_NOTICE: &str = "Logged out.";
const EXPIRED_NOTICE: &str = "Session expired. Log in again to resume tracking.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: TrackerState, msg: Msg) -> (TrackerState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionStarted { now } => {
            state.start_session(now);
            Vec::new()
        }
        Msg::Logout => teardown(&mut state, LOGGED_OUT_NOTICE),
        Msg::SessionExpired => teardown(&mut state, EXPIRED_NOTICE),
        Msg::AddTask(task_id) => add_task(&mut state, task_id),
        Msg::RemoveTask(task_id) => remove_task(&mut state, &task_id),
        Msg::StopClicked(task_id) => {
            let running = state
                .status(&task_id)
                .is_some_and(|status| status.state().is_running());
            if running {
                vec![Effect::SendStop {
                    task_id,
                    generation: state.generation(),
                }]
            } else {
                Vec::new()
            }
        }
        Msg::Tick { now } => on_tick(&mut state, now),
        Msg::StatusesFetched { seq, result } => apply_statuses(&mut state, seq, result),
        Msg::LabelsFetched { seq, result } => apply_labels(&mut state, seq, result),
        Msg::StopAcknowledged {
            task_id,
            generation,
            result,
        } => {
            // Sent under an older token; says nothing about this session.
            if !state.is_current(generation) {
                return (state, Vec::new());
            }
            match result {
                Ok(()) => {
                    state.set_notice(format!(
                        "Stop requested for task {task_id}; waiting for the agent to confirm."
                    ));
                    Vec::new()
                }
                Err(PollFailure::Network(message)) => {
                    state.set_notice(format!("Stop request for task {task_id} failed: {message}"));
                    Vec::new()
                }
                Err(PollFailure::Unauthorized) => expire(&mut state),
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn teardown(state: &mut TrackerState, notice: &str) -> Vec<Effect> {
    if state.teardown(notice) {
        vec![Effect::PersistTasks {
            task_ids: Vec::new(),
        }]
    } else {
        Vec::new()
    }
}

fn expire(state: &mut TrackerState) -> Vec<Effect> {
    if state.teardown(EXPIRED_NOTICE) {
        vec![
            Effect::SessionExpired,
            Effect::PersistTasks {
                task_ids: Vec::new(),
            },
        ]
    } else {
        Vec::new()
    }
}

fn add_task(state: &mut TrackerState, task_id: TaskId) -> Vec<Effect> {
    // Only responses to requests issued after this point belong to the new lifetime.
    let floor = state.last_status_seq();
    let Some(session) = state.session_mut() else {
        return Vec::new();
    };
    if !session.registry.add(task_id.clone()) {
        return Vec::new();
    }
    session.reconciler.admit(&task_id, floor);
    let task_ids = session.registry.list().to_vec();
    state.mark_dirty();
    vec![Effect::PersistTasks { task_ids }]
}

fn remove_task(state: &mut TrackerState, task_id: &TaskId) -> Vec<Effect> {
    let Some(session) = state.session_mut() else {
        return Vec::new();
    };
    if !session.registry.remove(task_id) {
        return Vec::new();
    }
    session.reconciler.forget(task_id);
    let task_ids = session.registry.list().to_vec();
    state.mark_dirty();
    vec![Effect::PersistTasks { task_ids }]
}

fn on_tick(state: &mut TrackerState, now: Duration) -> Vec<Effect> {
    if state.session() == SessionState::LoggedOut {
        return Vec::new();
    }

    let mut effects = Vec::new();
    if state.status_cadence_mut().poll(now) == TickDecision::Fire {
        // An empty registry idles the tick; the cadence keeps running.
        let task_ids = state.tasks().to_vec();
        match task_ids.as_slice() {
            [] => {}
            [task_id] => {
                let seq = state.issue_status_seq();
                effects.push(Effect::FetchStatus {
                    seq,
                    task_id: task_id.clone(),
                });
            }
            _ => {
                let seq = state.issue_status_seq();
                effects.push(Effect::FetchStatuses { seq, task_ids });
            }
        }
    }

    if state.label_cadence_mut().poll(now) == TickDecision::Fire && !state.tasks().is_empty() {
        let seq = state.issue_label_seq();
        effects.push(Effect::FetchLabels { seq });
    }

    effects
}

fn apply_statuses(
    state: &mut TrackerState,
    seq: Seq,
    result: Result<StatusBatch, PollFailure>,
) -> Vec<Effect> {
    if state.session() == SessionState::LoggedOut {
        return Vec::new();
    }
    let awaited = state.settle_status(seq);

    let batch = match result {
        Ok(batch) => batch,
        Err(PollFailure::Network(message)) => {
            // Stale-but-available: the store keeps the last good snapshots.
            if awaited {
                state.set_poll_error(Some(message));
            }
            return Vec::new();
        }
        // A 401 for a request this session no longer waits on was answered
        // under an older token.
        Err(PollFailure::Unauthorized) if awaited => return expire(state),
        Err(PollFailure::Unauthorized) => return Vec::new(),
    };

    if awaited {
        state.set_poll_error(None);
    }
    let Some(session) = state.session_mut() else {
        return Vec::new();
    };

    let mut effects = Vec::new();
    let mut changed = false;
    for (task_id, status) in batch {
        if !session.registry.contains(&task_id) {
            continue;
        }
        match session.reconciler.reconcile(&task_id, seq, status) {
            Reconciled::Applied(applied) => {
                changed = true;
                if !applied.expected {
                    effects.push(Effect::UnexpectedTransition {
                        task_id: task_id.clone(),
                        from: applied.from,
                        to: applied.to,
                    });
                }
                if let Some(terminal) = applied.terminal_notice {
                    effects.push(Effect::NotifyTerminal {
                        task_id,
                        state: terminal,
                    });
                }
            }
            Reconciled::Stale { .. } | Reconciled::RegressionIgnored { .. } => {}
        }
    }
    let collected = session.reconciler.collect_garbage(&session.registry);

    if changed || collected > 0 {
        state.mark_dirty();
    }
    effects
}

fn apply_labels(
    state: &mut TrackerState,
    seq: Seq,
    result: Result<BTreeMap<TaskId, String>, PollFailure>,
) -> Vec<Effect> {
    if state.session() == SessionState::LoggedOut {
        return Vec::new();
    }
    let awaited = state.settle_labels(seq);

    match result {
        Ok(labels) => {
            let Some(session) = state.session_mut() else {
                return Vec::new();
            };
            if session.labels != labels {
                session.labels = labels;
                state.mark_dirty();
            }
            Vec::new()
        }
        // Labels are cosmetic; keep the previous ones.
        Err(PollFailure::Network(_)) => Vec::new(),
        Err(PollFailure::Unauthorized) if awaited => expire(state),
        Err(PollFailure::Unauthorized) => Vec::new(),
    }
}
