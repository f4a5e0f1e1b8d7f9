use std::path::PathBuf;

use tracker_core::{Effect, Msg, PollFailure};
use tracker_engine::{EngineEvent, EngineHandle};
use tracker_logging::{tracker_info, tracker_poll, tracker_warn};

use super::hooks::TerminalHooks;
use super::persistence;

/// Executes core effects against the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    hooks: TerminalHooks,
    state_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, hooks: TerminalHooks, state_dir: PathBuf) -> Self {
        Self {
            engine,
            hooks,
            state_dir,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchStatuses { seq, task_ids } => {
                    tracker_poll!(
                        Debug,
                        "seq={} aggregate request for {} tasks",
                        seq,
                        task_ids.len()
                    );
                    self.engine.fetch_statuses(seq, task_ids);
                }
                Effect::FetchStatus { seq, task_id } => {
                    tracker_poll!(Debug, "seq={} single request for task {}", seq, task_id);
                    self.engine.fetch_status(seq, task_id);
                }
                Effect::FetchLabels { seq } => {
                    self.engine.fetch_labels(seq);
                }
                Effect::SendStop {
                    task_id,
                    generation,
                } => {
                    tracker_info!("Requesting stop for task {}", task_id);
                    self.engine.stop(task_id, generation);
                }
                Effect::NotifyTerminal { task_id, state } => {
                    tracker_info!("Task {} finished as {}", task_id, state.as_str());
                    self.hooks.fire(&task_id, state);
                }
                Effect::UnexpectedTransition { task_id, from, to } => {
                    tracker_warn!(
                        "Task {} moved {} -> {} outside the expected order; applied",
                        task_id,
                        from.as_str(),
                        to.as_str()
                    );
                }
                Effect::PersistTasks { task_ids } => {
                    persistence::save_tasks(&self.state_dir, &task_ids);
                }
                Effect::SessionExpired => {
                    tracker_warn!("Session expired; tracking stopped");
                    self.engine.set_token(None);
                }
            }
        }
    }

    /// Drains every engine event that has arrived so far.
    pub fn drain_events(&self) -> Vec<Msg> {
        let mut inbox = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            inbox.push(to_msg(event));
        }
        inbox
    }
}

fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::StatusesFetched { seq, result } => {
            if let Err(err) = &result {
                tracker_poll!(Warn, "seq={} status request failed: {}", seq, err);
            }
            Msg::StatusesFetched {
                seq,
                result: result.map_err(PollFailure::from),
            }
        }
        EngineEvent::LabelsFetched { seq, result } => {
            if let Err(err) = &result {
                tracker_warn!("Label refresh {} failed: {}", seq, err);
            }
            Msg::LabelsFetched {
                seq,
                result: result.map_err(PollFailure::from),
            }
        }
        EngineEvent::StopAcknowledged {
            task_id,
            generation,
            result,
        } => {
            if let Err(err) = &result {
                tracker_warn!("Stop request for task {} failed: {}", task_id, err);
            }
            Msg::StopAcknowledged {
                task_id,
                generation,
                result: result.map_err(PollFailure::from),
            }
        }
    }
}
