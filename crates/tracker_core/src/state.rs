use std::collections::BTreeMap;
use std::time::Duration;

use crate::view_model::{default_task_name, derive, tab_label, AppViewModel, TaskTab, TaskView};
use crate::{
    Cadence, PollSettings, Seq, StateReconciler, TaskId, TaskRegistry, TaskState, TaskStatus,
};

/// Counts session starts. Requests that outlive their session carry a stale value.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    Active,
}

/// Everything that lives exactly as long as one authenticated session.
///
/// Dropping the value is the teardown: registry, snapshot store and ledger go together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Session {
    pub(crate) registry: TaskRegistry,
    pub(crate) reconciler: StateReconciler,
    pub(crate) labels: BTreeMap<TaskId, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    session: Option<Session>,
    generation: Generation,
    status_cadence: Cadence,
    label_cadence: Cadence,
    /// Last sequence number handed out for a status request.
    status_seq: Seq,
    in_flight_status: Option<Seq>,
    label_seq: Seq,
    in_flight_labels: Option<Seq>,
    polls_fired: u64,
    last_poll_error: Option<String>,
    notice: Option<String>,
    dirty: bool,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::new(PollSettings::default())
    }
}

impl TrackerState {
    pub fn new(settings: PollSettings) -> Self {
        Self {
            session: None,
            generation: 0,
            status_cadence: Cadence::new(settings.status_interval),
            label_cadence: Cadence::new(settings.label_interval),
            status_seq: 0,
            in_flight_status: None,
            label_seq: 0,
            in_flight_labels: None,
            polls_fired: 0,
            last_poll_error: None,
            notice: None,
            dirty: false,
        }
    }

    pub fn session(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Active
        } else {
            SessionState::LoggedOut
        }
    }

    /// Generation of the current session, or of the last one if logged out.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Registered ids in insertion order. Empty when logged out.
    pub fn tasks(&self) -> &[TaskId] {
        self.session
            .as_ref()
            .map(|session| session.registry.list())
            .unwrap_or(&[])
    }

    pub fn status(&self, id: &TaskId) -> Option<&TaskStatus> {
        self.session.as_ref()?.reconciler.status(id)
    }

    /// Copy of the snapshot store.
    pub fn statuses(&self) -> BTreeMap<TaskId, TaskStatus> {
        self.session
            .as_ref()
            .map(|session| session.reconciler.snapshot())
            .unwrap_or_default()
    }

    pub fn notified_state(&self, id: &TaskId) -> Option<TaskState> {
        self.session.as_ref()?.reconciler.notified(id)
    }

    pub fn is_polling(&self) -> bool {
        self.status_cadence.is_running()
    }

    pub fn is_refreshing_labels(&self) -> bool {
        self.label_cadence.is_running()
    }

    pub fn status_request_outstanding(&self) -> bool {
        self.status_cadence.is_outstanding()
    }

    pub fn polls_fired(&self) -> u64 {
        self.polls_fired
    }

    pub fn view(&self) -> AppViewModel {
        let (tabs, tasks) = match &self.session {
            Some(session) => {
                let tabs = session
                    .registry
                    .list()
                    .iter()
                    .map(|id| {
                        let state = session.reconciler.status(id).map(TaskStatus::state);
                        let name = session
                            .labels
                            .get(id)
                            .cloned()
                            .unwrap_or_else(|| default_task_name(id));
                        TaskTab {
                            task_id: id.clone(),
                            label: tab_label(&name, state),
                            state,
                        }
                    })
                    .collect();
                let tasks = session
                    .registry
                    .list()
                    .iter()
                    .map(|id| {
                        let progress = match session.reconciler.status(id) {
                            Some(status) => derive(status),
                            None => derive(&TaskStatus::default()),
                        };
                        TaskView {
                            task_id: id.clone(),
                            progress,
                        }
                    })
                    .collect();
                (tabs, tasks)
            }
            None => (Vec::new(), Vec::new()),
        };

        AppViewModel {
            session: self.session(),
            tabs,
            tasks,
            last_poll_error: self.last_poll_error.clone(),
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub(crate) fn start_session(&mut self, now: Duration) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(Session::default());
        self.generation += 1;
        self.status_cadence.start(now);
        self.label_cadence.start(now);
        self.in_flight_status = None;
        self.in_flight_labels = None;
        self.last_poll_error = None;
        self.notice = None;
        self.dirty = true;
        true
    }

    /// Clears registry, store and ledger and halts both cadences in one step.
    pub(crate) fn teardown(&mut self, notice: &str) -> bool {
        if self.session.take().is_none() {
            return false;
        }
        self.status_cadence.stop();
        self.label_cadence.stop();
        self.in_flight_status = None;
        self.in_flight_labels = None;
        self.last_poll_error = None;
        self.notice = Some(notice.to_string());
        self.dirty = true;
        true
    }

    /// Whether a request sent under `generation` belongs to the live session.
    pub(crate) fn is_current(&self, generation: Generation) -> bool {
        self.session.is_some() && self.generation == generation
    }

    pub(crate) fn status_cadence_mut(&mut self) -> &mut Cadence {
        &mut self.status_cadence
    }

    pub(crate) fn label_cadence_mut(&mut self) -> &mut Cadence {
        &mut self.label_cadence
    }

    pub(crate) fn last_status_seq(&self) -> Seq {
        self.status_seq
    }

    pub(crate) fn issue_status_seq(&mut self) -> Seq {
        self.status_seq += 1;
        self.polls_fired += 1;
        self.in_flight_status = Some(self.status_seq);
        self.status_cadence.begin();
        self.status_seq
    }

    /// Completes the status cadence if `seq` is the request it is waiting for.
    /// Returns whether it was.
    pub(crate) fn settle_status(&mut self, seq: Seq) -> bool {
        if self.in_flight_status != Some(seq) {
            return false;
        }
        self.in_flight_status = None;
        self.status_cadence.complete();
        true
    }

    pub(crate) fn issue_label_seq(&mut self) -> Seq {
        self.label_seq += 1;
        self.in_flight_labels = Some(self.label_seq);
        self.label_cadence.begin();
        self.label_seq
    }

    pub(crate) fn settle_labels(&mut self, seq: Seq) -> bool {
        if self.in_flight_labels != Some(seq) {
            return false;
        }
        self.in_flight_labels = None;
        self.label_cadence.complete();
        true
    }

    pub(crate) fn set_poll_error(&mut self, error: Option<String>) {
        if self.last_poll_error != error {
            self.last_poll_error = error;
            self.dirty = true;
        }
    }

    pub(crate) fn set_notice(&mut self, notice: String) {
        self.notice = Some(notice);
        self.dirty = true;
    }
}
