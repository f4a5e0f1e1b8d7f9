use std::collections::BTreeMap;

use crate::{TaskId, TaskRegistry, TaskState, TaskStatus};

/// Sequence number of a status request. Never reset for the life of the process.
pub type Seq = u64;

/// Result of feeding one snapshot to [`StateReconciler::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The snapshot is now the task's current snapshot.
    Applied(Applied),
    /// A newer (or the same) request was already applied; nothing changed.
    Stale { seq: Seq, last_applied: Seq },
    /// The task already reached a terminal state; the arrival was dropped.
    RegressionIgnored {
        recorded: TaskState,
        received: TaskState,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub from: TaskState,
    pub to: TaskState,
    /// `false` when the backend skipped outside the state machine (e.g. `analyzing → generating`).
    pub expected: bool,
    /// Set exactly once per task lifetime, on the first terminal snapshot.
    pub terminal_notice: Option<TaskState>,
}

/// Owner of the snapshot store and the terminal notification ledger.
///
/// Everything outside this type reads copies; only `reconcile` writes snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateReconciler {
    store: BTreeMap<TaskId, TaskStatus>,
    ledger: BTreeMap<TaskId, TaskState>,
    applied_seq: BTreeMap<TaskId, Seq>,
}

impl StateReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a task lifetime: only responses to requests newer than `floor` are accepted.
    ///
    /// A snapshot lingering from a previous lifetime of the same id is dropped.
    pub fn admit(&mut self, id: &TaskId, floor: Seq) {
        self.store.remove(id);
        self.ledger.remove(id);
        self.applied_seq.insert(id.clone(), floor);
    }

    /// Ends a task lifetime. The snapshot itself lingers until [`Self::collect_garbage`].
    pub fn forget(&mut self, id: &TaskId) {
        self.ledger.remove(id);
        self.applied_seq.remove(id);
    }

    pub fn reconcile(&mut self, id: &TaskId, seq: Seq, mut incoming: TaskStatus) -> Reconciled {
        let last_applied = self.applied_seq.get(id).copied().unwrap_or(0);
        if seq <= last_applied {
            return Reconciled::Stale { seq, last_applied };
        }

        let previous = self.store.get(id);
        let from = previous.map(TaskStatus::state).unwrap_or_default();
        let to = incoming.state();

        let terminal_regression = from.is_terminal() && to != from;
        let lost_information = from != TaskState::Unknown && to == TaskState::Unknown;
        if terminal_regression || lost_information {
            // The sequence still advances: an older response must not sneak in afterwards.
            self.applied_seq.insert(id.clone(), seq);
            return Reconciled::RegressionIgnored {
                recorded: from,
                received: to,
            };
        }

        if let Some(previous) = previous {
            merge_monotonic(previous, &mut incoming);
        }

        let terminal_notice = if to.is_terminal() && !self.ledger.contains_key(id) {
            self.ledger.insert(id.clone(), to);
            Some(to)
        } else {
            None
        };

        self.applied_seq.insert(id.clone(), seq);
        self.store.insert(id.clone(), incoming);

        Reconciled::Applied(Applied {
            from,
            to,
            expected: from.can_transition_to(to),
            terminal_notice,
        })
    }

    /// Drops snapshots of ids no longer registered. Returns how many were dropped.
    pub fn collect_garbage(&mut self, registry: &TaskRegistry) -> usize {
        let before = self.store.len();
        self.store.retain(|id, _| registry.contains(id));
        before - self.store.len()
    }

    pub fn status(&self, id: &TaskId) -> Option<&TaskStatus> {
        self.store.get(id)
    }

    /// Copy of the whole store.
    pub fn snapshot(&self) -> BTreeMap<TaskId, TaskStatus> {
        self.store.clone()
    }

    /// Terminal state already notified for `id`, if any.
    pub fn notified(&self, id: &TaskId) -> Option<TaskState> {
        self.ledger.get(id).copied()
    }

    pub fn last_applied(&self, id: &TaskId) -> Option<Seq> {
        self.applied_seq.get(id).copied()
    }
}

/// Counters never decrease and a plan, once known, is neither lost nor rewritten.
fn merge_monotonic(previous: &TaskStatus, incoming: &mut TaskStatus) {
    incoming.counters = incoming.counters.max_with(previous.counters);
    match (&previous.plan, &mut incoming.plan) {
        (Some(prev_plan), Some(next_plan)) => next_plan.keep_planned_units_from(prev_plan),
        (Some(prev_plan), None) => incoming.plan = Some(prev_plan.clone()),
        (None, _) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Counters, PlannedUnit, SearchPlan};

    fn id(raw: &str) -> TaskId {
        TaskId::from(raw)
    }

    #[test]
    fn stale_sequence_is_discarded() {
        let mut reconciler = StateReconciler::new();
        let task = id("1");
        reconciler.reconcile(&task, 4, TaskStatus::with_state(TaskState::Analyzing));
        let outcome = reconciler.reconcile(&task, 3, TaskStatus::with_state(TaskState::Searching));

        assert_eq!(
            outcome,
            Reconciled::Stale {
                seq: 3,
                last_applied: 4
            }
        );
        assert_eq!(reconciler.status(&task).unwrap().state(), TaskState::Analyzing);
    }

    #[test]
    fn admitted_floor_rejects_older_requests() {
        let mut reconciler = StateReconciler::new();
        let task = id("1");
        reconciler.admit(&task, 10);
        assert!(matches!(
            reconciler.reconcile(&task, 10, TaskStatus::with_state(TaskState::Pending)),
            Reconciled::Stale { .. }
        ));
        assert!(matches!(
            reconciler.reconcile(&task, 11, TaskStatus::with_state(TaskState::Pending)),
            Reconciled::Applied(_)
        ));
    }

    #[test]
    fn counters_and_plan_are_kept_monotonic() {
        let mut reconciler = StateReconciler::new();
        let task = id("5");
        let units = vec![PlannedUnit {
            kind: "keyword".into(),
            value: "rust".into(),
        }];
        let first = TaskStatus {
            plan: Some(SearchPlan::new(1, 0, units.clone())),
            counters: Counters {
                new_count: 4,
                ..Counters::default()
            },
            ..TaskStatus::with_state(TaskState::Searching)
        };
        reconciler.reconcile(&task, 1, first);

        let second = TaskStatus {
            plan: None,
            counters: Counters {
                new_count: 2,
                error_count: 1,
                ..Counters::default()
            },
            ..TaskStatus::with_state(TaskState::Searching)
        };
        reconciler.reconcile(&task, 2, second);

        let stored = reconciler.status(&task).unwrap();
        assert_eq!(stored.counters.new_count, 4);
        assert_eq!(stored.counters.error_count, 1);
        assert_eq!(stored.planned_units(), units.as_slice());
    }

    #[test]
    fn unknown_after_known_state_is_ignored() {
        let mut reconciler = StateReconciler::new();
        let task = id("2");
        reconciler.reconcile(&task, 1, TaskStatus::with_state(TaskState::Searching));
        let outcome = reconciler.reconcile(&task, 2, TaskStatus::default());
        assert_eq!(
            outcome,
            Reconciled::RegressionIgnored {
                recorded: TaskState::Searching,
                received: TaskState::Unknown
            }
        );
    }

    #[test]
    fn garbage_collection_keeps_registered_ids() {
        let mut reconciler = StateReconciler::new();
        let mut registry = TaskRegistry::new();
        registry.add("1");
        reconciler.reconcile(&id("1"), 1, TaskStatus::with_state(TaskState::Pending));
        reconciler.reconcile(&id("2"), 1, TaskStatus::with_state(TaskState::Pending));

        assert_eq!(reconciler.collect_garbage(&registry), 1);
        assert!(reconciler.status(&id("1")).is_some());
        assert!(reconciler.status(&id("2")).is_none());
    }
}
