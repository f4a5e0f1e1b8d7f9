use crate::TaskId;

/// Insertion-ordered set of the task ids currently observed.
///
/// Order is kept so the console renders tabs in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskRegistry {
    ids: Vec<TaskId>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the id was not yet present. Blank ids are ignored.
    pub fn add(&mut self, id: impl Into<TaskId>) -> bool {
        let id = id.into();
        if id.is_empty() || self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Returns `true` when the id was present.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        self.ids.len() != before
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn list(&self) -> &[TaskId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_across_id_types() {
        let mut registry = TaskRegistry::new();
        assert!(registry.add("3"));
        assert!(registry.add(1u64));
        assert!(!registry.add(3u64));
        assert!(!registry.add(" 3"));

        let ids: Vec<&str> = registry.list().iter().map(TaskId::as_str).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn removing_absent_id_is_noop() {
        let mut registry = TaskRegistry::new();
        registry.add("1");
        assert!(!registry.remove(&TaskId::from("2")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn blank_ids_are_ignored() {
        let mut registry = TaskRegistry::new();
        assert!(!registry.add("  "));
        assert!(registry.is_empty());
    }
}
