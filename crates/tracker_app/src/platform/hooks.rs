use tracker_core::{TaskId, TaskState};

type TerminalHook = Box<dyn Fn(&TaskId, TaskState) + Send>;

/// Callbacks run once per task lifetime when a task reaches `done`, `error` or `stopped`.
#[derive(Default)]
pub struct TerminalHooks {
    hooks: Vec<TerminalHook>,
}

impl TerminalHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: impl Fn(&TaskId, TaskState) + Send + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn fire(&self, task_id: &TaskId, state: TaskState) {
        for hook in &self.hooks {
            hook(task_id, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn every_registered_hook_sees_the_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = TerminalHooks::new();
        for name in ["first", "second"] {
            let seen = seen.clone();
            hooks.register(move |id, state| {
                seen.lock().unwrap().push(format!("{name}:{id}:{}", state.as_str()));
            });
        }

        hooks.fire(&TaskId::from("7"), TaskState::Done);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:7:done".to_string(), "second:7:done".to_string()]
        );
    }
}
