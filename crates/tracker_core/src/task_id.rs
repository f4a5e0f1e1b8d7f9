use std::fmt;

/// Canonical identifier of a background search task.
///
/// Ids reach the tracker both as numbers (backend profile ids) and as strings
/// (route parameters, console input). Every constructor funnels through
/// [`TaskId::new`] so that `7`, `"7"`, `" 7 "` and `"007"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(canonicalize(raw.as_ref()))
    }

    /// Parses user input, rejecting blank ids.
    pub fn parse(raw: &str) -> Option<Self> {
        let id = Self::new(raw);
        if id.0.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let without_zeros = trimmed.trim_start_matches('0');
        if without_zeros.is_empty() {
            return "0".to_string();
        }
        return without_zeros.to_string();
    }
    trimmed.to_string()
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for TaskId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&String> for TaskId {
    fn from(raw: &String) -> Self {
        Self::new(raw)
    }
}

impl From<u64> for TaskId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

impl From<u32> for TaskId {
    fn from(raw: u32) -> Self {
        Self(raw.to_string())
    }
}

impl From<i64> for TaskId {
    fn from(raw: i64) -> Self {
        Self::new(raw.to_string())
    }
}

impl From<&TaskId> for TaskId {
    fn from(id: &TaskId) -> Self {
        id.clone()
    }
}
