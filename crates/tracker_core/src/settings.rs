use std::time::Duration;

/// Intervals of the two polling cadences. Each drives its own cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Status polling for the observed tasks.
    pub status_interval: Duration,
    /// Coarse refresh of task display names.
    pub label_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_millis(1500),
            label_interval: Duration::from_secs(10),
        }
    }
}
