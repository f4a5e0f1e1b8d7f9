use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracker_core::PollSettings;
use tracker_engine::ClientSettings;

use super::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(
    name = "tracker",
    about = "Watch background search tasks from the terminal",
    version,
    long_about = None
)]
pub struct Cli {
    /// Base URL of the search backend API.
    #[arg(long, env = "TRACKER_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Bearer token for the backend. Without one the console starts logged out.
    #[arg(long, env = "TRACKER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory holding the persisted task list.
    #[arg(long, default_value = ".")]
    pub state_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    pub log: LogDestination,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Status polling interval in milliseconds.
    #[arg(long, default_value_t = 1500)]
    pub poll_ms: u64,

    /// Task label refresh interval in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub label_ms: u64,

    #[arg(long, default_value_t = 15)]
    pub request_timeout_secs: u64,

    /// Task ids to start tracking right away.
    pub tasks: Vec<String>,
}

impl Cli {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..ClientSettings::default()
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            status_interval: Duration::from_millis(self.poll_ms.max(1)),
            label_interval: Duration::from_millis(self.label_ms.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_cadence() {
        let cli = Cli::try_parse_from(["tracker", "--token", "t", "7", "12"]).unwrap();
        assert_eq!(cli.poll_settings(), PollSettings::default());
        assert_eq!(cli.tasks, vec!["7".to_string(), "12".to_string()]);
        assert_eq!(cli.client_settings().token.as_deref(), Some("t"));
        assert_eq!(cli.log, LogDestination::File);
    }

    #[test]
    fn intervals_are_configurable() {
        let cli = Cli::try_parse_from(["tracker", "--poll-ms", "500", "--label-ms", "0"]).unwrap();
        let settings = cli.poll_settings();
        assert_eq!(settings.status_interval, Duration::from_millis(500));
        assert_eq!(settings.label_interval, Duration::from_millis(1));
    }
}
