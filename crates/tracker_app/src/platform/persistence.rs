//! Registry membership survives a console restart in `.tracker_state.ron`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracker_core::TaskId;
use tracker_logging::{tracker_error, tracker_info, tracker_warn};

const STATE_FILENAME: &str = ".tracker_state.ron";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory missing or not writable: {0}")]
    StateDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    tasks: Vec<String>,
}

pub(crate) fn load_tasks(state_dir: &Path) -> Vec<TaskId> {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Vec::new();
        }
        Err(err) => {
            tracker_warn!("Failed to read persisted tasks from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            tracker_warn!("Failed to parse persisted tasks from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    let tasks: Vec<TaskId> = state
        .tasks
        .iter()
        .filter_map(|raw| TaskId::parse(raw))
        .collect();
    tracker_info!("Loaded {} persisted task(s) from {:?}", tasks.len(), path);
    tasks
}

pub(crate) fn save_tasks(state_dir: &Path, tasks: &[TaskId]) {
    let state = PersistedState {
        tasks: tasks.iter().map(|id| id.as_str().to_string()).collect(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(text) => text,
        Err(err) => {
            tracker_error!("Failed to serialize persisted tasks: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(state_dir.to_path_buf());
    if let Err(err) = writer.write(STATE_FILENAME, &content) {
        tracker_error!("Failed to write persisted tasks to {:?}: {}", state_dir, err);
    }
}

/// Creates `dir` if missing and checks it can hold a temp file.
fn ensure_state_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StateDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::StateDir(e.to_string()))?;
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file and a rename, so readers never
/// see a half-written state file.
struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_state_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
