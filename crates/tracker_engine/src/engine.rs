use std::sync::{mpsc, Arc};
use std::thread;

use tokio::sync::broadcast;
use tracker_core::{Generation, Seq, StatusBatch, TaskId};
use tracker_logging::{tracker_debug, tracker_info};

use crate::client::{ClientSettings, ReqwestStatusClient, StatusSource};
use crate::events::{SessionEvent, SessionEvents};
use crate::EngineEvent;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("status client: {0}")]
    Client(#[from] crate::StatusError),
    #[error("engine startup: {0}")]
    Startup(#[from] std::io::Error),
}

#[derive(Debug)]
enum EngineCommand {
    FetchStatuses { seq: Seq, task_ids: Vec<TaskId> },
    FetchStatus { seq: Seq, task_id: TaskId },
    FetchLabels { seq: Seq },
    Stop {
        task_id: TaskId,
        generation: Generation,
    },
}

/// Runs backend requests on a background tokio runtime.
///
/// Commands go in over a channel and completions come back as [`EngineEvent`]s,
/// which the caller drains with [`EngineHandle::try_recv`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    source: Arc<dyn StatusSource>,
    session_events: SessionEvents,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings) -> Result<Self, EngineError> {
        let session_events = SessionEvents::new();
        let client = ReqwestStatusClient::new(settings, session_events.clone())?;
        Self::with_source(Arc::new(client), session_events)
    }

    /// Uses `source` for every request. `session_events` should be the channel
    /// `source` publishes on.
    pub fn with_source(
        source: Arc<dyn StatusSource>,
        session_events: SessionEvents,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        let worker_source = source.clone();
        thread::Builder::new()
            .name("tracker-engine".into())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let source = worker_source.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        handle_command(source.as_ref(), command, event_tx).await;
                    });
                }
                tracker_info!("Engine command channel closed; shutting down");
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            source,
            session_events,
        })
    }

    pub fn fetch_statuses(&self, seq: Seq, task_ids: Vec<TaskId>) {
        self.send(EngineCommand::FetchStatuses { seq, task_ids });
    }

    pub fn fetch_status(&self, seq: Seq, task_id: TaskId) {
        self.send(EngineCommand::FetchStatus { seq, task_id });
    }

    pub fn fetch_labels(&self, seq: Seq) {
        self.send(EngineCommand::FetchLabels { seq });
    }

    /// Sends an abort request. `generation` is echoed back in the acknowledgement.
    pub fn stop(&self, task_id: TaskId, generation: Generation) {
        self.send(EngineCommand::Stop {
            task_id,
            generation,
        });
    }

    pub fn set_token(&self, token: Option<String>) {
        self.source.set_token(token);
    }

    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.session_events.subscribe()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    fn send(&self, command: EngineCommand) {
        tracker_debug!("Engine command: {:?}", command);
        let _ = self.cmd_tx.send(command);
    }
}

async fn handle_command(
    source: &dyn StatusSource,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::FetchStatuses { seq, task_ids } => EngineEvent::StatusesFetched {
            seq,
            result: source.fetch_statuses(&task_ids).await,
        },
        EngineCommand::FetchStatus { seq, task_id } => {
            let result = source
                .fetch_status(&task_id)
                .await
                .map(|status| StatusBatch::from([(task_id, status)]));
            EngineEvent::StatusesFetched { seq, result }
        }
        EngineCommand::FetchLabels { seq } => EngineEvent::LabelsFetched {
            seq,
            result: source.fetch_labels().await,
        },
        EngineCommand::Stop {
            task_id,
            generation,
        } => {
            let result = source.stop(&task_id).await;
            EngineEvent::StopAcknowledged {
                task_id,
                generation,
                result,
            }
        }
    };
    let _ = event_tx.send(event);
}
