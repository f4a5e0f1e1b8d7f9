use std::sync::RwLock;
use std::time::Duration;

use reqwest::StatusCode;
use tracker_core::{StatusBatch, TaskId, TaskStatus};
use tracker_logging::{tracker_debug, tracker_warn};
use url::Url;

use crate::events::{SessionEvent, SessionEvents};
use crate::wire::{decode_profiles, decode_status, decode_status_map, parse_body};
use crate::{FailureKind, LabelMap, StatusError};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    /// Bearer token sent with every request. Can be replaced later with
    /// [`StatusSource::set_token`].
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            token: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Backend operations the tracker needs.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    /// `GET /status?ids=a,b,c`
    async fn fetch_statuses(&self, task_ids: &[TaskId]) -> Result<StatusBatch, StatusError>;

    /// `GET /status/{id}`
    async fn fetch_status(&self, task_id: &TaskId) -> Result<TaskStatus, StatusError>;

    /// `POST /stop/{id}`. Best effort; the backend confirms through a later status.
    async fn stop(&self, task_id: &TaskId) -> Result<(), StatusError>;

    /// `GET /profiles/`
    async fn fetch_labels(&self) -> Result<LabelMap, StatusError>;

    /// Replaces the bearer token, e.g. after a fresh login.
    fn set_token(&self, token: Option<String>);
}

#[derive(Debug)]
pub struct ReqwestStatusClient {
    base: Url,
    client: reqwest::Client,
    token: RwLock<Option<String>>,
    events: SessionEvents,
}

impl ReqwestStatusClient {
    pub fn new(settings: ClientSettings, events: SessionEvents) -> Result<Self, StatusError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| StatusError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(StatusError::new(
                FailureKind::InvalidUrl,
                format!("{base} cannot be used as a base url"),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| StatusError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            base,
            client,
            token: RwLock::new(settings.token),
            events,
        })
    }

    fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects bases without path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<Vec<u8>, StatusError> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracker_warn!("Backend rejected the session at {}", url.path());
            self.events.publish(SessionEvent::Unauthorized {
                endpoint: url.path().to_string(),
            });
            return Err(StatusError::new(FailureKind::Unauthorized, status.to_string()));
        }
        if !status.is_success() {
            return Err(StatusError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        tracker_debug!("{} {} ({} bytes)", status.as_u16(), url.path(), body.len());
        Ok(body.to_vec())
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value, StatusError> {
        let body = self.send(self.client.get(url.clone()), &url).await?;
        parse_body(&body)
    }
}

#[async_trait::async_trait]
impl StatusSource for ReqwestStatusClient {
    async fn fetch_statuses(&self, task_ids: &[TaskId]) -> Result<StatusBatch, StatusError> {
        let ids = task_ids
            .iter()
            .map(TaskId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.endpoint(&["status"]);
        url.query_pairs_mut().append_pair("ids", &ids);

        let value = self.get_json(url).await?;
        decode_status_map(&value)
    }

    async fn fetch_status(&self, task_id: &TaskId) -> Result<TaskStatus, StatusError> {
        let url = self.endpoint(&["status", task_id.as_str()]);
        let value = self.get_json(url).await?;
        Ok(decode_status(&value))
    }

    async fn stop(&self, task_id: &TaskId) -> Result<(), StatusError> {
        let url = self.endpoint(&["stop", task_id.as_str()]);
        self.send(self.client.post(url.clone()), &url).await?;
        Ok(())
    }

    async fn fetch_labels(&self) -> Result<LabelMap, StatusError> {
        let url = self.endpoint(&["profiles", ""]);
        let value = self.get_json(url).await?;
        decode_profiles(&value)
    }

    fn set_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> StatusError {
    if err.is_timeout() {
        return StatusError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return StatusError::new(FailureKind::InvalidUrl, err.to_string());
    }
    StatusError::new(FailureKind::Network, err.to_string())
}
