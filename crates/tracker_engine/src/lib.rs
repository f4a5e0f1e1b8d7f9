//! Tracker engine: backend HTTP client, wire decoding and the background request runner.
mod client;
mod engine;
mod events;
mod types;
mod wire;

pub use client::{ClientSettings, ReqwestStatusClient, StatusSource};
pub use engine::{EngineError, EngineHandle};
pub use events::{SessionEvent, SessionEvents};
pub use types::{EngineEvent, FailureKind, LabelMap, StatusError};
pub use wire::{decode_profiles, decode_status, decode_status_map};
