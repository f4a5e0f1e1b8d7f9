//! Decoding of backend JSON into core status types.
//!
//! Decoding is lenient per field: a missing or wrong-typed field falls back to
//! its default while the rest of the record survives. Only a body that is not
//! JSON at all, or has the wrong top-level shape, is a decode error.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracker_core::{
    default_task_name, Counters, LogEntry, Phase, PlannedUnit, SearchPlan, StatusBatch, TaskId,
    TaskState, TaskStatus,
};

use crate::{FailureKind, LabelMap, StatusError};

pub fn parse_body(bytes: &[u8]) -> Result<Value, StatusError> {
    serde_json::from_slice(bytes)
        .map_err(|err| StatusError::new(FailureKind::Decode, err.to_string()))
}

/// Decodes one status record. Never fails; a non-object decodes as `unknown`.
pub fn decode_status(value: &Value) -> TaskStatus {
    let Some(record) = value.as_object() else {
        return TaskStatus::default();
    };

    let state = record
        .get("state")
        .and_then(Value::as_str)
        .map(TaskState::from_wire)
        .unwrap_or_default();
    let label = text(record, "current_query");
    let planned_units = decode_planned_units(record.get("searches_generated"));

    let plan = match count(record, "total_searches") {
        Some(total) => Some(SearchPlan::new(
            total,
            count(record, "current_search_index").unwrap_or(0),
            planned_units,
        )),
        None if !planned_units.is_empty() => {
            let total = u32::try_from(planned_units.len()).unwrap_or(u32::MAX);
            Some(SearchPlan::new(
                total,
                count(record, "current_search_index").unwrap_or(0),
                planned_units,
            ))
        }
        None => None,
    };

    TaskStatus {
        phase: Phase::from_state(state, label),
        plan,
        counters: Counters {
            new_count: count(record, "jobs_new").unwrap_or(0),
            duplicate_count: count(record, "jobs_duplicates").unwrap_or(0),
            skipped_count: count(record, "jobs_skipped").unwrap_or(0),
            error_count: count(record, "errors").unwrap_or(0),
        },
        log: decode_log(record.get("log")),
    }
}

/// Decodes the aggregate `{ "<id>": status, ... }` response.
pub fn decode_status_map(value: &Value) -> Result<StatusBatch, StatusError> {
    let records = value.as_object().ok_or_else(|| {
        StatusError::new(
            FailureKind::Decode,
            format!("expected an object keyed by task id, got {}", kind_of(value)),
        )
    })?;

    Ok(records
        .iter()
        .filter_map(|(id, record)| TaskId::parse(id).map(|id| (id, decode_status(record))))
        .collect())
}

/// Decodes the profile listing into display names.
///
/// The name falls back to the role description, then to `Search #<id>`.
pub fn decode_profiles(value: &Value) -> Result<LabelMap, StatusError> {
    let profiles = value.as_array().ok_or_else(|| {
        StatusError::new(
            FailureKind::Decode,
            format!("expected a list of profiles, got {}", kind_of(value)),
        )
    })?;

    let mut labels = LabelMap::new();
    for profile in profiles.iter().filter_map(Value::as_object) {
        let Some(id) = profile.get("id").and_then(decode_id) else {
            continue;
        };
        let name = text(profile, "name")
            .or_else(|| text(profile, "role_description"))
            .unwrap_or_else(|| default_task_name(&id));
        labels.insert(id, name);
    }
    Ok(labels)
}

fn decode_id(value: &Value) -> Option<TaskId> {
    match value {
        Value::String(raw) => TaskId::parse(raw),
        Value::Number(number) => TaskId::parse(&number.to_string()),
        _ => None,
    }
}

fn decode_planned_units(value: Option<&Value>) -> Vec<PlannedUnit> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|entry| {
            let kind = text(entry, "type")
                .or_else(|| text(entry, "provider"))
                .unwrap_or_else(|| "keyword".to_string());
            let combined = (kind == "combined").then(|| combined_value(entry)).flatten();
            let value = combined
                .or_else(|| text(entry, "value"))
                .or_else(|| text(entry, "query"))?;
            Some(PlannedUnit { kind, value })
        })
        .collect()
}

fn combined_value(entry: &Map<String, Value>) -> Option<String> {
    match (text(entry, "occupation"), text(entry, "keywords")) {
        (Some(occupation), Some(keywords)) => Some(format!("{occupation} + {keywords}")),
        (Some(single), None) | (None, Some(single)) => Some(single),
        (None, None) => None,
    }
}

/// Orders the log by time. An entry without a readable time inherits the
/// time of the entry before it, so it stays next to its neighbour.
fn decode_log(value: Option<&Value>) -> Vec<LogEntry> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut previous: Option<DateTime<Utc>> = None;
    let mut log: Vec<LogEntry> = entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let timestamp = entry
                .get("time")
                .and_then(Value::as_str)
                .and_then(parse_time)
                .or(previous);
            previous = timestamp;
            LogEntry {
                timestamp,
                message: entry
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }
        })
        .collect();

    log.sort_by_key(|entry| entry.timestamp);
    log
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Naive timestamps are taken as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Non-empty trimmed string field.
fn text(record: &Map<String, Value>, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Non-negative count. Floats are truncated, negatives clamp to 0 and
/// anything that is not a number is treated as absent.
fn count(record: &Map<String, Value>, key: &str) -> Option<u32> {
    let value = record.get(key)?;
    if let Some(unsigned) = value.as_u64() {
        return Some(u32::try_from(unsigned).unwrap_or(u32::MAX));
    }
    if value.is_i64() {
        return Some(0);
    }
    let float = value.as_f64().filter(|float| float.is_finite())?;
    Some(float.clamp(0.0, f64::from(u32::MAX)) as u32)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
