//! Chat stream events and the classifier that maps wire records onto them.
//!
//! [`ChatEvent::classify`] is the only place that knows how the backend
//! encodes its four event kinds. The backend names every block
//! (`event: start|token|done|error`); when the name is present it decides the
//! variant. Unnamed blocks fall back to the payload's shape, checked in this
//! order:
//!
//! | Keys present            | Event   |
//! |-------------------------|---------|
//! | `content` + `sources`   | `Done`  |
//! | `session_id` + `sources`| `Start` |
//! | `content`               | `Token` |
//! | `message`               | `Error` |
//!
//! `Done` is checked before `Token` because both carry `content`. Adding a
//! payload that overlaps one of these shapes will be misclassified unless it
//! is sent with an explicit event name.

use super::decoder::SseRecord;
use crate::core::error::DomainError;
use serde_json::{Map, Value};

/// A decoded event in a streaming chat response.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// First record of a response: conversation id and retrieved citations.
    Start {
        session_id: Option<String>,
        sources: Vec<String>,
    },
    /// An incremental fragment of assistant text.
    Token(String),
    /// Terminal success record.
    Done {
        content: String,
        sources: Option<Vec<String>>,
        analytics: Option<Value>,
    },
    /// Terminal failure reported by the server.
    Error(String),
    /// A well-formed record that matches no known event.
    Unknown(Value),
}

impl ChatEvent {
    /// Parse a record's JSON payload and classify it.
    ///
    /// A payload that is not valid JSON, or not a JSON object, is a protocol
    /// error.
    pub fn classify(record: &SseRecord) -> Result<Self, DomainError> {
        let value: Value =
            serde_json::from_str(&record.data).map_err(|e| DomainError::InvalidJson {
                error: e.to_string(),
                raw: record.data.clone(),
            })?;
        let Value::Object(map) = value else {
            return Err(DomainError::NotAnObject(record.data.clone()));
        };

        let named = record
            .event
            .as_deref()
            .and_then(|name| Self::from_named(name, &map));
        Ok(named.unwrap_or_else(|| Self::from_shape(map)))
    }

    /// Returns true if this event ends the response.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Done { .. } | ChatEvent::Error(_))
    }

    fn from_named(name: &str, map: &Map<String, Value>) -> Option<Self> {
        let event = match name {
            "start" => ChatEvent::Start {
                session_id: string_field(map, "session_id"),
                sources: sources_field(map).unwrap_or_default(),
            },
            "token" => ChatEvent::Token(string_field(map, "content").unwrap_or_default()),
            "done" => ChatEvent::Done {
                content: string_field(map, "content").unwrap_or_default(),
                sources: sources_field(map),
                analytics: analytics_field(map),
            },
            "error" => ChatEvent::Error(
                string_field(map, "message").unwrap_or_else(|| "Unknown stream error".to_string()),
            ),
            _ => return None,
        };
        Some(event)
    }

    fn from_shape(map: Map<String, Value>) -> Self {
        let has = |key: &str| map.contains_key(key);

        if has("content") && has("sources") {
            ChatEvent::Done {
                content: string_field(&map, "content").unwrap_or_default(),
                sources: sources_field(&map),
                analytics: analytics_field(&map),
            }
        } else if has("session_id") && map.get("sources").is_some_and(Value::is_array) {
            ChatEvent::Start {
                session_id: string_field(&map, "session_id"),
                sources: sources_field(&map).unwrap_or_default(),
            }
        } else if let Some(content) = string_field(&map, "content") {
            ChatEvent::Token(content)
        } else if let Some(message) = string_field(&map, "message") {
            ChatEvent::Error(message)
        } else {
            ChatEvent::Unknown(Value::Object(map))
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Citations are plain strings; objects with a `citation` key are accepted too.
fn sources_field(map: &Map<String, Value>) -> Option<Vec<String>> {
    let items = map.get("sources")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj
                    .get("citation")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect(),
    )
}

fn analytics_field(map: &Map<String, Value>) -> Option<Value> {
    map.get("analytics").filter(|v| !v.is_null()).cloned()
}
