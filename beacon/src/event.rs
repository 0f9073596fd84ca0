//! Telemetry event payloads.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved key carrying the event timestamp.
pub const TIMESTAMP_KEY: &str = "ts";

/// Reserved key carrying the event kind.
pub const EVENT_TYPE_KEY: &str = "event_type";

/// Internal key carrying per-event delivery overrides.
///
/// Stripped from the event before it reaches the batcher, whether or not an
/// override was applied.
pub(crate) const OVERRIDE_KEY: &str = "_hb";

/// Event key identifying the logical request an event belongs to.
///
/// Events sharing this identifier receive the same sampling decision.
pub(crate) const REQUEST_ID_KEY: &str = "request_id";

/// A single telemetry record destined for bulk delivery.
///
/// An event is a free-form mapping from string keys to JSON values. The
/// client injects the reserved [`TIMESTAMP_KEY`] and [`EVENT_TYPE_KEY`]
/// fields; all remaining keys are caller data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    /// Builds an event from defaults, persistent context and caller payload.
    ///
    /// Precedence on key collisions, lowest first: the injected timestamp,
    /// the persistent event context, the `event_type` tag, the caller
    /// payload. A timestamp supplied by the caller or the context is kept.
    pub(crate) fn build(
        event_type: Option<&str>,
        context: &Map<String, Value>,
        payload: Map<String, Value>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert(TIMESTAMP_KEY.to_owned(), Value::String(now_rfc3339()));

        for (key, value) in context {
            fields.insert(key.clone(), value.clone());
        }

        if let Some(event_type) = event_type {
            fields.insert(
                EVENT_TYPE_KEY.to_owned(),
                Value::String(event_type.to_owned()),
            );
        }

        for (key, value) in payload {
            fields.insert(key, value);
        }

        Self { fields }
    }

    /// Returns the value for the given key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Inserts a key, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Removes a key, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns `true` if the event carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns a reference to the underlying field mapping.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Extracts the per-event sample rate override, stripping the override
    /// key from the event whether or not a usable rate was found.
    pub(crate) fn take_sample_rate(&mut self) -> Option<u32> {
        let overrides = self.fields.remove(OVERRIDE_KEY)?;
        let rate = overrides.get("sample_rate")?.as_u64()?;
        Some(rate.min(100) as u32)
    }

    /// Returns the stable identifier used for consistent sampling, if one is
    /// present.
    pub(crate) fn stable_id(&self) -> Option<&str> {
        self.fields.get(REQUEST_ID_KEY)?.as_str()
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Formats the current time as an RFC 3339 timestamp with millisecond
/// precision.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
