use chrono::Utc;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub mod decoder;
mod node;


pub use decoder::{decode_latest, DecodeError, Decoded};
pub use node::NodeState;

/// Reserved top-level key carrying the snapshot timestamp
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Color painted for entities with no known status
pub const UNKNOWN_COLOR: &str = "#eeeeee";

/// Identifies one diagram node; stable for the session
pub type EntityId = String;

/// Condition of one entity, opaque to the core (in practice a color token)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Entity was absent from the snapshot
    Unknown,
    Value(String),
}

impl Status {
    pub fn new(value: impl Into<String>) -> Self {
        Status::Value(value.into())
    }

    /// Convert a JSON value from the wire.
    ///
    /// Strings are kept verbatim, `null` is unknown, anything else is kept
    /// as its compact JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Status::Unknown,
            Value::String(s) => Status::Value(s.clone()),
            other => Status::Value(other.to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Status::Unknown)
    }

    /// Color token to paint, falling back to the unknown color
    pub fn color(&self) -> &str {
        match self {
            Status::Unknown => UNKNOWN_COLOR,
            Status::Value(v) => v,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unknown => write!(f, "unknown"),
            Status::Value(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Status::Unknown => serializer.serialize_none(),
            Status::Value(v) => serializer.serialize_str(v),
        }
    }
}

/// Point-in-time mapping from entity to status, stamped by the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub timestamp: i64,
    pub statuses: BTreeMap<EntityId, Status>,
}

impl Snapshot {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            statuses: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, entity_id: impl Into<EntityId>, status: Status) -> Self {
        self.statuses.insert(entity_id.into(), status);
        self
    }

    /// Build a snapshot from a decoded JSON object.
    ///
    /// `timestamp` must be an integer; every other key is an entity.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, DecodeError> {
        let timestamp = object
            .get(TIMESTAMP_KEY)
            .and_then(Value::as_i64)
            .ok_or(DecodeError::InvalidTimestamp)?;

        let statuses = object
            .iter()
            .filter(|(key, _)| key.as_str() != TIMESTAMP_KEY)
            .map(|(key, value)| (key.clone(), Status::from_json(value)))
            .collect();

        Ok(Self {
            timestamp,
            statuses,
        })
    }

    /// Status for an entity; absent entities are unknown, never "unchanged"
    pub fn status_of(&self, entity_id: &str) -> Status {
        self.statuses
            .get(entity_id)
            .cloned()
            .unwrap_or(Status::Unknown)
    }

    /// Serialize to the wire format (`timestamp` first, no whitespace)
    pub fn to_wire(&self) -> String {
        // Serializing a BTreeMap-backed struct into a String cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.statuses.len() + 1))?;
        map.serialize_entry(TIMESTAMP_KEY, &self.timestamp)?;
        for (entity_id, status) in &self.statuses {
            map.serialize_entry(entity_id, status)?;
        }
        map.end()
    }
}

/// Current wall-clock time in nanoseconds, the unit snapshots are stamped in
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
