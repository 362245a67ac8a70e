use super::Snapshot;
use serde_json::error::Category;
use serde_json::{Deserializer, Value};
use std::fmt;

/// Quoted key that must follow the opening brace of every snapshot.
///
/// A `"` inside a JSON string is always escaped, so status strings can never
/// produce a false match. A nested object with a `timestamp` key still can.
const MARKER_KEY: &[u8] = b"\"timestamp\"";

/// Errors extracting a snapshot from the stream buffer
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The buffer holds data but no snapshot start
    MissingMarker,
    /// Only a partially received snapshot is present so far
    Incomplete,
    InvalidJson(String),
    NotAnObject,
    InvalidTimestamp,
}

impl DecodeError {
    /// Whether more bytes could still turn the buffer into a snapshot
    pub fn is_incomplete(&self) -> bool {
        matches!(self, DecodeError::Incomplete)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MissingMarker => write!(f, "no snapshot start found in buffer"),
            DecodeError::Incomplete => write!(f, "snapshot not fully received yet"),
            DecodeError::InvalidJson(e) => write!(f, "invalid snapshot JSON: {}", e),
            DecodeError::NotAnObject => write!(f, "snapshot must be a JSON object"),
            DecodeError::InvalidTimestamp => {
                write!(f, "snapshot timestamp must be an integer")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Newest complete snapshot and the buffer offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub snapshot: Snapshot,
    pub offset: usize,
}

/// Extract the most recent complete snapshot from a streamed buffer.
///
/// Servers concatenate snapshots into one ever-growing response; only the
/// newest complete one matters. When the newest snapshot is still arriving,
/// the one before it is returned instead.
pub fn decode_latest(buffer: &[u8]) -> Result<Decoded, DecodeError> {
    let mut candidates = marker_offsets(buffer);

    let Some(last) = candidates.next() else {
        return Err(if may_become_marker(buffer) {
            DecodeError::Incomplete
        } else {
            DecodeError::MissingMarker
        });
    };

    let tail = &buffer[last..];
    let mut values = Deserializer::from_slice(tail).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => {
            let rest = &tail[values.byte_offset()..];
            if !may_become_marker(rest) {
                return Err(DecodeError::InvalidJson(
                    "trailing characters after snapshot".to_string(),
                ));
            }
            return into_decoded(value, last);
        }
        Some(Err(e)) if e.classify() != Category::Eof => {
            return Err(DecodeError::InvalidJson(e.to_string()));
        }
        _ => {}
    }

    // newest snapshot is still streaming in
    for offset in candidates {
        let mut values = Deserializer::from_slice(&buffer[offset..]).into_iter::<Value>();
        if let Some(Ok(value)) = values.next() {
            return into_decoded(value, offset);
        }
    }

    Err(DecodeError::Incomplete)
}

/// Parse exactly one snapshot, with nothing before or after it
pub fn parse_snapshot(bytes: &[u8]) -> Result<Snapshot, DecodeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(object) => Snapshot::from_object(&object),
        _ => Err(DecodeError::NotAnObject),
    }
}

fn into_decoded(value: Value, offset: usize) -> Result<Decoded, DecodeError> {
    match value {
        Value::Object(object) => Ok(Decoded {
            snapshot: Snapshot::from_object(&object)?,
            offset,
        }),
        _ => Err(DecodeError::NotAnObject),
    }
}

/// Snapshot start offsets, newest first
fn marker_offsets(buffer: &[u8]) -> impl Iterator<Item = usize> + '_ {
    (0..buffer.len())
        .rev()
        .filter(move |&i| buffer[i] == b'{' && skip_ws(&buffer[i + 1..]).starts_with(MARKER_KEY))
}

/// True for empty/whitespace input or a truncated snapshot start such as `{"time`
fn may_become_marker(bytes: &[u8]) -> bool {
    let bytes = skip_ws(bytes);
    match bytes.split_first() {
        None => true,
        Some((b'{', rest)) => MARKER_KEY.starts_with(skip_ws(rest)),
        Some(_) => false,
    }
}

fn skip_ws(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        .unwrap_or(bytes.len());
    &bytes[start..]
}
