use super::BehaviorTreeLog;
use crate::snapshot::NodeState;
use std::fmt;

/// Validation errors for BehaviorTreeLog
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidTimestamp(i64),
    UnknownStatus(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidTimestamp(ts) => {
                write!(f, "timestamp must not be negative, got {}", ts)
            }
            ValidationError::UnknownStatus(s) => {
                write!(
                    f,
                    "unknown node status '{}': expected IDLE, RUNNING, SUCCESS or FAILURE",
                    s
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates a behavior-tree log message.
///
/// Validation rules:
/// - Timestamp: must not be negative (nanoseconds; simulated clocks start at 0)
/// - current_status: must name a known node state, including for changes
///   that carry no uid
pub fn validate(log: &BehaviorTreeLog) -> Result<(), ValidationError> {
    if log.timestamp < 0 {
        return Err(ValidationError::InvalidTimestamp(log.timestamp));
    }

    if let Some(change) = log
        .event_log
        .iter()
        .find(|change| NodeState::from_name(&change.current_status).is_none())
    {
        return Err(ValidationError::UnknownStatus(change.current_status.clone()));
    }

    Ok(())
}
