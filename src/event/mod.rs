use crate::snapshot::{NodeState, Snapshot, Status};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::{validate, ValidationError};

/// One behavior-tree log message: every node status change of one tick.
///
/// Each message describes the whole tree; nodes not mentioned are reported
/// as unknown until they appear again.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorTreeLog {
    /// Producer time in nanoseconds
    pub timestamp: i64,

    #[serde(default)]
    pub event_log: Vec<StatusChange>,
}

/// Status transition of a single node
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusChange {
    /// Diagram node identifier; older producers omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u64>,

    #[serde(default)]
    pub node_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<String>,

    /// One of IDLE, RUNNING, SUCCESS, FAILURE
    pub current_status: String,
}

impl BehaviorTreeLog {
    /// Validate the message and convert it into a snapshot.
    ///
    /// Changes without a `uid` cannot be placed on the diagram and are
    /// skipped. A later change for the same node overrides an earlier one.
    pub fn into_snapshot(self) -> Result<Snapshot, ValidationError> {
        validate(&self)?;

        let mut snapshot = Snapshot::new(self.timestamp);
        for change in &self.event_log {
            let Some(uid) = change.uid else {
                continue;
            };
            if let Some(state) = NodeState::from_name(&change.current_status) {
                snapshot
                    .statuses
                    .insert(uid.to_string(), Status::new(state.color()));
            }
        }
        Ok(snapshot)
    }
}
