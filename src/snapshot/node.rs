use serde::{Deserialize, Serialize};

/// Return state of a behavior-tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeState {
    Idle,
    Running,
    Success,
    Failure,
}

impl NodeState {
    pub const ALL: [NodeState; 4] = [
        NodeState::Idle,
        NodeState::Running,
        NodeState::Success,
        NodeState::Failure,
    ];

    /// Name as it appears in behavior-tree logs
    pub fn name(&self) -> &'static str {
        match self {
            NodeState::Idle => "IDLE",
            NodeState::Running => "RUNNING",
            NodeState::Success => "SUCCESS",
            NodeState::Failure => "FAILURE",
        }
    }

    /// Color token painted for this state
    pub fn color(&self) -> &'static str {
        match self {
            NodeState::Idle => "#9999FF",
            NodeState::Running => "#FFFF99",
            NodeState::Success => "#99FF99",
            NodeState::Failure => "#FF9999",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.name() == name)
    }

    /// Reverse lookup of `color`, ignoring hex digit case
    pub fn from_color(color: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.color().eq_ignore_ascii_case(color))
    }
}
