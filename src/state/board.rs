use crate::snapshot::{EntityId, Snapshot};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Holds the latest published snapshot for streaming to clients.
///
/// Each publish replaces the previous snapshot entirely; entities missing
/// from the new one are no longer reported.
pub struct StatusBoard {
    /// Entities of the served diagram
    entities: Vec<EntityId>,

    /// Latest snapshot, `None` until the first publish
    latest: RwLock<Option<Arc<Snapshot>>>,
}

impl StatusBoard {
    pub fn new(entities: Vec<EntityId>) -> Self {
        Self {
            entities,
            latest: RwLock::new(None),
        }
    }

    /// Replace the current snapshot; open streams pick it up on their next tick
    pub fn publish(&self, snapshot: Snapshot) {
        debug!(
            timestamp = snapshot.timestamp,
            statuses = snapshot.statuses.len(),
            "Publishing snapshot"
        );
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        *latest = Some(Arc::new(snapshot));
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
