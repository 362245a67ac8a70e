use super::{ConnectionIndicator, Presenter};
use crate::history::HistorySeries;
use crate::snapshot::{EntityId, Status};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Presenter that reports through `tracing` instead of drawing
#[derive(Debug, Default)]
pub struct LogPresenter {
    paints: u64,
}

impl LogPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `paint_current` calls so far
    pub fn paints(&self) -> u64 {
        self.paints
    }
}

impl Presenter for LogPresenter {
    fn paint_current(&mut self, statuses: &BTreeMap<EntityId, Status>) {
        self.paints += 1;
        let unknown = statuses.values().filter(|s| s.is_unknown()).count();
        info!(
            entities = statuses.len(),
            unknown = unknown,
            paint = self.paints,
            "Current statuses"
        );
        for (entity_id, status) in statuses {
            debug!(entity = %entity_id, status = %status, "Status");
        }
    }

    fn paint_history(&mut self, history: &BTreeMap<EntityId, HistorySeries>) {
        let samples = history.values().next().map(Vec::len).unwrap_or(0);
        debug!(entities = history.len(), samples = samples, "History updated");
    }

    fn paint_indicator(&mut self, indicator: &ConnectionIndicator) {
        info!("{}", indicator);
    }
}
