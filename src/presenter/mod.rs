// Display boundary: the core hands data to a Presenter and never draws itself

mod console;
mod logging;

pub use console::ConsolePresenter;
pub use logging::LogPresenter;

use crate::history::HistorySeries;
use crate::snapshot::{EntityId, Status};
use chrono::{DateTime, Local, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Paints the diagram from data supplied by the connection manager.
///
/// Calls are synchronous and display-only; nothing passed in is retained by
/// the core after the call returns.
pub trait Presenter {
    /// Current status of every known entity, unknown if absent from the snapshot
    fn paint_current(&mut self, statuses: &BTreeMap<EntityId, Status>);

    /// Full history of every known entity, called after each recorded snapshot
    fn paint_history(&mut self, _history: &BTreeMap<EntityId, HistorySeries>) {}

    /// Connection banner ("Last update" / "Disconnected since")
    fn paint_indicator(&mut self, _indicator: &ConnectionIndicator) {}
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn paint_current(&mut self, statuses: &BTreeMap<EntityId, Status>) {
        (**self).paint_current(statuses)
    }

    fn paint_history(&mut self, history: &BTreeMap<EntityId, HistorySeries>) {
        (**self).paint_history(history)
    }

    fn paint_indicator(&mut self, indicator: &ConnectionIndicator) {
        (**self).paint_indicator(indicator)
    }
}

/// Visible connection state shown next to the diagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionIndicator {
    LastUpdate(DateTime<Utc>),
    DisconnectedSince(DateTime<Utc>),
}

impl fmt::Display for ConnectionIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionIndicator::LastUpdate(at) => {
                write!(f, "Last update: {}", at.with_timezone(&Local).format("%H:%M:%S"))
            }
            ConnectionIndicator::DisconnectedSince(at) => write!(
                f,
                "Disconnected since: {}",
                at.with_timezone(&Local).format("%H:%M:%S")
            ),
        }
    }
}
