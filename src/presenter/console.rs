use super::{ConnectionIndicator, Presenter};
use crate::history::HistorySeries;
use crate::snapshot::{EntityId, NodeState, Status};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::warn;

/// Plain-text presenter writing one line per entity.
///
/// History is drawn as a strip of the newest `history_width` samples, one
/// glyph per sample.
pub struct ConsolePresenter<W: Write> {
    out: W,
    history_width: usize,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W, history_width: usize) -> Self {
        Self { out, history_width }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{}", line))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "Failed to write to console");
        }
    }
}

/// Single-character rendering of a status for the history strip
pub fn glyph(status: &Status) -> char {
    match status {
        Status::Unknown => '.',
        Status::Value(color) => match NodeState::from_color(color) {
            Some(NodeState::Idle) => 'I',
            Some(NodeState::Running) => 'R',
            Some(NodeState::Success) => 'S',
            Some(NodeState::Failure) => 'F',
            None => '?',
        },
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn paint_current(&mut self, statuses: &BTreeMap<EntityId, Status>) {
        let lines: Vec<String> = statuses
            .iter()
            .map(|(id, status)| {
                let label = NodeState::from_color(status.color())
                    .map(|state| state.name().to_string())
                    .unwrap_or_else(|| status.to_string());
                format!("  {:<12} {}", id, label)
            })
            .collect();
        self.write_lines(&lines);
    }

    fn paint_history(&mut self, history: &BTreeMap<EntityId, HistorySeries>) {
        let lines: Vec<String> = history
            .iter()
            .map(|(id, series)| {
                let skip = series.len().saturating_sub(self.history_width);
                let strip: String = series[skip..].iter().map(|s| glyph(&s.status)).collect();
                format!("  {:<12} {}", id, strip)
            })
            .collect();
        self.write_lines(&lines);
    }

    fn paint_indicator(&mut self, indicator: &ConnectionIndicator) {
        self.write_lines(&[indicator.to_string()]);
    }
}
