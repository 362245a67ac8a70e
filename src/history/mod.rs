use crate::snapshot::{EntityId, Snapshot, Status};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};


/// Contract violations of the history store. Never retried.
#[derive(Debug, Clone, PartialEq)]
pub enum InitializationError {
    /// `apply` was called before `initialize`
    NotInitialized,
    /// `initialize` was called a second time
    AlreadyInitialized,
}

impl fmt::Display for InitializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializationError::NotInitialized => {
                write!(f, "history store used before initialize")
            }
            InitializationError::AlreadyInitialized => {
                write!(f, "history store initialized twice")
            }
        }
    }
}

impl std::error::Error for InitializationError {}

/// One recorded status at a server timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySample {
    pub timestamp: i64,
    pub status: Status,
}

/// Time-ordered samples of one entity
pub type HistorySeries = Vec<HistorySample>;

/// Per-entity append-only status history.
///
/// The entity set is fixed at `initialize`; every `apply` appends exactly one
/// sample to every series, so all series always have the same length.
/// Nothing is ever evicted.
#[derive(Debug, Default)]
pub struct HistoryStore {
    series: Option<BTreeMap<EntityId, HistorySeries>>,
    last_timestamp: Option<i64>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one empty series per entity.
    ///
    /// A second call fails with `AlreadyInitialized` and leaves the existing
    /// series untouched.
    pub fn initialize<I, S>(&mut self, entity_ids: I) -> Result<(), InitializationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        if self.series.is_some() {
            return Err(InitializationError::AlreadyInitialized);
        }

        let series: BTreeMap<EntityId, HistorySeries> = entity_ids
            .into_iter()
            .map(|id| (id.into(), HistorySeries::new()))
            .collect();

        debug!(entities = series.len(), "History store initialized");
        self.series = Some(series);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.series.is_some()
    }

    /// Append one sample per known entity.
    ///
    /// Entities missing from the snapshot get `Status::Unknown`. A snapshot
    /// older than the last recorded one is not appended and `Ok(false)` is
    /// returned, keeping every series non-decreasing in time.
    pub fn apply(&mut self, snapshot: &Snapshot) -> Result<bool, InitializationError> {
        let series = self
            .series
            .as_mut()
            .ok_or(InitializationError::NotInitialized)?;

        if let Some(last) = self.last_timestamp {
            if snapshot.timestamp < last {
                warn!(
                    timestamp = snapshot.timestamp,
                    last_timestamp = last,
                    "Snapshot older than history, not recorded"
                );
                return Ok(false);
            }
        }

        for (entity_id, samples) in series.iter_mut() {
            samples.push(HistorySample {
                timestamp: snapshot.timestamp,
                status: snapshot.status_of(entity_id),
            });
        }
        self.last_timestamp = Some(snapshot.timestamp);

        Ok(true)
    }

    /// Status of every known entity in the given snapshot, unknown if absent
    pub fn current(&self, snapshot: &Snapshot) -> BTreeMap<EntityId, Status> {
        self.entity_ids()
            .map(|id| (id.clone(), snapshot.status_of(id)))
            .collect()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.series.iter().flat_map(|series| series.keys())
    }

    pub fn series(&self, entity_id: &str) -> Option<&HistorySeries> {
        self.series.as_ref().and_then(|series| series.get(entity_id))
    }

    /// All series, empty before `initialize`
    pub fn all(&self) -> &BTreeMap<EntityId, HistorySeries> {
        static EMPTY: BTreeMap<EntityId, HistorySeries> = BTreeMap::new();
        self.series.as_ref().unwrap_or(&EMPTY)
    }

    /// Number of samples in every series
    pub fn len(&self) -> usize {
        self.all().values().next().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
