use super::*;
use crate::history::{HistorySeries, InitializationError};
use crate::presenter::{ConnectionIndicator, Presenter};
use crate::snapshot::{EntityId, Status};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

const TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Default)]
struct RecordingPresenter {
    painted: Vec<BTreeMap<EntityId, Status>>,
    history_paints: usize,
    indicators: Vec<ConnectionIndicator>,
}

impl RecordingPresenter {
    fn disconnects(&self) -> usize {
        self.indicators
            .iter()
            .filter(|i| matches!(i, ConnectionIndicator::DisconnectedSince(_)))
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn paint_current(&mut self, statuses: &BTreeMap<EntityId, Status>) {
        self.painted.push(statuses.clone());
    }

    fn paint_history(&mut self, _history: &BTreeMap<EntityId, HistorySeries>) {
        self.history_paints += 1;
    }

    fn paint_indicator(&mut self, indicator: &ConnectionIndicator) {
        self.indicators.push(*indicator);
    }
}

fn manager(entities: &[&str]) -> ConnectionManager<RecordingPresenter> {
    let mut manager = ConnectionManager::new(RecordingPresenter::default(), TIMEOUT);
    manager.initialize(entities.iter().copied()).unwrap();
    manager
}

/// Manager that has applied one snapshot and is `Connected`
fn connected(start: Instant) -> (ConnectionManager<RecordingPresenter>, u64) {
    let mut manager = manager(&["A", "B"]);
    let generation = manager.connect(start).unwrap();
    manager
        .on_progress(generation, br#"{"timestamp":1,"A":"green"}"#, start)
        .unwrap();
    assert_eq!(manager.state(), ConnectionState::Connected);
    (manager, generation)
}

#[test]
fn test_starts_disconnected() {
    let manager = manager(&["A"]);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.generation(), 0);
    assert!(manager.reconnect_at().is_none());
    assert!(manager.disconnected_since().is_none());
}

#[test]
fn test_connect_arms_watchdog() {
    let start = Instant::now();
    let mut manager = manager(&["A"]);

    let generation = manager.connect(start).unwrap();

    assert_eq!(generation, 1);
    assert!(manager.is_current(generation));
    assert_eq!(manager.watchdog().deadline(), Some(start + TIMEOUT));
    // connected only once a snapshot arrives
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}

#[test]
fn test_connect_before_initialize_fails() {
    let mut manager = ConnectionManager::new(RecordingPresenter::default(), TIMEOUT);
    assert_eq!(
        manager.connect(Instant::now()),
        Err(InitializationError::NotInitialized)
    );
}

#[test]
fn test_initialize_twice_fails() {
    let mut manager = manager(&["A"]);
    assert_eq!(
        manager.initialize(["B"]),
        Err(InitializationError::AlreadyInitialized)
    );
}

#[test]
fn test_latest_snapshot_applied() {
    let start = Instant::now();
    let mut manager = manager(&["A", "B"]);
    let generation = manager.connect(start).unwrap();

    manager
        .on_progress(
            generation,
            br#"{"timestamp":1,"A":"red"}{"timestamp":2,"A":"green","B":"blue"}"#,
            start,
        )
        .unwrap();

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.last_update().is_some());

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history.series("A").unwrap()[0].timestamp, 2);
    assert_eq!(history.series("A").unwrap()[0].status, Status::new("green"));
    assert_eq!(history.series("B").unwrap()[0].status, Status::new("blue"));

    let presenter = manager.presenter();
    assert_eq!(presenter.painted.len(), 1);
    assert_eq!(presenter.history_paints, 1);
    assert!(matches!(
        presenter.indicators.last(),
        Some(ConnectionIndicator::LastUpdate(_))
    ));
}

#[test]
fn test_absent_entity_painted_unknown() {
    let start = Instant::now();
    let mut manager = manager(&["A", "B"]);
    let generation = manager.connect(start).unwrap();

    manager
        .on_progress(generation, br#"{"timestamp":3,"A":"red"}"#, start)
        .unwrap();

    let painted = &manager.presenter().painted[0];
    assert_eq!(painted["A"], Status::new("red"));
    assert_eq!(painted["B"], Status::Unknown);
    assert_eq!(manager.history().series("B").unwrap()[0].status, Status::Unknown);
}

#[test]
fn test_byte_by_byte_delivery_applies_each_snapshot_once() {
    let start = Instant::now();
    let mut manager = manager(&["A", "B"]);
    let generation = manager.connect(start).unwrap();
    let body = br#"{"timestamp":1,"A":"red"}{"timestamp":2,"A":"green","B":"blue"}"#;

    for byte in body.iter() {
        manager
            .on_progress(generation, std::slice::from_ref(byte), start)
            .unwrap();
    }

    assert_eq!(manager.presenter().painted.len(), 2);
    assert_eq!(manager.history().len(), 2);
    let series = manager.history().series("A").unwrap();
    assert_eq!(series[0].status, Status::new("red"));
    assert_eq!(series[1].status, Status::new("green"));
}

#[test]
fn test_incomplete_progress_keeps_state() {
    let start = Instant::now();
    let mut manager = manager(&["A"]);
    let generation = manager.connect(start).unwrap();

    manager
        .on_progress(generation, br#"{"timestamp":1,"A":"gr"#, start)
        .unwrap();

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(manager.is_current(generation));
    assert!(manager.reconnect_at().is_none());
    assert!(manager.presenter().painted.is_empty());
}

#[test]
fn test_partial_next_snapshot_does_not_repaint() {
    let (mut manager, generation) = connected(Instant::now());

    manager
        .on_progress(generation, br#"{"timestamp":2,"A":"#, Instant::now())
        .unwrap();

    assert_eq!(manager.presenter().painted.len(), 1);
    assert_eq!(manager.history().len(), 1);
}

#[test]
fn test_buffer_compacted_after_apply() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);

    for timestamp in 2..50 {
        let chunk = format!(r#"{{"timestamp":{},"A":"red"}}"#, timestamp);
        manager
            .on_progress(generation, chunk.as_bytes(), start)
            .unwrap();
    }

    assert_eq!(manager.history().len(), 49);
    assert_eq!(manager.buffered_len(), r#"{"timestamp":49,"A":"red"}"#.len());
}

#[test]
fn test_progress_rearms_watchdog() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);

    manager
        .on_progress(generation, b"{", start + Duration::from_millis(80))
        .unwrap();
    manager.on_watchdog(start + Duration::from_millis(150));

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.is_current(generation));
}

#[test]
fn test_watchdog_disconnects_once() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);

    manager.on_watchdog(start + TIMEOUT);
    manager.on_watchdog(start + TIMEOUT * 3);

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!manager.is_current(generation));
    assert_eq!(manager.reconnect_at(), Some(start + TIMEOUT * 2));
    assert_eq!(manager.presenter().disconnects(), 1);
}

#[test]
fn test_disconnect_is_idempotent() {
    let start = Instant::now();
    let (mut manager, _) = connected(start);

    manager.disconnect(start);
    let since = manager.disconnected_since();
    let reconnect_at = manager.reconnect_at();

    manager.disconnect(start + Duration::from_millis(30));

    assert_eq!(manager.disconnected_since(), since);
    assert_eq!(manager.reconnect_at(), reconnect_at);
    assert_eq!(reconnect_at, Some(start + TIMEOUT));
    assert_eq!(manager.presenter().disconnects(), 1);
}

#[test]
fn test_request_error_while_connected() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);

    manager.on_request_error(
        generation,
        RequestError::Transport("connection reset".into()),
        start,
    );

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.reconnect_at(), Some(start + TIMEOUT));
    assert!(!manager.watchdog().is_armed());
    assert_eq!(manager.presenter().painted.len(), 1);
    assert_eq!(manager.presenter().disconnects(), 1);
}

#[test]
fn test_decode_error_while_connected() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);

    manager
        .on_progress(generation, br#"{"timestamp":2,"A":}"#, start)
        .unwrap();

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.presenter().painted.len(), 1);
    assert_eq!(manager.history().len(), 1);
    assert_eq!(manager.reconnect_at(), Some(start + TIMEOUT));
}

#[test]
fn test_first_request_failure_schedules_retry() {
    let start = Instant::now();
    let mut manager = manager(&["A"]);
    let generation = manager.connect(start).unwrap();

    manager.on_request_error(generation, RequestError::Status(503), start);
    // a second signal from the same request is stale
    manager.on_complete(generation, start + Duration::from_millis(5));

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(manager.reconnect_at(), Some(start + TIMEOUT));
    assert!(manager.disconnected_since().is_some());
    assert_eq!(manager.presenter().disconnects(), 1);
}

#[test]
fn test_repeated_failures_keep_original_disconnect_time() {
    let start = Instant::now();
    let mut manager = manager(&["A"]);

    let first = manager.connect(start).unwrap();
    manager.on_request_error(first, RequestError::Transport("refused".into()), start);
    let since = manager.disconnected_since();

    let retry_at = start + TIMEOUT;
    let second = manager.connect(retry_at).unwrap();
    manager.on_request_error(second, RequestError::Transport("refused".into()), retry_at);

    assert_eq!(manager.disconnected_since(), since);
    assert_eq!(manager.reconnect_at(), Some(retry_at + TIMEOUT));
    assert_eq!(manager.presenter().disconnects(), 1);
}

#[test]
fn test_stale_generation_ignored() {
    let start = Instant::now();
    let mut manager = manager(&["A"]);
    let old = manager.connect(start).unwrap();
    let new = manager.connect(start).unwrap();
    assert_ne!(old, new);

    manager
        .on_progress(old, br#"{"timestamp":1,"A":"red"}"#, start)
        .unwrap();
    manager.on_request_error(old, RequestError::Status(500), start);
    manager.on_complete(old, start);

    assert!(manager.presenter().painted.is_empty());
    assert!(manager.reconnect_at().is_none());
    assert!(manager.is_current(new));
}

#[test]
fn test_reconnect_resets_buffer() {
    let start = Instant::now();
    let mut manager = manager(&["A"]);
    let first = manager.connect(start).unwrap();
    manager
        .on_progress(first, br#"{"timestamp":1,"A":"re"#, start)
        .unwrap();

    let second = manager.connect(start).unwrap();
    manager
        .on_progress(second, br#"{"timestamp":2,"A":"green"}"#, start)
        .unwrap();

    assert_eq!(manager.history().series("A").unwrap()[0].timestamp, 2);
}

#[test]
fn test_completed_request_reissued_immediately() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);
    let end = start + Duration::from_millis(40);

    manager.on_complete(generation, end);

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(manager.reconnect_at(), Some(end));
    assert!(!manager.is_current(generation));
}

#[test]
fn test_empty_response_is_failure() {
    let start = Instant::now();
    let mut manager = manager(&["A"]);
    let generation = manager.connect(start).unwrap();

    manager.on_complete(generation, start);

    assert_eq!(manager.reconnect_at(), Some(start + TIMEOUT));
    assert_eq!(manager.presenter().disconnects(), 1);
}

#[test]
fn test_reconnect_after_disconnect_restores_connected() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);
    manager.on_watchdog(start + TIMEOUT);

    let retry_at = manager.reconnect_at().unwrap();
    let generation_2 = manager.connect(retry_at).unwrap();
    assert!(generation_2 > generation);
    manager
        .on_progress(generation_2, br#"{"timestamp":9,"B":"red"}"#, retry_at)
        .unwrap();

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.disconnected_since().is_none());
    assert!(manager.reconnect_at().is_none());
    assert_eq!(manager.history().len(), 2);
}

#[test]
fn test_older_snapshot_painted_but_not_recorded() {
    let start = Instant::now();
    let (mut manager, _) = connected(start);
    manager.disconnect(start);

    let generation = manager.connect(start + TIMEOUT).unwrap();
    manager
        .on_progress(generation, br#"{"timestamp":0,"A":"red"}"#, start + TIMEOUT)
        .unwrap();

    assert_eq!(manager.presenter().painted.len(), 2);
    assert_eq!(manager.presenter().history_paints, 1);
    assert_eq!(manager.history().len(), 1);
}

#[test]
fn test_shutdown_cancels_timers() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);
    manager.disconnect(start);

    manager.shutdown();

    assert!(manager.reconnect_at().is_none());
    assert!(!manager.watchdog().is_armed());
    assert!(!manager.is_current(generation));
}

#[test]
fn test_repeated_snapshot_recorded_once() {
    let start = Instant::now();
    let mut manager = manager(&["A", "B"]);
    let generation = manager.connect(start).unwrap();
    let chunk = br#"{"timestamp":7,"A":"green"}"#;

    for tick in 0..100u64 {
        manager
            .on_progress(generation, chunk, start + Duration::from_millis(tick * 10))
            .unwrap();
    }

    let presenter = manager.presenter();
    assert_eq!(presenter.painted.len(), 1);
    assert_eq!(presenter.history_paints, 1);
    assert_eq!(manager.history().len(), 1);
    assert_eq!(manager.buffered_len(), chunk.len());
    assert_eq!(
        manager.watchdog().deadline(),
        Some(start + Duration::from_millis(990) + TIMEOUT)
    );
}

#[test]
fn test_unchanged_snapshot_after_reconnect_restores_connected() {
    let start = Instant::now();
    let (mut manager, _) = connected(start);
    manager.on_watchdog(start + TIMEOUT);
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    let retry_at = manager.reconnect_at().unwrap();
    let generation = manager.connect(retry_at).unwrap();
    manager
        .on_progress(generation, br#"{"timestamp":1,"A":"green"}"#, retry_at)
        .unwrap();

    assert_eq!(manager.state(), ConnectionState::Connected);
    assert!(manager.disconnected_since().is_none());
    assert_eq!(manager.history().len(), 1);
    let presenter = manager.presenter();
    assert_eq!(presenter.painted.len(), 1);
    assert!(matches!(
        presenter.indicators.last(),
        Some(ConnectionIndicator::LastUpdate(_))
    ));
}

#[test]
fn test_same_timestamp_with_new_statuses_recorded() {
    let start = Instant::now();
    let (mut manager, generation) = connected(start);

    manager
        .on_progress(generation, br#"{"timestamp":1,"A":"red"}"#, start)
        .unwrap();

    assert_eq!(manager.presenter().painted.len(), 2);
    assert_eq!(manager.history().len(), 2);
    assert_eq!(manager.history().series("A").unwrap()[1].status, Status::new("red"));
}
