use crate::snapshot::{now_nanos, NodeState, Snapshot, Status};
use crate::state::StatusBoard;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Publish random node states for the board's entities every `interval_ms`.
///
/// Roughly one in five entities is left out of each snapshot so clients see
/// unknown samples too. Runs until the task is cancelled.
pub async fn run_demo_feed(board: Arc<StatusBoard>, interval_ms: u64) {
    info!(
        entities = board.entities().len(),
        interval_ms = interval_ms,
        "Starting demo status feed"
    );

    let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        board.publish(random_snapshot(&board));
    }
}

fn random_snapshot(board: &StatusBoard) -> Snapshot {
    let mut rng = rand::thread_rng();
    let mut snapshot = Snapshot::new(now_nanos());
    for entity_id in board.entities() {
        if rng.gen_bool(0.2) {
            continue;
        }
        if let Some(state) = NodeState::ALL.choose(&mut rng) {
            snapshot
                .statuses
                .insert(entity_id.clone(), Status::new(state.color()));
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_snapshot_uses_board_entities_and_state_colors() {
        let board = StatusBoard::new((0..50).map(|i| i.to_string()).collect());

        let snapshot = random_snapshot(&board);

        assert!(snapshot.timestamp > 0);
        for (entity_id, status) in &snapshot.statuses {
            assert!(board.entities().contains(entity_id));
            assert!(NodeState::from_color(status.color()).is_some());
        }
    }
}
