use super::{ConnectionState, RequestError};
use crate::history::{HistoryStore, InitializationError};
use crate::presenter::{ConnectionIndicator, Presenter};
use crate::snapshot::{decode_latest, DecodeError, EntityId, Snapshot};
use crate::watchdog::Watchdog;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why the current request was abandoned
#[derive(Debug)]
enum Failure {
    Stalled(Duration),
    Request(RequestError),
    Decode(DecodeError),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Stalled(timeout) => write!(f, "no progress within {:?}", timeout),
            Failure::Request(e) => write!(f, "{}", e),
            Failure::Decode(e) => write!(f, "{}", e),
        }
    }
}

/// Event-driven core of the live client.
///
/// Owns the connection state, the request buffer, the watchdog and the
/// history. It performs no I/O: the driver feeds it request events tagged
/// with the generation returned by `connect`, fires the watchdog, and opens
/// a new request whenever `reconnect_at` comes due. Events carrying any
/// other generation are stale and ignored.
pub struct ConnectionManager<P> {
    state: ConnectionState,
    presenter: P,
    history: HistoryStore,
    watchdog: Watchdog,

    /// Generation of the newest request
    generation: u64,
    /// The newest request is still expected to deliver events
    in_flight: bool,
    /// The newest request delivered at least one chunk
    received: bool,
    buffer: Vec<u8>,
    /// Last snapshot handed to history and presenter, kept across requests
    last_applied: Option<Snapshot>,

    reconnect_at: Option<Instant>,
    last_update: Option<DateTime<Utc>>,
    disconnected_since: Option<DateTime<Utc>>,
}

impl<P: Presenter> ConnectionManager<P> {
    /// `watchdog_timeout` is both the liveness window and the retry delay
    pub fn new(presenter: P, watchdog_timeout: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            presenter,
            history: HistoryStore::new(),
            watchdog: Watchdog::new(watchdog_timeout),
            generation: 0,
            in_flight: false,
            received: false,
            buffer: Vec::new(),
            last_applied: None,
            reconnect_at: None,
            last_update: None,
            disconnected_since: None,
        }
    }

    /// Fix the tracked entity set. Must happen once, before `connect`.
    pub fn initialize<I, S>(&mut self, entity_ids: I) -> Result<(), InitializationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        self.history.initialize(entity_ids)
    }

    /// Start a new request and return its generation.
    ///
    /// Any request still in flight is superseded; its late events are
    /// ignored from now on.
    pub fn connect(&mut self, now: Instant) -> Result<u64, InitializationError> {
        if !self.history.is_initialized() {
            return Err(InitializationError::NotInitialized);
        }

        self.generation += 1;
        self.in_flight = true;
        self.received = false;
        self.buffer.clear();
        self.reconnect_at = None;
        self.watchdog.arm(now);

        debug!(generation = self.generation, state = ?self.state, "Opening status request");
        Ok(self.generation)
    }

    /// Bytes received on a request
    pub fn on_progress(
        &mut self,
        generation: u64,
        chunk: &[u8],
        now: Instant,
    ) -> Result<(), InitializationError> {
        if !self.is_current(generation) {
            debug!(generation = generation, "Ignoring progress from stale request");
            return Ok(());
        }

        self.received = true;
        self.buffer.extend_from_slice(chunk);
        self.watchdog.arm(now);
        debug!(
            generation = generation,
            chunk = chunk.len(),
            buffered = self.buffer.len(),
            "Progress"
        );

        match decode_latest(&self.buffer) {
            Ok(decoded) => {
                // only the newest snapshot can matter from here on
                self.buffer.drain(..decoded.offset);
                if self.last_applied.as_ref() == Some(&decoded.snapshot) {
                    // servers re-send the latest snapshot on every tick
                    self.mark_connected();
                    return Ok(());
                }
                self.apply(decoded.snapshot)?;
            }
            Err(e) if e.is_incomplete() => {}
            Err(e) => self.fail(Failure::Decode(e), now),
        }
        Ok(())
    }

    /// A request failed at the transport level
    pub fn on_request_error(&mut self, generation: u64, error: RequestError, now: Instant) {
        if !self.is_current(generation) {
            debug!(generation = generation, error = %error, "Ignoring error from stale request");
            return;
        }
        self.fail(Failure::Request(error), now);
    }

    /// A request ended normally.
    ///
    /// A request that delivered data is replaced right away; one that ended
    /// empty counts as a failure so a misbehaving server is not hammered.
    pub fn on_complete(&mut self, generation: u64, now: Instant) {
        if !self.is_current(generation) {
            return;
        }
        if !self.received {
            self.fail(Failure::Request(RequestError::EmptyResponse), now);
            return;
        }
        info!(generation = generation, "Status stream ended, reissuing request");
        self.in_flight = false;
        self.reconnect_at = Some(now);
    }

    /// Watchdog deadline reached; does nothing if progress re-armed it
    pub fn on_watchdog(&mut self, now: Instant) {
        if !self.watchdog.fire(now) || !self.in_flight {
            return;
        }
        self.fail(Failure::Stalled(self.watchdog.timeout()), now);
    }

    /// Drop to `Disconnected` and schedule a reconnect after the watchdog
    /// interval. A no-op when already disconnected.
    pub fn disconnect(&mut self, now: Instant) {
        if self.state == ConnectionState::Disconnected {
            debug!("Already disconnected");
            return;
        }

        self.state = ConnectionState::Disconnected;
        self.in_flight = false;
        self.watchdog.cancel();
        self.mark_disconnected();
        self.reconnect_at = Some(now + self.watchdog.timeout());

        info!(
            generation = self.generation,
            retry_in_ms = self.watchdog.timeout().as_millis() as u64,
            "Disconnected"
        );
    }

    /// Stop expecting events and cancel any pending timers
    pub fn shutdown(&mut self) {
        self.in_flight = false;
        self.watchdog.cancel();
        self.reconnect_at = None;
    }

    /// Whether events tagged with `generation` are still wanted
    pub fn is_current(&self, generation: u64) -> bool {
        self.in_flight && generation == self.generation
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn disconnected_since(&self) -> Option<DateTime<Utc>> {
        self.disconnected_since
    }

    /// Bytes held for the current request
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn apply(&mut self, snapshot: Snapshot) -> Result<(), InitializationError> {
        let recorded = self.history.apply(&snapshot)?;
        let current = self.history.current(&snapshot);
        self.last_applied = Some(snapshot);

        if self.state == ConnectionState::Disconnected {
            info!(generation = self.generation, "Connected");
        }
        self.state = ConnectionState::Connected;
        self.disconnected_since = None;

        self.presenter.paint_current(&current);
        if recorded {
            self.presenter.paint_history(self.history.all());
        }

        let at = Utc::now();
        self.last_update = Some(at);
        self.presenter
            .paint_indicator(&ConnectionIndicator::LastUpdate(at));
        Ok(())
    }

    /// Link is alive again but the data is unchanged: restore the banner only
    fn mark_connected(&mut self) {
        if self.state == ConnectionState::Connected {
            return;
        }
        info!(generation = self.generation, "Connected, snapshot unchanged");
        self.state = ConnectionState::Connected;
        self.disconnected_since = None;

        let at = Utc::now();
        self.last_update = Some(at);
        self.presenter
            .paint_indicator(&ConnectionIndicator::LastUpdate(at));
    }

    /// Abandon the current request and make sure exactly one retry is pending
    fn fail(&mut self, failure: Failure, now: Instant) {
        warn!(generation = self.generation, error = %failure, "Status request failed");
        self.in_flight = false;
        self.watchdog.cancel();

        match self.state {
            ConnectionState::Connected => self.disconnect(now),
            ConnectionState::Disconnected => {
                // never connected yet, or already waiting to retry
                if self.disconnected_since.is_none() {
                    self.mark_disconnected();
                }
                if self.reconnect_at.is_none() {
                    self.reconnect_at = Some(now + self.watchdog.timeout());
                }
            }
        }
    }

    fn mark_disconnected(&mut self) {
        let at = Utc::now();
        self.disconnected_since = Some(at);
        self.presenter
            .paint_indicator(&ConnectionIndicator::DisconnectedSince(at));
    }
}
