use super::{ChunkStream, ConnectionManager, RequestError, Transport};
use crate::presenter::Presenter;
use anyhow::{Context, Result};
use futures::StreamExt;
use std::future::Future;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::info;

/// The request the manager currently expects events from
struct ActiveRequest {
    generation: u64,
    chunks: ChunkStream,
}

/// Drives a `ConnectionManager` with real I/O and timers.
///
/// Single task: request events, the watchdog and the reconnect timer are
/// serialized through one `select!` loop, so the manager is never touched
/// concurrently.
pub struct LiveClient<T, P> {
    transport: T,
    manager: ConnectionManager<P>,
}

impl<T, P> LiveClient<T, P>
where
    T: Transport,
    P: Presenter + Send + 'static,
{
    /// `manager` must already be initialized with the tracked entities
    pub fn new(transport: T, manager: ConnectionManager<P>) -> Self {
        Self { transport, manager }
    }

    /// Run on a background task until `ClientHandle::stop`
    pub fn start(self) -> ClientHandle<P> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run_until(async {
            let _ = stop_rx.await;
        }));
        ClientHandle { stop_tx, task }
    }

    /// Run until `shutdown` resolves, then hand the manager back.
    ///
    /// Returns early only on an initialization error, which is fatal.
    pub async fn run_until<F: Future>(self, shutdown: F) -> Result<ConnectionManager<P>> {
        let LiveClient {
            transport,
            mut manager,
        } = self;
        tokio::pin!(shutdown);

        let generation = manager.connect(Instant::now())?;
        let mut request = Some(ActiveRequest {
            generation,
            chunks: transport.open(),
        });

        loop {
            let reconnect_at = manager.reconnect_at();

            tokio::select! {
                _ = &mut shutdown => break,

                (generation, event) = next_event(&mut request) => {
                    let now = Instant::now();
                    match event {
                        Some(Ok(chunk)) => manager.on_progress(generation, &chunk, now)?,
                        Some(Err(e)) => manager.on_request_error(generation, e, now),
                        None => manager.on_complete(generation, now),
                    }
                }

                _ = manager.watchdog().expired() => {
                    manager.on_watchdog(Instant::now());
                }

                _ = sleep_until_due(reconnect_at) => {
                    let generation = manager.connect(Instant::now())?;
                    request = Some(ActiveRequest {
                        generation,
                        chunks: transport.open(),
                    });
                }
            }

            // drop (and so abort) a request the manager gave up on
            if let Some(active) = &request {
                if !manager.is_current(active.generation) {
                    request = None;
                }
            }
        }

        info!(generation = manager.generation(), "Live client stopped");
        manager.shutdown();
        Ok(manager)
    }
}

async fn next_event(
    request: &mut Option<ActiveRequest>,
) -> (u64, Option<Result<Vec<u8>, RequestError>>) {
    match request {
        Some(active) => (active.generation, active.chunks.next().await),
        None => std::future::pending().await,
    }
}

async fn sleep_until_due(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Handle to a client started with `LiveClient::start`
pub struct ClientHandle<P> {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<ConnectionManager<P>>>,
}

impl<P> ClientHandle<P> {
    /// Whether the client task has exited (stopped or failed)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the client and return its manager with the collected history
    pub async fn stop(self) -> Result<ConnectionManager<P>> {
        // the task may already have ended on a fatal error
        let _ = self.stop_tx.send(());
        self.task.await.context("Live client task panicked")?
    }
}
