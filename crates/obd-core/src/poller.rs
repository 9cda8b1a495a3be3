//! Live Polling Controller
//!
//! Owns one cancellable repeating schedule. Every tick spawns a single live-snapshot
//! request; requests are not awaited by the schedule, so a slow backend never delays the
//! next tick and whichever response lands last is what the dashboard shows.

use crate::gateway::BackendGateway;
use crate::state::DashboardState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Advisory shown while the live feed is unreachable.
pub const LIVE_ERROR_MESSAGE: &str = "Connexion au flux OBD simulé perdue";

struct PollingSession {
    cancel: CancellationToken,
    generation: u64,
}

/// Fixed-period live snapshot poller. At most one schedule is ever active.
pub struct LivePoller {
    gateway: Arc<dyn BackendGateway>,
    state: Arc<DashboardState>,
    period: Duration,
    session: Mutex<Option<PollingSession>>,
    generations: AtomicU64,
    ticks: Arc<AtomicU64>,
}

impl LivePoller {
    pub fn new(gateway: Arc<dyn BackendGateway>, state: Arc<DashboardState>, period: Duration) -> Self {
        Self {
            gateway,
            state,
            period,
            session: Mutex::new(None),
            generations: AtomicU64::new(0),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Ticks fired since construction, across all sessions.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// (Re)start polling. Any running schedule is torn down first. The first request is
    /// issued on the first tick, then one per period. Must be called inside a tokio runtime.
    pub fn start(&self) {
        let mut session = self.lock();
        if let Some(previous) = session.take() {
            previous.cancel.cancel();
            debug!(generation = previous.generation, "Replacing live polling schedule");
        }

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *session = Some(PollingSession {
            cancel: cancel.clone(),
            generation,
        });
        // Published under the session lock so the flag always matches the schedule.
        self.state.set_polling(true);
        drop(session);

        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);
        let ticks = Arc::clone(&self.ticks);
        let period = self.period;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
                        let gateway = Arc::clone(&gateway);
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            poll_once(gateway.as_ref(), &state, tick).await;
                        });
                    }
                }
            }

            debug!(generation, "Live polling schedule ended");
        });

        info!(generation, period_ms = period.as_millis() as u64, "Live polling started");
    }

    /// Cancel future ticks. Requests already in flight still complete and may publish.
    pub fn stop(&self) {
        let mut guard = self.lock();
        if let Some(session) = guard.take() {
            session.cancel.cancel();
            self.state.set_polling(false);
            drop(guard);
            info!(generation = session.generation, "Live polling stopped");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<PollingSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LivePoller {
    fn drop(&mut self) {
        let session = self.session.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = session.take() {
            session.cancel.cancel();
        }
    }
}

/// One tick's request. A failure only raises the advisory; the schedule keeps going.
async fn poll_once(gateway: &dyn BackendGateway, state: &DashboardState, tick: u64) {
    match gateway.fetch_live_snapshot().await {
        Ok(snapshot) => {
            debug!(tick, "Live snapshot received");
            state.publish_live(snapshot);
        }
        Err(e) => {
            warn!(tick, error = %e, "Live snapshot failed");
            state.set_live_error(LIVE_ERROR_MESSAGE);
        }
    }
}
