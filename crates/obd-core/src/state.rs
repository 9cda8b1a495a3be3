//! Dashboard state shared between the lanes and the UI.
//!
//! Lanes write through the setters below; the UI reads a cloned [`DashboardView`] and can
//! subscribe to [`StateChange`] notifications to know when to redraw.

use crate::model::{ConversationTurn, DiagnosticCode, LiveSnapshot, PidCatalog};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// What part of the dashboard changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Live,
    LiveError,
    Polling,
    Pids,
    Diagnostics,
    Listening,
    Transcript,
    /// A question was sent; the previous answer is cleared.
    TurnPending,
    /// An answer (or the failure message) was published.
    Turn,
}

/// Render-ready copy of everything the dashboard shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub live: Option<LiveSnapshot>,
    pub live_updated_at: Option<DateTime<Utc>>,
    pub live_error: Option<String>,
    pub polling: bool,
    pub pids: PidCatalog,
    pub dtcs: Vec<DiagnosticCode>,
    pub listening: bool,
    pub transcript: String,
    pub turn: Option<ConversationTurn>,
    /// A dispatch is in flight and nothing is displayed yet.
    pub pending: bool,
}

struct Inner {
    view: DashboardView,
    // Sequence number of the most recently initiated dispatch.
    latest_dispatch: u64,
}

/// Shared dashboard state.
pub struct DashboardState {
    inner: Mutex<Inner>,
    changes: broadcast::Sender<StateChange>,
}

impl Default for DashboardState {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                view: DashboardView::default(),
                latest_dispatch: 0,
            }),
            changes,
        }
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive change notifications. Slow receivers may observe `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    pub fn view(&self) -> DashboardView {
        self.lock().view.clone()
    }

    /// Replace the snapshot wholesale and clear the connectivity advisory.
    pub fn publish_live(&self, snapshot: LiveSnapshot) {
        let had_error = {
            let mut inner = self.lock();
            inner.view.live = Some(snapshot);
            inner.view.live_updated_at = Some(Utc::now());
            inner.view.live_error.take().is_some()
        };
        self.notify(StateChange::Live);
        if had_error {
            self.notify(StateChange::LiveError);
        }
    }

    /// Raise the connectivity advisory. The last snapshot stays as it is.
    pub fn set_live_error(&self, message: impl Into<String>) {
        self.lock().view.live_error = Some(message.into());
        self.notify(StateChange::LiveError);
    }

    pub fn set_polling(&self, polling: bool) {
        self.lock().view.polling = polling;
        self.notify(StateChange::Polling);
    }

    pub fn set_pids(&self, pids: PidCatalog) {
        self.lock().view.pids = pids;
        self.notify(StateChange::Pids);
    }

    pub fn set_dtcs(&self, dtcs: Vec<DiagnosticCode>) {
        self.lock().view.dtcs = dtcs;
        self.notify(StateChange::Diagnostics);
    }

    pub fn set_listening(&self, listening: bool) {
        let changed = {
            let mut inner = self.lock();
            let changed = inner.view.listening != listening;
            inner.view.listening = listening;
            changed
        };
        if changed {
            self.notify(StateChange::Listening);
        }
    }

    pub fn set_transcript(&self, transcript: impl Into<String>) {
        self.lock().view.transcript = transcript.into();
        self.notify(StateChange::Transcript);
    }

    /// Start a dispatch: clear the displayed answer and return its sequence number.
    pub fn begin_turn(&self) -> u64 {
        let seq = {
            let mut inner = self.lock();
            inner.latest_dispatch += 1;
            inner.view.turn = None;
            inner.view.pending = true;
            inner.latest_dispatch
        };
        self.notify(StateChange::TurnPending);
        seq
    }

    /// Publish the outcome of dispatch `seq`, unless a newer dispatch has started since.
    /// Returns whether the turn was published.
    pub fn publish_turn(&self, seq: u64, turn: ConversationTurn) -> bool {
        {
            let mut inner = self.lock();
            if seq != inner.latest_dispatch {
                return false;
            }
            inner.view.turn = Some(turn);
            inner.view.pending = false;
        }
        self.notify(StateChange::Turn);
        true
    }

    fn notify(&self, change: StateChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
