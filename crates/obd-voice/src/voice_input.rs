//! Listening-session state machine
//!
//! `Idle → Listening → Idle`. Starting is only reachable from `Idle`, so two engines can
//! never be live at once. The engine's asynchronous callbacks are reduced to
//! [`SessionEvent`]s that the owner feeds back through [`VoiceInput::handle_event`].

use crate::recognition::{
    EventSink, RecognitionEngine, RecognitionEvent, RecognitionProvider, RecognitionSettings,
    SessionEvent,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Public view of the listening session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningState {
    Idle,
    Listening,
}

/// What a call to [`VoiceInput::toggle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A new session started with this id.
    Started { session: u64 },
    /// The active session was asked to stop.
    Stopped,
    /// No recognition capability on this host; still idle.
    Unsupported,
    /// The engine refused to start; still idle.
    Failed(String),
}

struct ListeningSession {
    state: ListeningState,
    engine: Option<Box<dyn RecognitionEngine>>,
    session: u64,
    // One transcript per session, even if the engine reports more.
    delivered: bool,
}

/// Voice input controller owning at most one recognition engine.
pub struct VoiceInput {
    provider: Arc<dyn RecognitionProvider>,
    settings: RecognitionSettings,
    inner: Mutex<ListeningSession>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl VoiceInput {
    /// Create a controller. Engine events arrive on the returned receiver and must be
    /// passed back to [`VoiceInput::handle_event`].
    pub fn new(
        provider: Arc<dyn RecognitionProvider>,
        settings: RecognitionSettings,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let input = Self {
            provider,
            settings,
            inner: Mutex::new(ListeningSession {
                state: ListeningState::Idle,
                engine: None,
                session: 0,
                delivered: false,
            }),
            event_tx,
        };

        (input, event_rx)
    }

    pub fn state(&self) -> ListeningState {
        self.lock().state
    }

    pub fn is_listening(&self) -> bool {
        self.state() == ListeningState::Listening
    }

    /// Id of the most recent session (0 before the first one).
    pub fn current_session(&self) -> u64 {
        self.lock().session
    }

    /// Start listening when idle, stop when listening.
    pub fn toggle(&self) -> ToggleOutcome {
        let mut guard = self.lock();

        if guard.state == ListeningState::Listening {
            Self::release(&mut guard);
            info!(session = guard.session, "Listening stopped by user");
            return ToggleOutcome::Stopped;
        }

        let Some(mut engine) = self.provider.acquire(&self.settings) else {
            warn!("Speech recognition unavailable on this host");
            return ToggleOutcome::Unsupported;
        };

        // Spent even when start fails: that engine's events stay stale.
        guard.session += 1;
        let session = guard.session;
        if let Err(e) = engine.start(EventSink::new(session, self.event_tx.clone())) {
            warn!(session, error = %e, "Recognition engine failed to start");
            return ToggleOutcome::Failed(e.to_string());
        }

        guard.state = ListeningState::Listening;
        guard.engine = Some(engine);
        guard.delivered = false;
        info!(session, locale = %self.settings.locale, "Listening started");

        ToggleOutcome::Started { session }
    }

    /// Stop the active session, if any. Safe to call when idle.
    pub fn stop(&self) {
        let mut guard = self.lock();
        if guard.state == ListeningState::Listening {
            Self::release(&mut guard);
            debug!(session = guard.session, "Listening stopped");
        }
    }

    /// Apply one engine event. Returns the transcript to forward, if this event produced one.
    ///
    /// Events from sessions other than the current one are ignored. A result is accepted
    /// until the session has delivered one, even after a user stop, because engines flush
    /// what they already heard when asked to stop.
    pub fn handle_event(&self, event: SessionEvent) -> Option<String> {
        let mut guard = self.lock();

        if event.session != guard.session {
            debug!(
                stale = event.session,
                current = guard.session,
                "Ignoring event from a previous listening session"
            );
            return None;
        }

        match event.event {
            RecognitionEvent::Result(_) if guard.delivered => {
                debug!(session = event.session, "Extra recognition result dropped");
                None
            }
            ref result @ RecognitionEvent::Result(_) => {
                let transcript = result.first_transcript()?.to_string();
                guard.delivered = true;
                info!(session = event.session, transcript = %transcript, "Speech recognized");
                Some(transcript)
            }
            RecognitionEvent::Error(message) => {
                warn!(session = event.session, error = %message, "Recognition error");
                Self::finish(&mut guard);
                None
            }
            RecognitionEvent::End => {
                Self::finish(&mut guard);
                None
            }
        }
    }

    fn release(session: &mut ListeningSession) {
        if let Some(mut engine) = session.engine.take() {
            engine.stop();
        }
        session.state = ListeningState::Idle;
    }

    fn finish(session: &mut ListeningSession) {
        // The engine already shut itself down; drop it without a second stop request.
        session.engine = None;
        session.state = ListeningState::Idle;
    }

    fn lock(&self) -> MutexGuard<'_, ListeningSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for VoiceInput {
    fn drop(&mut self) {
        let session = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        Self::release(session);
    }
}
