//! **AssistSession**: one dashboard session and everything it owns.
//!
//! The session wires the gateway, the poller, the voice controller and the dispatcher to a
//! shared [`DashboardState`], and runs the voice event pump that turns recognized speech
//! into questions. UIs hold an `AssistSession` and call its operations; nothing here is
//! global.

use crate::config::AssistConfig;
use crate::dispatch::{AssistantDispatcher, DispatchOutcome};
use crate::gateway::BackendGateway;
use crate::model::QUICK_QUESTIONS;
use crate::poller::LivePoller;
use crate::state::{DashboardState, DashboardView};
use obd_voice::{
    RecognitionProvider, RecognitionSettings, SessionEvent, SpeechOutput, ToggleOutcome, VoiceInput,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Shown in place of a transcript when the host cannot recognize speech.
pub const RECOGNITION_UNSUPPORTED_MESSAGE: &str =
    "La reconnaissance vocale n'est pas supportée sur cet appareil.";

pub struct AssistSession {
    gateway: Arc<dyn BackendGateway>,
    state: Arc<DashboardState>,
    poller: LivePoller,
    voice: Arc<VoiceInput>,
    dispatcher: Arc<AssistantDispatcher>,
    speech: Arc<SpeechOutput>,
    shutdown: CancellationToken,
}

impl AssistSession {
    /// Build a session and start its voice event pump. Must be called inside a tokio runtime.
    pub fn new(
        config: &AssistConfig,
        gateway: Arc<dyn BackendGateway>,
        recognition: Arc<dyn RecognitionProvider>,
        speech: SpeechOutput,
    ) -> Self {
        let state = Arc::new(DashboardState::new());
        let speech = Arc::new(speech);
        let poller = LivePoller::new(Arc::clone(&gateway), Arc::clone(&state), config.poll_interval());
        let dispatcher = Arc::new(AssistantDispatcher::new(
            Arc::clone(&gateway),
            Arc::clone(&speech),
            Arc::clone(&state),
        ));
        let (voice, voice_rx) =
            VoiceInput::new(recognition, RecognitionSettings::with_locale(config.locale.clone()));
        let voice = Arc::new(voice);
        let shutdown = CancellationToken::new();

        tokio::spawn(run_voice_events(
            voice_rx,
            Arc::clone(&voice),
            Arc::clone(&dispatcher),
            Arc::clone(&state),
            shutdown.clone(),
        ));

        info!(
            speech = speech.is_available(),
            locale = %config.locale,
            poll_ms = config.poll_interval_ms,
            "Assist session ready"
        );

        Self {
            gateway,
            state,
            poller,
            voice,
            dispatcher,
            speech,
            shutdown,
        }
    }

    /// Startup sequence: load the PID catalog once, then start polling.
    pub async fn bootstrap(&self) {
        let pids = self.gateway.fetch_pid_catalog().await;
        info!(count = pids.len(), "PID catalog loaded");
        self.state.set_pids(pids);
        self.poller.start();
    }

    pub fn start_polling(&self) {
        self.poller.start();
    }

    pub fn stop_polling(&self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Run a diagnostics scan and replace the displayed codes. Returns how many were found.
    pub async fn scan_diagnostics(&self) -> usize {
        let dtcs = self.gateway.fetch_diagnostics().await;
        let count = dtcs.len();
        info!(count, "Diagnostics scan complete");
        self.state.set_dtcs(dtcs);
        count
    }

    /// Talk button: start or stop a listening session.
    pub fn toggle_listening(&self) -> ToggleOutcome {
        let outcome = self.voice.toggle();
        if outcome == ToggleOutcome::Unsupported {
            self.state.set_transcript(RECOGNITION_UNSUPPORTED_MESSAGE);
        }
        self.state.set_listening(self.voice.is_listening());
        outcome
    }

    pub fn is_listening(&self) -> bool {
        self.voice.is_listening()
    }

    /// Typed question (Enter or send). The text becomes the transcript, then is asked.
    pub fn submit_text(&self, text: impl Into<String>) -> JoinHandle<DispatchOutcome> {
        let text = text.into();
        self.state.set_transcript(text.clone());
        self.spawn_ask(text)
    }

    /// Quick question by literal text. Identical to typing and submitting it.
    pub fn quick_ask(&self, question: &str) -> JoinHandle<DispatchOutcome> {
        self.submit_text(question)
    }

    /// Quick question by its position in [`QUICK_QUESTIONS`]. `None` when out of range.
    pub fn quick_ask_index(&self, index: usize) -> Option<JoinHandle<DispatchOutcome>> {
        QUICK_QUESTIONS.get(index).map(|q| self.quick_ask(q))
    }

    pub fn state(&self) -> Arc<DashboardState> {
        Arc::clone(&self.state)
    }

    pub fn view(&self) -> DashboardView {
        self.state.view()
    }

    /// Stop every lane: polling, listening, speech and the voice pump.
    pub fn shutdown(&self) {
        self.poller.stop();
        self.voice.stop();
        self.state.set_listening(false);
        self.speech.cancel();
        self.shutdown.cancel();
        info!("Assist session shut down");
    }

    fn spawn_ask(&self, question: String) -> JoinHandle<DispatchOutcome> {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move { dispatcher.ask(question).await })
    }
}

impl Drop for AssistSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Voice lane: feeds engine events to the state machine and forwards recognized speech.
async fn run_voice_events(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    voice: Arc<VoiceInput>,
    dispatcher: Arc<AssistantDispatcher>,
    state: Arc<DashboardState>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if let Some(transcript) = voice.handle_event(event) {
            state.set_transcript(transcript.clone());
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.ask(transcript).await });
        }
        state.set_listening(voice.is_listening());
    }

    debug!("Voice event pump stopped");
}
