//! **Recognition**: the engine-facing half of a listening session.
//!
//! An engine reports three kinds of events (result, error, end) through the [`EventSink`]
//! it was started with. Each sink is stamped with the session id it belongs to, so the
//! controller can tell a live engine's events from those of an engine it already let go.

use crate::error::{VoiceError, VoiceResult};
use tokio::sync::mpsc;

/// Engine configuration requested for every listening session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSettings {
    /// BCP-47 locale (default "fr-FR").
    pub locale: String,
    /// Interim (partial) results. Always false for single-shot recognition.
    pub interim_results: bool,
    /// Alternatives per result (default 1).
    pub max_alternatives: u32,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            locale: "fr-FR".to_string(),
            interim_results: false,
            max_alternatives: 1,
        }
    }
}

impl RecognitionSettings {
    /// Single final result, one alternative, in the given locale.
    pub fn with_locale(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..Default::default()
        }
    }
}

/// Raw events an engine can fire during a session.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Final results. Each entry holds the alternatives for one result, best first.
    Result(Vec<Vec<String>>),
    /// The engine failed (no speech, audio capture error, aborted...).
    Error(String),
    /// The engine closed its session.
    End,
}

impl RecognitionEvent {
    /// First alternative of the first result, if the event carries one.
    pub fn first_transcript(&self) -> Option<&str> {
        match self {
            RecognitionEvent::Result(results) => results
                .first()
                .and_then(|alternatives| alternatives.first())
                .map(String::as_str),
            _ => None,
        }
    }
}

/// An engine event tagged with the listening session that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session: u64,
    pub event: RecognitionEvent,
}

/// Sending half handed to an engine when its session starts.
#[derive(Debug, Clone)]
pub struct EventSink {
    session: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn new(session: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    /// Session id this sink reports for.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Forward an event to the controller.
    pub fn emit(&self, event: RecognitionEvent) -> VoiceResult<()> {
        self.tx
            .send(SessionEvent {
                session: self.session,
                event,
            })
            .map_err(|e| VoiceError::ChannelSend(e.to_string()))
    }

    /// Report a single final transcript (one result, one alternative).
    pub fn result(&self, transcript: impl Into<String>) -> VoiceResult<()> {
        self.emit(RecognitionEvent::Result(vec![vec![transcript.into()]]))
    }

    pub fn error(&self, message: impl Into<String>) -> VoiceResult<()> {
        self.emit(RecognitionEvent::Error(message.into()))
    }

    pub fn end(&self) -> VoiceResult<()> {
        self.emit(RecognitionEvent::End)
    }
}

/// A speech recognition engine instance. One instance serves one listening session.
pub trait RecognitionEngine: Send {
    /// Begin listening. Events for this session must go through `sink`.
    fn start(&mut self, sink: EventSink) -> VoiceResult<()>;

    /// Ask the engine to stop. The engine still reports `End` when it has shut down.
    fn stop(&mut self);
}

/// Capability probe: yields a fresh engine, or `None` when recognition is unsupported.
pub trait RecognitionProvider: Send + Sync {
    fn acquire(&self, settings: &RecognitionSettings) -> Option<Box<dyn RecognitionEngine>>;
}

/// Provider for hosts without speech recognition.
#[derive(Debug, Default)]
pub struct NoRecognition;

impl RecognitionProvider for NoRecognition {
    fn acquire(&self, _settings: &RecognitionSettings) -> Option<Box<dyn RecognitionEngine>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults_are_single_shot_french() {
        let s = RecognitionSettings::default();
        assert_eq!(s.locale, "fr-FR");
        assert!(!s.interim_results);
        assert_eq!(s.max_alternatives, 1);
        assert_eq!(RecognitionSettings::with_locale("en-US").max_alternatives, 1);
    }

    #[test]
    fn first_transcript_takes_first_alternative_of_first_result() {
        let event = RecognitionEvent::Result(vec![
            vec!["bonjour".to_string(), "bon jour".to_string()],
            vec!["ignored".to_string()],
        ]);
        assert_eq!(event.first_transcript(), Some("bonjour"));
        assert_eq!(RecognitionEvent::Result(vec![]).first_transcript(), None);
        assert_eq!(RecognitionEvent::End.first_transcript(), None);
    }

    #[test]
    fn sink_tags_events_with_its_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(7, tx);
        sink.result("P0420").unwrap();
        sink.end().unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.session, 7);
        assert_eq!(first.event.first_transcript(), Some("P0420"));
        assert_eq!(rx.try_recv().unwrap().event, RecognitionEvent::End);
    }

    #[test]
    fn sink_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = EventSink::new(1, tx);
        assert!(matches!(sink.end(), Err(VoiceError::ChannelSend(_))));
    }

    #[test]
    fn no_recognition_never_yields_an_engine() {
        assert!(NoRecognition.acquire(&RecognitionSettings::default()).is_none());
    }
}
