//! **SpeechOutput**: the single audible channel.
//!
//! Every `speak` cancels whatever is still playing before starting the new utterance, so
//! at most one answer is audible at a time. Hosts without synthesis get a `SpeechOutput`
//! that silently drops requests.

use crate::error::VoiceResult;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Host text-to-speech engine.
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking `text` in `locale`. Must not block until playback ends.
    fn speak(&self, text: &str, locale: &str) -> VoiceResult<()>;

    /// Silence any utterance in progress. No-op when nothing plays.
    fn cancel(&self);
}

/// Mutually exclusive speech channel with destructive preemption.
pub struct SpeechOutput {
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    locale: String,
    channel: Mutex<()>,
}

impl SpeechOutput {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, locale: impl Into<String>) -> Self {
        Self {
            synthesizer: Some(synthesizer),
            locale: locale.into(),
            channel: Mutex::new(()),
        }
    }

    /// Output for hosts without speech synthesis.
    pub fn unavailable(locale: impl Into<String>) -> Self {
        Self {
            synthesizer: None,
            locale: locale.into(),
            channel: Mutex::new(()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Cancel the current utterance and speak `text`. Returns true when an utterance was
    /// handed to the synthesizer.
    pub fn speak(&self, text: &str) -> bool {
        let Some(synthesizer) = &self.synthesizer else {
            debug!("Speech synthesis unavailable, skipping");
            return false;
        };

        let _channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        synthesizer.cancel();
        match synthesizer.speak(text, &self.locale) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Speech synthesis failed");
                false
            }
        }
    }

    /// Silence the channel.
    pub fn cancel(&self) {
        if let Some(synthesizer) = &self.synthesizer {
            let _channel = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
            synthesizer.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoiceError;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl SpeechSynthesizer for Recorder {
        fn speak(&self, text: &str, locale: &str) -> VoiceResult<()> {
            self.calls.lock().unwrap().push(format!("speak:{locale}:{text}"));
            if self.fail {
                return Err(VoiceError::Synthesis("device lost".to_string()));
            }
            Ok(())
        }

        fn cancel(&self) {
            self.calls.lock().unwrap().push("cancel".to_string());
        }
    }

    #[test]
    fn speak_cancels_before_every_utterance() {
        let recorder = Arc::new(Recorder::default());
        let output = SpeechOutput::new(recorder.clone(), "fr-FR");

        assert!(output.speak("premier"));
        assert!(output.speak("second"));

        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec!["cancel", "speak:fr-FR:premier", "cancel", "speak:fr-FR:second"]
        );
    }

    #[test]
    fn unavailable_output_skips_silently() {
        let output = SpeechOutput::unavailable("fr-FR");
        assert!(!output.is_available());
        assert!(!output.speak("rien"));
        output.cancel();
    }

    #[test]
    fn synthesis_failure_is_not_raised() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let output = SpeechOutput::new(recorder, "fr-FR");
        assert!(!output.speak("bonjour"));
    }
}
