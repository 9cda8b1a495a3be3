//! Assistant Dispatch Controller
//!
//! Every entry point (voice transcript, typed question, quick question) ends up in
//! [`AssistantDispatcher::ask`]. Overlapping asks are allowed; each one takes a sequence
//! number and only the most recently started one may publish or speak.

use crate::gateway::BackendGateway;
use crate::model::ConversationTurn;
use crate::state::DashboardState;
use obd_voice::SpeechOutput;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer shown when the chat backend cannot be reached.
pub const ASSISTANT_ERROR_MESSAGE: &str = "Erreur de communication avec l'assistant";

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Answer published and handed to speech synthesis.
    Answered,
    /// Backend failed; fallback message published, nothing spoken.
    Failed,
    /// A newer question was asked meanwhile; this result was dropped.
    Superseded,
}

pub struct AssistantDispatcher {
    gateway: Arc<dyn BackendGateway>,
    speech: Arc<SpeechOutput>,
    state: Arc<DashboardState>,
}

impl AssistantDispatcher {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        speech: Arc<SpeechOutput>,
        state: Arc<DashboardState>,
    ) -> Self {
        Self {
            gateway,
            speech,
            state,
        }
    }

    /// Send `question` as-is (empty included; the backend decides what is valid).
    pub async fn ask(&self, question: impl Into<String>) -> DispatchOutcome {
        let question = question.into();
        let seq = self.state.begin_turn();
        info!(seq, question = %question, "Asking assistant");

        match self.gateway.post_question(&question).await {
            Ok(reply) => {
                let answer = reply.answer.clone();
                let turn = ConversationTurn {
                    question,
                    answer: reply.answer,
                    tips: reply.tips,
                };
                if !self.state.publish_turn(seq, turn) {
                    debug!(seq, "Answer superseded by a newer question");
                    return DispatchOutcome::Superseded;
                }
                self.speech.speak(&answer);
                DispatchOutcome::Answered
            }
            Err(e) => {
                warn!(seq, error = %e, "Assistant request failed");
                let turn = ConversationTurn {
                    question,
                    answer: ASSISTANT_ERROR_MESSAGE.to_string(),
                    tips: Vec::new(),
                };
                if !self.state.publish_turn(seq, turn) {
                    return DispatchOutcome::Superseded;
                }
                DispatchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, GatewayResult};
    use crate::model::{ChatAnswer, DiagnosticCode, LiveSnapshot, PidCatalog};
    use async_trait::async_trait;
    use obd_voice::{SpeechSynthesizer, VoiceResult};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct SpokenLog(Mutex<Vec<String>>);

    impl SpeechSynthesizer for SpokenLog {
        fn speak(&self, text: &str, _locale: &str) -> VoiceResult<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn cancel(&self) {}
    }

    /// Answers "réponse à <question>" after a per-question delay; fails when asked to.
    struct ChatStub {
        fail: bool,
        slow_question: Option<&'static str>,
    }

    #[async_trait]
    impl BackendGateway for ChatStub {
        async fn fetch_pid_catalog(&self) -> PidCatalog {
            PidCatalog::new()
        }

        async fn fetch_live_snapshot(&self) -> GatewayResult<LiveSnapshot> {
            Ok(LiveSnapshot::default())
        }

        async fn fetch_diagnostics(&self) -> Vec<DiagnosticCode> {
            Vec::new()
        }

        async fn post_question(&self, question: &str) -> GatewayResult<ChatAnswer> {
            if self.slow_question == Some(question) {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            if self.fail {
                return Err(GatewayError::Assistant("connection refused".to_string()));
            }
            Ok(ChatAnswer {
                answer: format!("réponse à {}", question),
                tips: vec!["a".to_string(), "b".to_string()],
            })
        }
    }

    fn dispatcher(stub: ChatStub) -> (Arc<AssistantDispatcher>, Arc<DashboardState>, Arc<SpokenLog>) {
        let state = Arc::new(DashboardState::new());
        let spoken = Arc::new(SpokenLog::default());
        let speech = Arc::new(SpeechOutput::new(spoken.clone(), "fr-FR"));
        let dispatcher = AssistantDispatcher::new(Arc::new(stub), speech, Arc::clone(&state));
        (Arc::new(dispatcher), state, spoken)
    }

    #[tokio::test]
    async fn empty_question_is_forwarded() {
        let (dispatcher, state, _) = dispatcher(ChatStub { fail: false, slow_question: None });
        assert_eq!(dispatcher.ask("").await, DispatchOutcome::Answered);
        assert_eq!(state.view().turn.unwrap().question, "");
    }

    #[tokio::test]
    async fn failure_publishes_fallback_without_speaking() {
        let (dispatcher, state, spoken) = dispatcher(ChatStub { fail: true, slow_question: None });
        assert_eq!(dispatcher.ask("P0171 ?").await, DispatchOutcome::Failed);

        let turn = state.view().turn.unwrap();
        assert_eq!(turn.answer, ASSISTANT_ERROR_MESSAGE);
        assert!(turn.tips.is_empty());
        assert!(spoken.0.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_answer_does_not_overwrite_newer_one() {
        let (dispatcher, state, spoken) = dispatcher(ChatStub {
            fail: false,
            slow_question: Some("lente"),
        });

        let first = tokio::spawn({
            let d = Arc::clone(&dispatcher);
            async move { d.ask("lente").await }
        });
        tokio::task::yield_now().await;
        let second = dispatcher.ask("rapide").await;

        assert_eq!(second, DispatchOutcome::Answered);
        assert_eq!(first.await.unwrap(), DispatchOutcome::Superseded);

        let turn = state.view().turn.unwrap();
        assert_eq!(turn.question, "rapide");
        assert_eq!(spoken.0.lock().unwrap().clone(), vec!["réponse à rapide"]);
    }
}
