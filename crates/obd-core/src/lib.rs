//! # OBD Core
//!
//! Live-data polling and assistant dispatch for the OBD voice assistant.
//!
//! Three lanes run side by side on one runtime and never block each other:
//!
//! - the **poll lane**: [`LivePoller`] fetches a [`LiveSnapshot`] every period;
//! - the **voice lane**: recognition events from `obd_voice::VoiceInput`;
//! - the **dispatch lane**: [`AssistantDispatcher`] posts questions and speaks answers.
//!
//! [`AssistSession`] owns all of them and is what a UI talks to. Every lane publishes into
//! the shared [`DashboardState`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod model;
pub mod poller;
pub mod session;
pub mod state;

pub use config::AssistConfig;
pub use dispatch::{AssistantDispatcher, DispatchOutcome, ASSISTANT_ERROR_MESSAGE};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{BackendGateway, HttpGateway};
pub use model::{
    ChatAnswer, ConversationTurn, DiagnosticCode, LiveSnapshot, Metric, PidCatalog, Severity,
    QUICK_QUESTIONS,
};
pub use poller::{LivePoller, LIVE_ERROR_MESSAGE};
pub use session::{AssistSession, RECOGNITION_UNSUPPORTED_MESSAGE};
pub use state::{DashboardState, DashboardView, StateChange};
