//! # OBD Voice - Speech capability seams
//!
//! Recognition and synthesis are host capabilities that may or may not exist. This crate
//! hides both behind traits and keeps the session policy (one engine per listening
//! session, one audible utterance at a time) independent of whichever engine is plugged in.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  RecognitionProvider ──acquire──► RecognitionEngine        │
//! │                                        │ result/error/end  │
//! │                                        ▼                   │
//! │                         EventSink ──► VoiceInput (Idle ⇄   │
//! │                                        Listening)          │
//! │                                        │ transcript        │
//! │                                        ▼                   │
//! │                                  caller (dispatch)         │
//! │                                                            │
//! │  SpeechOutput ──cancel, then speak──► SpeechSynthesizer     │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod error;
pub mod recognition;
pub mod speech;
pub mod voice_input;

pub use command::{find_program, CommandRecognizer, CommandSpeaker};
pub use error::{VoiceError, VoiceResult};
pub use recognition::{
    EventSink, NoRecognition, RecognitionEngine, RecognitionEvent, RecognitionProvider,
    RecognitionSettings, SessionEvent,
};
pub use speech::{SpeechOutput, SpeechSynthesizer};
pub use voice_input::{ListeningState, ToggleOutcome, VoiceInput};
