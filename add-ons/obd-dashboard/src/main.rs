//! obd-dash: terminal OBD dashboard with a voice assistant.
//!
//! obd-dash    render the dashboard and read commands from stdin (type `help`)
//!
//! Configuration comes from `config/obd-assist.toml` (or `OBD_ASSIST_CONFIG`) and `OBD_*`
//! environment variables. Logs go to stderr; set `RUST_LOG=debug` to see each poll.

mod input;
mod render;

use anyhow::Context;
use input::Command;
use obd_core::{AssistConfig, AssistSession, HttpGateway, StateChange};
use obd_voice::{
    CommandRecognizer, CommandSpeaker, NoRecognition, RecognitionProvider, SpeechOutput,
    ToggleOutcome,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[obd-dash] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AssistConfig::load().context("load obd-assist configuration")?;
    let gateway = Arc::new(HttpGateway::from_config(&config).context("build HTTP client")?);

    let speech = match config.speech_command.as_deref().and_then(CommandSpeaker::detect) {
        Some(speaker) => SpeechOutput::new(Arc::new(speaker), config.locale.clone()),
        None => SpeechOutput::unavailable(config.locale.clone()),
    };
    let recognition: Arc<dyn RecognitionProvider> =
        match config.recognition_command.as_deref().and_then(CommandRecognizer::detect) {
            Some(recognizer) => Arc::new(recognizer),
            None => Arc::new(NoRecognition),
        };

    let session = AssistSession::new(&config, gateway, recognition, speech);
    let mut changes = session.state().subscribe();
    session.bootstrap().await;

    tracing::info!(backend = %config.backend_url, "obd-dash started");
    println!("{}", render::render_dashboard(&session.view(), &config.backend_url));
    println!("{}", input::help_text());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    break;
                };
                if !run_command(&session, &config, input::parse(&line)).await {
                    break;
                }
            }
            change = changes.recv() => match change {
                Ok(StateChange::Turn) => {
                    if let Some(turn) = session.view().turn {
                        println!("\n  Assistant :");
                        print!("{}", render::render_answer(&turn.answer, &turn.tips));
                    }
                }
                Ok(StateChange::Transcript) => {
                    let view = session.view();
                    if !view.transcript.is_empty() {
                        println!("  > {}", view.transcript);
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "dashboard change notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                break;
            }
        }
    }

    session.shutdown();
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn run_command(session: &AssistSession, config: &AssistConfig, command: Command) -> bool {
    match command {
        Command::StartPolling => session.start_polling(),
        Command::StopPolling => session.stop_polling(),
        Command::Scan => {
            let count = session.scan_diagnostics().await;
            println!("  {} code(s) défaut", count);
        }
        Command::Talk => match session.toggle_listening() {
            ToggleOutcome::Started { .. } => println!("  🎤 Parlez..."),
            ToggleOutcome::Stopped => println!("  Écoute arrêtée"),
            // The advisory arrives as the transcript.
            ToggleOutcome::Unsupported => {}
            ToggleOutcome::Failed(reason) => println!("  Échec de la reconnaissance : {}", reason),
        },
        Command::Quick(index) => {
            // Answers arrive through the change subscription.
            let _ = session.quick_ask_index(index);
            return true;
        }
        Command::Ask(question) => {
            let _ = session.submit_text(question);
            return true;
        }
        Command::Show => {}
        Command::Help => {
            println!("{}", input::help_text());
            return true;
        }
        Command::Quit => return false,
        Command::Nothing => return true,
        Command::Invalid(message) => {
            println!("  {}", message);
            return true;
        }
    }
    println!("{}", render::render_dashboard(&session.view(), &config.backend_url));
    true
}
