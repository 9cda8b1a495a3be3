//! Command-backed speech engines for terminal hosts.
//!
//! - [`CommandSpeaker`] runs a text-to-speech program (`espeak-ng -v fr`, `say`, ...) with
//!   the utterance as last argument. Cancelling kills the running child.
//! - [`CommandRecognizer`] runs a dictation program once per listening session. The first
//!   non-empty stdout line is the transcript; process exit ends the session.
//!
//! Both accept a `{locale}` placeholder in their arguments. A command is only usable when
//! its program is found, which is how the capability is detected.

use crate::error::{VoiceError, VoiceResult};
use crate::recognition::{EventSink, RecognitionEngine, RecognitionProvider, RecognitionSettings};
use crate::speech::SpeechSynthesizer;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::ChildStdout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOCALE_PLACEHOLDER: &str = "{locale}";

/// Resolve a program name against `PATH`. Names containing a path separator are checked as-is.
pub fn find_program(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

fn parse_command_line(command_line: &str) -> Option<(PathBuf, Vec<String>)> {
    let mut parts = command_line.split_whitespace();
    let program = find_program(parts.next()?)?;
    Some((program, parts.map(str::to_string).collect()))
}

fn expand_locale(args: &[String], locale: &str) -> Vec<String> {
    args.iter()
        .map(|arg| arg.replace(LOCALE_PLACEHOLDER, locale))
        .collect()
}

/// Speech synthesis through an external program.
pub struct CommandSpeaker {
    program: PathBuf,
    args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl CommandSpeaker {
    /// Build from a command line such as `espeak-ng -v fr`. `None` when the program is missing.
    pub fn detect(command_line: &str) -> Option<Self> {
        let (program, args) = parse_command_line(command_line)?;
        info!(program = %program.display(), "Speech synthesis command found");
        Some(Self {
            program,
            args,
            child: Mutex::new(None),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn take_child(&self) -> Option<Child> {
        self.child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl SpeechSynthesizer for CommandSpeaker {
    fn speak(&self, text: &str, locale: &str) -> VoiceResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let child = Command::new(&self.program)
            .args(expand_locale(&self.args, locale))
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VoiceError::Synthesis(format!("{}: {}", self.program.display(), e)))?;

        let previous = self
            .child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(child);
        if let Some(previous) = previous {
            silence(previous);
        }
        Ok(())
    }

    fn cancel(&self) {
        if let Some(child) = self.take_child() {
            silence(child);
        }
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn silence(mut child: Child) {
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Speech recognition through an external dictation program.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandRecognizer {
    /// Build from a command line such as `whisper-dictate --lang {locale}`.
    /// `None` when the program is missing.
    pub fn detect(command_line: &str) -> Option<Self> {
        let (program, args) = parse_command_line(command_line)?;
        info!(program = %program.display(), "Dictation command found");
        Some(Self { program, args })
    }
}

impl RecognitionProvider for CommandRecognizer {
    fn acquire(&self, settings: &RecognitionSettings) -> Option<Box<dyn RecognitionEngine>> {
        Some(Box::new(DictationEngine {
            program: self.program.clone(),
            args: expand_locale(&self.args, &settings.locale),
            cancel: None,
        }))
    }
}

struct DictationEngine {
    program: PathBuf,
    args: Vec<String>,
    cancel: Option<CancellationToken>,
}

impl RecognitionEngine for DictationEngine {
    fn start(&mut self, sink: EventSink) -> VoiceResult<()> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoiceError::Recognition(format!("{}: {}", self.program.display(), e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VoiceError::Recognition("dictation command has no stdout".to_string()))?;

        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        tokio::spawn(run_dictation(child, stdout, token, sink));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

async fn run_dictation(
    mut child: tokio::process::Child,
    stdout: ChildStdout,
    cancel: CancellationToken,
    sink: EventSink,
) {
    let session = sink.session();
    let mut lines = BufReader::new(stdout).lines();

    let heard = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        line = first_line(&mut lines) => Some(line),
    };

    match heard {
        None => {
            let _ = child.kill().await;
            debug!(session, "Dictation cancelled");
        }
        Some(heard) => {
            match heard {
                Ok(Some(text)) => {
                    let _ = sink.result(text);
                }
                Ok(None) => debug!(session, "Dictation produced no transcript"),
                Err(e) => {
                    let _ = sink.error(e.to_string());
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                }
                status = child.wait() => match status {
                    Ok(status) if !status.success() => {
                        let _ = sink.error(format!("dictation command exited with {}", status));
                    }
                    Err(e) => {
                        let _ = sink.error(e.to_string());
                    }
                    Ok(_) => {}
                },
            }
        }
    }

    let _ = sink.end();
}

async fn first_line(lines: &mut Lines<BufReader<ChildStdout>>) -> std::io::Result<Option<String>> {
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            return Ok(Some(line.to_string()));
        }
    }
    Ok(None)
}
