//! Assistant configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional file, then
//! `OBD_*` environment variables.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | OBD_ASSIST_CONFIG | config/obd-assist | Config file (extension optional, e.g. `.toml`). |
//! | OBD_BACKEND_URL | http://localhost:8000 | Diagnostics backend base URL. |
//! | OBD_POLL_INTERVAL_MS | 1000 | Live snapshot period. |
//! | OBD_REQUEST_TIMEOUT_SECS | 10 | Per-request HTTP timeout. |
//! | OBD_LOCALE | fr-FR | Recognition and synthesis locale. |
//! | OBD_SPEECH_COMMAND | (none) | Text-to-speech program, e.g. `espeak-ng -v fr`. |
//! | OBD_RECOGNITION_COMMAND | (none) | Dictation program printing one transcript line. |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/obd-assist";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOCALE: &str = "fr-FR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistConfig {
    pub backend_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub locale: String,
    #[serde(default)]
    pub speech_command: Option<String>,
    #[serde(default)]
    pub recognition_command: Option<String>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            locale: DEFAULT_LOCALE.to_string(),
            speech_command: None,
            recognition_command: None,
        }
    }
}

impl AssistConfig {
    /// Load from the file named by `OBD_ASSIST_CONFIG` (if present) and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("OBD_ASSIST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from an explicit file path (missing file is fine) and the environment.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let built = config::Config::builder()
            .set_default("backend_url", DEFAULT_BACKEND_URL)?
            .set_default("poll_interval_ms", DEFAULT_POLL_INTERVAL_MS as i64)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            .set_default("locale", DEFAULT_LOCALE)?
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("OBD").try_parsing(true))
            .build()?;

        let mut loaded: Self = built.try_deserialize()?;
        loaded.speech_command = non_blank(loaded.speech_command);
        loaded.recognition_command = non_blank(loaded.recognition_command);
        Ok(loaded)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_simulated_backend() {
        let c = AssistConfig::default();
        assert_eq!(c.backend_url, "http://localhost:8000");
        assert_eq!(c.poll_interval(), Duration::from_millis(1000));
        assert_eq!(c.request_timeout(), Duration::from_secs(10));
        assert_eq!(c.locale, "fr-FR");
        assert!(c.speech_command.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AssistConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.poll_interval_ms, 1000);
        assert_eq!(loaded.locale, "fr-FR");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obd-assist.toml");
        std::fs::write(
            &path,
            "backend_url = \"http://10.0.0.5:9000\"\npoll_interval_ms = 250\nspeech_command = \"  \"\nrecognition_command = \"dictate --lang {locale}\"\n",
        )
        .unwrap();

        let loaded = AssistConfig::load_from(&path).unwrap();
        assert_eq!(loaded.backend_url, "http://10.0.0.5:9000");
        assert_eq!(loaded.poll_interval(), Duration::from_millis(250));
        assert_eq!(loaded.request_timeout_secs, 10);
        assert!(loaded.speech_command.is_none());
        assert_eq!(loaded.recognition_command.as_deref(), Some("dictate --lang {locale}"));
    }

    #[test]
    fn zero_durations_are_clamped() {
        let c = AssistConfig {
            poll_interval_ms: 0,
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(c.poll_interval(), Duration::from_millis(1));
        assert_eq!(c.request_timeout(), Duration::from_secs(1));
    }
}
