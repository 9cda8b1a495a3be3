//! Data exchanged with the diagnostics backend and shown on the dashboard.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;

/// PID identifier → human-readable description. Fetched once per session.
pub type PidCatalog = BTreeMap<String, String>;

/// Predefined questions offered as one-tap shortcuts, in display order.
pub const QUICK_QUESTIONS: [&str; 4] = [
    "Que signifie P0300 ?",
    "Ralenti instable essence",
    "ELM327: que vérifier ?",
    "Batterie faible: quels tests ?",
];

/// One point-in-time reading of the tracked sensor channels.
///
/// Every field is optional: a missing channel means "no reading", never an error.
/// The backend speaks snake_case; camelCase is accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LiveSnapshot {
    #[serde(default)]
    pub rpm: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default, alias = "coolantTemp")]
    pub coolant_temp: Option<f64>,
    #[serde(default)]
    pub throttle: Option<f64>,
    #[serde(default)]
    pub load: Option<f64>,
    #[serde(default, alias = "intakeTemp")]
    pub intake_temp: Option<f64>,
}

/// A labelled channel ready for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub label: &'static str,
    pub value: Option<f64>,
    pub unit: &'static str,
}

impl Metric {
    pub const PLACEHOLDER: &'static str = "—";

    /// Reading as text, or the placeholder when the channel is absent.
    pub fn display_value(&self) -> String {
        match self.value {
            Some(v) => v.to_string(),
            None => Self::PLACEHOLDER.to_string(),
        }
    }
}

impl LiveSnapshot {
    /// Channels in dashboard order.
    pub fn metrics(&self) -> [Metric; 6] {
        [
            Metric { label: "RPM", value: self.rpm, unit: "tr/min" },
            Metric { label: "Vitesse", value: self.speed, unit: "km/h" },
            Metric { label: "Temp. LDR", value: self.coolant_temp, unit: "°C" },
            Metric { label: "Papillon", value: self.throttle, unit: "%" },
            Metric { label: "Charge", value: self.load, unit: "%" },
            Metric { label: "IAT", value: self.intake_temp, unit: "°C" },
        ]
    }
}

/// Severity as reported by the backend: a number or a free-form label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Severity {
    Level(i64),
    Score(f64),
    Label(String),
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Label(String::new())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Level(n) => write!(f, "{}", n),
            Severity::Score(x) => write!(f, "{}", x),
            Severity::Label(s) => f.write_str(s),
        }
    }
}

/// Diagnostic Trouble Code from a scan. Missing or `null` fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiagnosticCode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: Severity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Decode `null` as the type's default instead of failing the whole payload.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decoded chat reply. Missing fields default to empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatAnswer {
    pub answer: String,
    pub tips: Vec<String>,
}

/// The latest question and its answer. No history is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub tips: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_accepts_partial_and_aliased_fields() {
        let snap: LiveSnapshot = serde_json::from_value(json!({
            "rpm": 850,
            "coolantTemp": 90.5,
            "intake_temp": 31,
            "fuel_level": 40
        }))
        .unwrap();

        assert_eq!(snap.rpm, Some(850.0));
        assert_eq!(snap.coolant_temp, Some(90.5));
        assert_eq!(snap.intake_temp, Some(31.0));
        assert_eq!(snap.speed, None);
    }

    #[test]
    fn metrics_render_placeholder_for_missing_channels() {
        let snap = LiveSnapshot {
            rpm: Some(850.0),
            throttle: Some(12.5),
            ..Default::default()
        };
        let metrics = snap.metrics();
        assert_eq!(metrics[0].display_value(), "850");
        assert_eq!(metrics[0].unit, "tr/min");
        assert_eq!(metrics[1].display_value(), "—");
        assert_eq!(metrics[3].display_value(), "12.5");
    }

    #[test]
    fn severity_keeps_backend_representation() {
        let codes: Vec<DiagnosticCode> = serde_json::from_value(json!([
            { "code": "P0300", "severity": 3, "description": "Ratés d'allumage" },
            { "code": "P0420", "severity": "moyenne", "description": "Catalyseur" },
            { "code": "U0100" }
        ]))
        .unwrap();

        assert_eq!(codes[0].severity.to_string(), "3");
        assert_eq!(codes[1].severity.to_string(), "moyenne");
        assert_eq!(codes[2].severity, Severity::default());
        assert_eq!(codes[2].description, "");
    }

    #[test]
    fn null_dtc_fields_decode_as_empty() {
        let code: DiagnosticCode = serde_json::from_value(json!({
            "code": "P0171",
            "severity": null,
            "description": null
        }))
        .unwrap();

        assert_eq!(code.code, "P0171");
        assert_eq!(code.severity, Severity::default());
        assert_eq!(code.description, "");
    }

    #[test]
    fn quick_questions_keep_display_order() {
        assert_eq!(QUICK_QUESTIONS[2], "ELM327: que vérifier ?");
        assert_eq!(QUICK_QUESTIONS.len(), 4);
    }
}
