//! Text rendering of a [`DashboardView`].
//!
//! Every section returns a `String` so the layout can be tested without a terminal.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use obd_core::{DashboardView, LiveSnapshot, QUICK_QUESTIONS};

const NO_CODES: &str = "Aucun code actif détecté pour l'instant.";
const PIDS_LOADING: &str = "Chargement...";

fn styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Full dashboard: live data, fault codes, assistant.
pub fn render_dashboard(view: &DashboardView, backend_url: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n  OBD Voice Assistant   (backend: {})\n\n", backend_url));
    out.push_str(&render_live(view));
    out.push('\n');
    out.push_str(&render_diagnostics(view));
    out.push('\n');
    out.push_str(&render_assistant(view));
    out
}

pub fn render_live(view: &DashboardView) -> String {
    let status = if view.polling { "en cours" } else { "arrêté" };
    let mut out = format!("  ┌─ Données OBD (simulées) ─ flux {} ─\n", status);

    if let Some(error) = &view.live_error {
        out.push_str(&format!("  ⚠ {}\n", error));
    }

    let snapshot = view.live.clone().unwrap_or_default();
    out.push_str(&metrics_table(&snapshot).to_string());
    out.push('\n');

    if let Some(at) = view.live_updated_at {
        out.push_str(&format!("  Dernière lecture : {}\n", at.format("%H:%M:%S")));
    }

    let pids = if view.pids.is_empty() {
        PIDS_LOADING.to_string()
    } else {
        view.pids
            .iter()
            .map(|(pid, description)| format!("{} ({})", pid, description))
            .collect::<Vec<_>>()
            .join(", ")
    };
    out.push_str(&format!("  PIDs supportés : {}\n", pids));
    out
}

fn metrics_table(snapshot: &LiveSnapshot) -> Table {
    let mut table = styled_table();
    table.set_header(vec![
        Cell::new("Mesure").add_attribute(Attribute::Bold),
        Cell::new("Valeur")
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
        Cell::new("Unité").add_attribute(Attribute::Bold),
    ]);
    for metric in snapshot.metrics() {
        let value = Cell::new(metric.display_value()).set_alignment(CellAlignment::Right);
        let value = if metric.value.is_some() {
            value.add_attribute(Attribute::Bold)
        } else {
            value.fg(Color::DarkGrey)
        };
        table.add_row(vec![Cell::new(metric.label), value, Cell::new(metric.unit)]);
    }
    table
}

pub fn render_diagnostics(view: &DashboardView) -> String {
    let mut out = String::from("  ┌─ Codes défaut (DTC) ─\n");
    if view.dtcs.is_empty() {
        out.push_str(&format!("  {}\n", NO_CODES));
        return out;
    }

    let mut table = styled_table();
    table.set_header(vec![
        Cell::new("Code").add_attribute(Attribute::Bold),
        Cell::new("Sévérité").add_attribute(Attribute::Bold),
        Cell::new("Description").add_attribute(Attribute::Bold),
    ]);
    for dtc in &view.dtcs {
        table.add_row(vec![
            Cell::new(&dtc.code).add_attribute(Attribute::Bold),
            Cell::new(dtc.severity.to_string()).fg(Color::Yellow),
            Cell::new(&dtc.description),
        ]);
    }
    out.push_str(&table.to_string());
    out.push('\n');
    out
}

pub fn render_assistant(view: &DashboardView) -> String {
    let mut out = String::from("  ┌─ Assistant vocal mécanique / électricité / ECU ─\n");
    let mic = if view.listening { "🎤 écoute en cours (talk pour arrêter)" } else { "micro inactif (talk pour parler)" };
    out.push_str(&format!("  {}\n", mic));
    if !view.transcript.is_empty() {
        out.push_str(&format!("  > {}\n", view.transcript));
    }
    if view.pending {
        out.push_str("  … en attente de la réponse\n");
    }
    if let Some(turn) = &view.turn {
        out.push_str(&render_answer(&turn.answer, &turn.tips));
    }
    out.push_str("  Questions rapides :\n");
    for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
        out.push_str(&format!("    q {}  {}\n", i + 1, question));
    }
    out
}

/// Answer block; empty answers render nothing.
pub fn render_answer(answer: &str, tips: &[String]) -> String {
    if answer.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for line in answer.lines() {
        out.push_str(&format!("  │ {}\n", line));
    }
    for tip in tips {
        out.push_str(&format!("  │  • {}\n", tip));
    }
    out
}
