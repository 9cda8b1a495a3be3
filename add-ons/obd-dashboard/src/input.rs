//! Parsing of stdin lines into dashboard commands.

use obd_core::QUICK_QUESTIONS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartPolling,
    StopPolling,
    Scan,
    Talk,
    /// Zero-based index into `QUICK_QUESTIONS`.
    Quick(usize),
    Ask(String),
    Show,
    Help,
    Quit,
    /// Blank line.
    Nothing,
    Invalid(String),
}

/// Any line that is not a known keyword is a question for the assistant.
pub fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Nothing;
    }

    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    match (head.to_lowercase().as_str(), rest.is_empty()) {
        ("start", true) => Command::StartPolling,
        ("stop", true) => Command::StopPolling,
        ("scan", true) => Command::Scan,
        ("talk", true) => Command::Talk,
        ("show", true) => Command::Show,
        ("help" | "?", true) => Command::Help,
        ("quit" | "exit", true) => Command::Quit,
        ("q", _) => parse_quick(rest),
        ("ask", _) => Command::Ask(rest.to_string()),
        _ => Command::Ask(trimmed.to_string()),
    }
}

fn parse_quick(arg: &str) -> Command {
    match arg.parse::<usize>() {
        Ok(n) if (1..=QUICK_QUESTIONS.len()).contains(&n) => Command::Quick(n - 1),
        _ => Command::Invalid(format!(
            "Question rapide inconnue '{}' (1-{})",
            arg,
            QUICK_QUESTIONS.len()
        )),
    }
}

pub fn help_text() -> String {
    let mut out = String::from("\nCommandes :\n");
    out.push_str("  start        Démarrer le flux OBD\n");
    out.push_str("  stop         Arrêter le flux OBD\n");
    out.push_str("  scan         Lire les codes défaut (DTC)\n");
    out.push_str("  talk         Parler / arrêter l'écoute\n");
    out.push_str("  q <1-4>      Poser une question rapide\n");
    out.push_str("  ask <texte>  Poser une question (ou tapez-la directement)\n");
    out.push_str("  show         Réafficher le tableau de bord\n");
    out.push_str("  help         Afficher cette aide\n");
    out.push_str("  quit         Quitter (ou Ctrl-C)\n");
    out
}
