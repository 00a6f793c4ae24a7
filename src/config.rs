use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV: &str = "PATHVOICE_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Locale the gateway runs the recognition and synthesis engines in.
    pub locale: String,
    /// Driver cadence in milliseconds.
    pub tick_ms: u64,
    /// Optional JSON file with the initial pathway events (console harness).
    pub pathway_seed: Option<PathBuf>,
    pub recovery: RecoveryPolicy,
    pub prompts: Prompts,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locale: "de-DE".to_string(),
            tick_ms: 50,
            pathway_seed: None,
            recovery: RecoveryPolicy::default(),
            prompts: Prompts::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        info!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Explicit path first, then `PATHVOICE_CONFIG`, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Self::load(Path::new(&path)),
                None => Ok(Self::default()),
            },
        }
    }
}

/// How recognition errors are recovered from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryPolicy {
    /// When false every recognition error is answered with a restart.
    pub escalate_fatal_errors: bool,
    /// Error codes that stop the listening loop instead of restarting it.
    pub fatal_codes: Vec<String>,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            escalate_fatal_errors: true,
            fatal_codes: vec![
                "audio-capture".to_string(),
                "not-allowed".to_string(),
                "service-not-allowed".to_string(),
                "language-not-supported".to_string(),
            ],
        }
    }
}

/// Every sentence the engine speaks or displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub welcome: String,
    pub date_question: String,
    pub caption_question: String,
    pub content_question: String,
    pub command_hint: String,
    pub finish_hint: String,
    pub invalid_date: String,
    /// `{command}` is replaced with the rejected transcript.
    pub invalid_command: String,
    pub appointment_created: String,
    pub symptom_added: String,
    pub empty_symptom: String,
    pub invalid_query: String,
    /// `{name}` and `{date}` are replaced with the requested event.
    pub not_found: String,
    pub deleted: String,
    pub delete_failed: String,
    pub farewell: String,
    pub not_understood: String,
    pub help_opened: String,
    pub dialog_aborted: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            welcome: "Herzlich Willkommen zur sprachgeführten Anlegung eines neuen Termins. Sagen Sie start, um zu beginnen.".to_string(),
            date_question: "Wann ist der Termin?".to_string(),
            caption_question: "Welchen Namen soll der Termin erhalten?".to_string(),
            content_question: "Sie können nun noch eine Beschreibung dem Termin hinzufügen.".to_string(),
            command_hint: "Sagen Sie weiter, zurück oder neue Eingabe.".to_string(),
            finish_hint: "Sagen Sie fertig, zurück oder neue Eingabe.".to_string(),
            invalid_date: "Das ist kein echtes Datum.".to_string(),
            invalid_command: "'{command}' ist kein valides Kommando.".to_string(),
            appointment_created: "Sie haben erfolgreich einen neuen Termin angelegt.".to_string(),
            symptom_added: "Das Symptom wurde Ihrem Pfad hinzugefügt.".to_string(),
            empty_symptom: "Bitte nennen Sie das Symptom direkt nach dem Wort Symptom.".to_string(),
            invalid_query: "Ich konnte den Namen oder das Datum des Events nicht verstehen.".to_string(),
            not_found: "Es gibt kein Event mit dem Namen {name} zum Datum {date}.".to_string(),
            deleted: "Das Event wurde erfolgreich gelöscht!".to_string(),
            delete_failed: "Es gibt kein Event mit diesem Namen an diesem Datum!".to_string(),
            farewell: "Man hört sich.".to_string(),
            not_understood: "Dieses Sprachkommando wird nicht unterstützt.".to_string(),
            help_opened: "Die Hilfe ist geöffnet. Sagen Sie dialog schließen, um sie zu beenden.".to_string(),
            dialog_aborted: "Die Anlegung des Termins wurde abgebrochen.".to_string(),
        }
    }
}

impl Prompts {
    pub fn invalid_command(&self, command: &str) -> String {
        self.invalid_command.replace("{command}", command)
    }

    pub fn not_found(&self, name: &str, date: &str) -> String {
        self.not_found.replace("{name}", name).replace("{date}", date)
    }
}
