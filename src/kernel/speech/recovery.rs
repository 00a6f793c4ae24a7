use serde::{Deserialize, Serialize};

use crate::config::RecoveryPolicy;

/// Error codes reported by the recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecognitionErrorKind {
    NoSpeech,
    Aborted,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    BadGrammar,
    LanguageNotSupported,
    Unknown,
}

impl RecognitionErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            "network" => Self::Network,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "bad-grammar" => Self::BadGrammar,
            "language-not-supported" => Self::LanguageNotSupported,
            _ => Self::Unknown,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoSpeech => "Es wurde keine Sprache erkannt.",
            Self::Aborted => "Die Spracherkennung wurde abgebrochen.",
            Self::AudioCapture => "Es konnte kein Mikrofon gefunden werden.",
            Self::Network => "Die Spracherkennung ist wegen eines Netzwerkfehlers nicht erreichbar.",
            Self::NotAllowed | Self::ServiceNotAllowed => "Der Zugriff auf das Mikrofon wurde nicht erlaubt.",
            Self::BadGrammar => "Die Spracherkennung konnte die Eingabe nicht verarbeiten.",
            Self::LanguageNotSupported => "Die eingestellte Sprache wird von der Spracherkennung nicht unterstützt.",
            Self::Unknown => "Bei der Spracherkennung ist ein Fehler aufgetreten.",
        }
    }
}

/// What to do after a failed recognition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recovery {
    /// Re-arm listening.
    Retry,
    /// Stop the listening loop; retrying cannot succeed.
    Escalate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionFailure {
    pub kind: RecognitionErrorKind,
    pub code: String,
    pub recovery: Recovery,
}

impl RecognitionFailure {
    pub fn classify(code: &str, policy: &RecoveryPolicy) -> Self {
        let code = code.trim().to_string();
        let fatal = policy.fatal_codes.iter().any(|fatal| *fatal == code);
        let recovery = if policy.escalate_fatal_errors && fatal {
            Recovery::Escalate
        } else {
            Recovery::Retry
        };

        Self {
            kind: RecognitionErrorKind::from_code(&code),
            code,
            recovery,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.recovery == Recovery::Escalate
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}
