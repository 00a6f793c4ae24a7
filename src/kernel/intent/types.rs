use serde::{Deserialize, Serialize};

pub use crate::pathway::EventQuery;

/// Closed set of things a transcript can mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntentKind {
    CreateAppointment,
    AddSymptom,
    ShowEvent,
    DeleteEvent,
    Help,
    EndSession,
    ControlNext,
    ControlPrevious,
    ControlRepeat,
    ControlStart,
    ControlFinish,
    CloseDialog,
    Unrecognized,
}

/// Parsed meaning of one transcript. Built per utterance, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    CreateAppointment,
    /// Symptom text keeps the casing of the transcript. May be empty.
    AddSymptom { symptom: String },
    ShowEvent(EventQuery),
    DeleteEvent(EventQuery),
    Help,
    EndSession,
    ControlNext,
    ControlPrevious,
    ControlRepeat,
    ControlStart,
    ControlFinish,
    CloseDialog,
    Unrecognized,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::CreateAppointment => IntentKind::CreateAppointment,
            Intent::AddSymptom { .. } => IntentKind::AddSymptom,
            Intent::ShowEvent(_) => IntentKind::ShowEvent,
            Intent::DeleteEvent(_) => IntentKind::DeleteEvent,
            Intent::Help => IntentKind::Help,
            Intent::EndSession => IntentKind::EndSession,
            Intent::ControlNext => IntentKind::ControlNext,
            Intent::ControlPrevious => IntentKind::ControlPrevious,
            Intent::ControlRepeat => IntentKind::ControlRepeat,
            Intent::ControlStart => IntentKind::ControlStart,
            Intent::ControlFinish => IntentKind::ControlFinish,
            Intent::CloseDialog => IntentKind::CloseDialog,
            Intent::Unrecognized => IntentKind::Unrecognized,
        }
    }
}
