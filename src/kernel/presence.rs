use serde::{Deserialize, Serialize};

/// Who is talking to the user right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresenceState {
    /// Microphone off. Nothing is armed until the user reactivates.
    Dormant,
    /// Command router owns the listening loop.
    Attentive,
    /// Guided appointment dialog owns the turn scheduler.
    Guiding,
    /// Help view is open and waits for "dialog schließen".
    Assisting,
}

impl Default for PresenceState {
    fn default() -> Self {
        Self::Dormant
    }
}

/// Requested presence transitions. The graph decides whether they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceRequest {
    Activate,
    Deactivate,
    OpenDialog,
    CloseDialog,
    OpenHelp,
    CloseHelp,
    EndSession,
    /// Recognition cannot work at all (no microphone, permission denied).
    RecognitionUnavailable,
}

pub struct PresenceGraph;

impl PresenceGraph {
    /// Pure function: (current, request) -> next. `None` means the request is
    /// ignored in this state.
    pub fn transition(current: PresenceState, request: PresenceRequest) -> Option<PresenceState> {
        use PresenceRequest::*;
        use PresenceState::*;

        match (current, request) {
            (Dormant, Activate) => Some(Attentive),

            (Attentive, OpenDialog) => Some(Guiding),
            (Attentive, OpenHelp) => Some(Assisting),

            (Guiding, CloseDialog) => Some(Attentive),
            (Assisting, CloseHelp) => Some(Attentive),

            (Attentive | Guiding | Assisting, Deactivate | EndSession | RecognitionUnavailable) => Some(Dormant),

            _ => None,
        }
    }
}
