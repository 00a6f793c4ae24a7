use serde::{Deserialize, Serialize};

use crate::kernel::dialog::FormStep;
use crate::kernel::intent::IntentKind;
use crate::kernel::presence::PresenceState;
use crate::kernel::speech::RecognitionErrorKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    PresenceTransition {
        from: PresenceState,
        to: PresenceState,
    },

    IntentDispatched {
        kind: IntentKind,
    },

    StaleSignalDropped {
        source: SignalSource,
    },

    RecognitionFailed {
        kind: RecognitionErrorKind,
        escalated: bool,
    },

    SpeechFailed,

    FormStepEntered {
        step: FormStep,
    },

    /// A field value or command was rejected and re-prompted.
    InputRejected {
        step: FormStep,
    },

    DialogFinished {
        outcome: DialogOutcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    Recognition,
    Synthesis,
    Collaborator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogOutcome {
    Completed,
    Cancelled,
    Aborted,
}
