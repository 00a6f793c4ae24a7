use serde::{Deserialize, Serialize};

/// One armed recognition attempt. Signals from any other attempt are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub u64);

/// One synthesized utterance handed to the synthesis engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

/// Correlates a show/delete request with its asynchronous answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone)]
pub enum Event {
    /// Microphone switched on by the user.
    Activate,
    /// Microphone switched off by the user. Tears down every open turn.
    Deactivate,
    Recognition {
        attempt: AttemptId,
        signal: RecognitionSignal,
    },
    Synthesis {
        utterance: UtteranceId,
        signal: SynthesisSignal,
    },
    /// Answer of the pathway collaborator to a `RequestShow`.
    ShowResolved { request: RequestId, found: bool },
    /// Answer of the pathway collaborator to a `RequestDelete`.
    DeleteResolved { request: RequestId, deleted: bool },
    /// The help view was closed outside of the voice loop.
    HelpClosed,
}

/// Lifecycle contract of the recognition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionSignal {
    Started,
    Ended,
    Result { transcript: String, is_final: bool },
    Error(String),
}

/// Lifecycle contract of the synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisSignal {
    Started,
    Ended,
    Error(String),
}

// Helpers for building gateway signals
impl Event {
    pub fn heard(attempt: AttemptId, transcript: &str) -> Self {
        Event::Recognition {
            attempt,
            signal: RecognitionSignal::Result {
                transcript: transcript.to_string(),
                is_final: true,
            },
        }
    }

    pub fn silence(attempt: AttemptId) -> Self {
        Event::Recognition {
            attempt,
            signal: RecognitionSignal::Ended,
        }
    }

    pub fn recognition_error(attempt: AttemptId, code: &str) -> Self {
        Event::Recognition {
            attempt,
            signal: RecognitionSignal::Error(code.to_string()),
        }
    }

    pub fn spoken(utterance: UtteranceId) -> Self {
        Event::Synthesis {
            utterance,
            signal: SynthesisSignal::Ended,
        }
    }

    pub fn speech_error(utterance: UtteranceId, code: &str) -> Self {
        Event::Synthesis {
            utterance,
            signal: SynthesisSignal::Error(code.to_string()),
        }
    }
}
