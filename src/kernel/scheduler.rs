use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::event::{AttemptId, RecognitionSignal, RequestId, SynthesisSignal, UtteranceId};
use super::time::Generation;
use crate::error::SchedulerError;
use crate::pathway::{EventQuery, PathwayEvent};

/// Components that can drive the speech engines. Exactly one holds the
/// scheduler at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authority {
    Router,
    Help,
    Form,
}

/// Everything the kernel asks the outside world to do. Executed by the driver.
#[derive(Debug, Clone)]
pub enum SideEffect {
    StartRecognition(AttemptId),
    StopRecognition(AttemptId),
    Speak { utterance: UtteranceId, text: String },
    EmitRecord(PathwayEvent),
    RequestShow { request: RequestId, query: EventQuery },
    RequestDelete { request: RequestId, query: EventQuery },
    OpenHelp,
    CloseHelp,
    /// Transient on-screen message.
    Status(String),
}

/// Bookkeeping of the one armed recognition attempt.
#[derive(Debug, Clone)]
pub struct ListeningSession<C> {
    pub attempt: AttemptId,
    pub owner: Authority,
    pub cue: C,
    /// Engine confirmed `started` for this attempt.
    pub running: bool,
}

#[derive(Debug, Clone)]
struct PendingSpeech<C> {
    utterance: UtteranceId,
    owner: Authority,
    text: String,
    then: C,
}

/// Terminal outcome of a turn, handed back to the authority that armed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome<C> {
    Heard { owner: Authority, cue: C, transcript: String },
    /// Recognition ended without a final result.
    Silence { owner: Authority, cue: C },
    RecognitionFailed { owner: Authority, cue: C, code: String },
    Spoken { owner: Authority, then: C },
    SpeechFailed { owner: Authority, then: C, text: String, code: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery<C> {
    Outcome(TurnOutcome<C>),
    /// Signal belonged to the live turn but does not end it.
    Absorbed,
    /// Signal from a torn-down attempt or superseded utterance. Dropped.
    Stale,
}

/// Serializes speak and listen turns over the shared engines.
///
/// `C` is the continuation cue the caller attaches to a turn; it comes back
/// unchanged in the turn's outcome, so the caller dispatches on data instead
/// of registered callbacks. Every arm first tears down the previous session,
/// and every signal is checked against the live attempt/utterance id.
#[derive(Debug)]
pub struct TurnScheduler<C> {
    attempts: Generation,
    utterances: Generation,
    authority: Option<Authority>,
    session: Option<ListeningSession<C>>,
    speech: Option<PendingSpeech<C>>,
    /// Last attempt that ended on its own. Engines follow a result or an
    /// error with `ended`; those trailers are not stale.
    finished: Option<AttemptId>,
}

impl<C: Clone + Debug> TurnScheduler<C> {
    pub fn new() -> Self {
        Self {
            attempts: Generation::new(),
            utterances: Generation::new(),
            authority: None,
            session: None,
            speech: None,
            finished: None,
        }
    }

    pub fn authority(&self) -> Option<Authority> {
        self.authority
    }

    pub fn session(&self) -> Option<&ListeningSession<C>> {
        self.session.as_ref()
    }

    /// A recognition attempt is armed (it may not have reported `started` yet).
    pub fn is_armed(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.running)
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_some()
    }

    /// Hands scheduling authority to `who`. The previous holder's session is
    /// stopped and its pending utterance forgotten before anything new is armed.
    pub fn acquire(&mut self, who: Authority, effects: &mut Vec<SideEffect>) {
        if self.authority == Some(who) {
            return;
        }
        debug!("Scheduler authority {:?} -> {:?}", self.authority, who);
        self.teardown(effects);
        self.forget_speech();
        self.authority = Some(who);
    }

    pub fn release(&mut self, who: Authority, effects: &mut Vec<SideEffect>) {
        if self.authority != Some(who) {
            return;
        }
        debug!("Scheduler authority {:?} released", who);
        self.teardown(effects);
        self.forget_speech();
        self.authority = None;
    }

    /// Speaks `text`; `then` is returned in `TurnOutcome::Spoken` once the
    /// engine reports end of speech. Listening is stopped first.
    pub fn speak_then(
        &mut self,
        who: Authority,
        text: &str,
        then: C,
        effects: &mut Vec<SideEffect>,
    ) -> Result<UtteranceId, SchedulerError> {
        self.check_holder(who)?;
        self.teardown(effects);

        let utterance = UtteranceId(self.utterances.advance());
        debug!("Speaking {:?} for {:?}, then {:?}", utterance, who, then);
        self.speech = Some(PendingSpeech {
            utterance,
            owner: who,
            text: text.to_string(),
            then,
        });
        effects.push(SideEffect::Speak {
            utterance,
            text: text.to_string(),
        });
        Ok(utterance)
    }

    /// Arms exactly one recognition attempt. Any previous attempt is stopped
    /// and forgotten first, so restarting is idempotent.
    pub fn listen_once(
        &mut self,
        who: Authority,
        cue: C,
        effects: &mut Vec<SideEffect>,
    ) -> Result<AttemptId, SchedulerError> {
        self.check_holder(who)?;
        self.teardown(effects);
        self.forget_speech();

        let attempt = AttemptId(self.attempts.advance());
        debug!("Arming {:?} for {:?} ({:?})", attempt, who, cue);
        self.session = Some(ListeningSession {
            attempt,
            owner: who,
            cue,
            running: false,
        });
        effects.push(SideEffect::StartRecognition(attempt));
        Ok(attempt)
    }

    /// Drops the live turn without producing an outcome.
    pub fn cancel(&mut self, effects: &mut Vec<SideEffect>) {
        self.teardown(effects);
        self.forget_speech();
    }

    pub fn on_recognition(
        &mut self,
        attempt: AttemptId,
        signal: RecognitionSignal,
        effects: &mut Vec<SideEffect>,
    ) -> Delivery<C> {
        let live = self.session.as_ref().is_some_and(|session| session.attempt == attempt);
        if !live {
            if self.finished == Some(attempt)
                && matches!(signal, RecognitionSignal::Ended | RecognitionSignal::Error(_))
            {
                debug!("Absorbing trailing {:?} from finished {:?}", signal, attempt);
                return Delivery::Absorbed;
            }
            debug!("Dropping stale recognition signal {:?} from {:?}", signal, attempt);
            return Delivery::Stale;
        }

        match signal {
            RecognitionSignal::Started => {
                if let Some(session) = self.session.as_mut() {
                    session.running = true;
                }
                Delivery::Absorbed
            }
            RecognitionSignal::Result { is_final: false, .. } => Delivery::Absorbed,
            RecognitionSignal::Result { transcript, .. } => {
                let Some(session) = self.finish() else {
                    return Delivery::Stale;
                };
                effects.push(SideEffect::StopRecognition(attempt));

                let transcript = transcript.trim();
                if transcript.is_empty() {
                    Delivery::Outcome(TurnOutcome::Silence {
                        owner: session.owner,
                        cue: session.cue,
                    })
                } else {
                    Delivery::Outcome(TurnOutcome::Heard {
                        owner: session.owner,
                        cue: session.cue,
                        transcript: transcript.to_string(),
                    })
                }
            }
            RecognitionSignal::Ended => match self.finish() {
                Some(session) => Delivery::Outcome(TurnOutcome::Silence {
                    owner: session.owner,
                    cue: session.cue,
                }),
                None => Delivery::Stale,
            },
            RecognitionSignal::Error(code) => match self.finish() {
                Some(session) => Delivery::Outcome(TurnOutcome::RecognitionFailed {
                    owner: session.owner,
                    cue: session.cue,
                    code,
                }),
                None => Delivery::Stale,
            },
        }
    }

    pub fn on_synthesis(
        &mut self,
        utterance: UtteranceId,
        signal: SynthesisSignal,
        effects: &mut Vec<SideEffect>,
    ) -> Delivery<C> {
        let live = self.speech.as_ref().is_some_and(|speech| speech.utterance == utterance);
        if !live {
            debug!("Dropping stale synthesis signal {:?} from {:?}", signal, utterance);
            return Delivery::Stale;
        }

        match signal {
            SynthesisSignal::Started => {
                // Never listen while the system talks.
                self.teardown(effects);
                Delivery::Absorbed
            }
            SynthesisSignal::Ended => match self.speech.take() {
                Some(speech) => Delivery::Outcome(TurnOutcome::Spoken {
                    owner: speech.owner,
                    then: speech.then,
                }),
                None => Delivery::Stale,
            },
            SynthesisSignal::Error(code) => match self.speech.take() {
                Some(speech) => Delivery::Outcome(TurnOutcome::SpeechFailed {
                    owner: speech.owner,
                    then: speech.then,
                    text: speech.text,
                    code,
                }),
                None => Delivery::Stale,
            },
        }
    }

    fn check_holder(&self, who: Authority) -> Result<(), SchedulerError> {
        if self.authority == Some(who) {
            Ok(())
        } else {
            Err(SchedulerError {
                requested: who,
                holder: self.authority,
            })
        }
    }

    /// The live attempt ended by itself (result, silence or error).
    fn finish(&mut self) -> Option<ListeningSession<C>> {
        let session = self.session.take()?;
        self.finished = Some(session.attempt);
        Some(session)
    }

    /// Single release point of the listening session.
    fn teardown(&mut self, effects: &mut Vec<SideEffect>) {
        if let Some(session) = self.session.take() {
            debug!("Tearing down {:?} ({:?})", session.attempt, session.cue);
            effects.push(SideEffect::StopRecognition(session.attempt));
        }
    }

    fn forget_speech(&mut self) {
        if let Some(speech) = self.speech.take() {
            debug!("Forgetting pending {:?} ({:?})", speech.utterance, speech.then);
        }
    }
}

impl<C: Clone + Debug> Default for TurnScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}
