use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Prompts;
use crate::kernel::intent::{parse, parse_date, Intent};
use crate::kernel::speech::recovery::RecognitionFailure;
use crate::pathway::PathwayEvent;

/// Position in the guided appointment capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormStep {
    NotStarted = 0,
    AwaitingDate = 1,
    AwaitingCaption = 2,
    AwaitingContent = 3,
    Complete = 4,
}

/// What the next recognition attempt of the dialog captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Listen {
    /// The value of the current field.
    Value,
    /// A navigation word (start / weiter / zurück / neue eingabe / fertig).
    Command,
}

/// Instructions from the form to whoever drives the turn scheduler.
#[derive(Debug, Clone)]
pub enum FormDirective {
    Speak { text: String, then: Listen },
    Listen(Listen),
    Status(String),
    /// The user's input was rejected; the message explains why.
    Rejected(String),
    Completed(PathwayEvent),
    Cancelled,
    /// Closed without result because the conversation cannot continue.
    Aborted { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedFields {
    pub date: Option<NaiveDateTime>,
    pub caption: Option<String>,
    pub content: Option<String>,
}

impl CollectedFields {
    fn clear_from(&mut self, step: FormStep) {
        if step <= FormStep::AwaitingDate {
            self.date = None;
        }
        if step <= FormStep::AwaitingCaption {
            self.caption = None;
        }
        if step <= FormStep::AwaitingContent {
            self.content = None;
        }
    }
}

/// Guided multi-step capture of one appointment:
/// date -> caption -> content -> finish, with every captured value confirmed
/// by an explicit navigation command.
#[derive(Debug, Clone)]
pub struct DialogState {
    step: FormStep,
    phase: Listen,
    collected: CollectedFields,
    last_input_valid: bool,
    prompts: Prompts,
}

impl DialogState {
    /// Opens the dialog: welcome turn, then wait for "start".
    pub fn open(prompts: Prompts) -> (Self, Vec<FormDirective>) {
        let mut state = Self {
            step: FormStep::NotStarted,
            phase: Listen::Command,
            collected: CollectedFields::default(),
            last_input_valid: true,
            prompts,
        };
        let directives = state.restart();
        (state, directives)
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn phase(&self) -> Listen {
        self.phase
    }

    pub fn collected(&self) -> &CollectedFields {
        &self.collected
    }

    pub fn last_input_valid(&self) -> bool {
        self.last_input_valid
    }

    pub fn on_heard(&mut self, listen: Listen, transcript: &str) -> Vec<FormDirective> {
        match listen {
            Listen::Value => self.on_value(transcript),
            Listen::Command => self.on_command(transcript),
        }
    }

    /// The user said nothing: listen again for the same thing.
    pub fn on_silence(&mut self, listen: Listen) -> Vec<FormDirective> {
        self.phase = listen;
        vec![FormDirective::Listen(listen)]
    }

    /// Transient recognition failure. Fatal ones never reach the form: the
    /// router escalates them and drops the dialog.
    pub fn on_recognition_error(&mut self, listen: Listen, failure: &RecognitionFailure) -> Vec<FormDirective> {
        let mut directives = vec![FormDirective::Status(failure.user_message().to_string())];
        match listen {
            Listen::Value => {
                self.last_input_valid = false;
                directives.extend(self.ask(self.step));
            }
            Listen::Command => {
                self.phase = Listen::Command;
                directives.push(FormDirective::Listen(Listen::Command));
            }
        }
        directives
    }

    /// Synthesis failed: the dialog cannot go on.
    pub fn on_speech_failed(&mut self, code: &str) -> Vec<FormDirective> {
        info!("Guided dialog aborted by synthesis error '{}' at {:?}", code, self.step);
        vec![FormDirective::Aborted {
            reason: format!("{} ({})", self.prompts.dialog_aborted, code),
        }]
    }

    fn on_value(&mut self, transcript: &str) -> Vec<FormDirective> {
        if parse(transcript) == Intent::CloseDialog {
            return vec![FormDirective::Cancelled];
        }

        let value = transcript.trim();
        if value.is_empty() {
            return self.on_silence(Listen::Value);
        }

        match self.step {
            FormStep::AwaitingDate => match parse_date(value) {
                Some(day) => {
                    self.collected.date = Some(day.and_time(chrono::NaiveTime::MIN));
                    self.accept_value()
                }
                None => {
                    debug!("Rejected date input at {:?}", self.step);
                    self.last_input_valid = false;
                    self.phase = Listen::Value;
                    vec![
                        FormDirective::Rejected(self.prompts.invalid_date.clone()),
                        FormDirective::Speak {
                            text: format!("{} {}", self.prompts.invalid_date, self.prompts.date_question),
                            then: Listen::Value,
                        },
                    ]
                }
            },
            FormStep::AwaitingCaption => {
                self.collected.caption = Some(value.to_string());
                self.accept_value()
            }
            FormStep::AwaitingContent => {
                self.collected.content = Some(value.to_string());
                self.accept_value()
            }
            FormStep::NotStarted | FormStep::Complete => self.on_silence(self.phase),
        }
    }

    fn accept_value(&mut self) -> Vec<FormDirective> {
        self.last_input_valid = true;
        self.phase = Listen::Command;
        let hint = if self.step == FormStep::AwaitingContent {
            self.prompts.finish_hint.clone()
        } else {
            self.prompts.command_hint.clone()
        };
        vec![FormDirective::Speak {
            text: hint,
            then: Listen::Command,
        }]
    }

    fn on_command(&mut self, transcript: &str) -> Vec<FormDirective> {
        let intent = parse(transcript);
        debug!("Dialog command {:?} at {:?}", intent.kind(), self.step);

        match (intent, self.step) {
            (Intent::CloseDialog, _) => vec![FormDirective::Cancelled],

            (Intent::ControlStart, FormStep::NotStarted) => self.ask(FormStep::AwaitingDate),

            (Intent::ControlNext, FormStep::AwaitingDate) if self.collected.date.is_some() => {
                self.ask(FormStep::AwaitingCaption)
            }
            (Intent::ControlNext, FormStep::AwaitingCaption) if self.collected.caption.is_some() => {
                self.ask(FormStep::AwaitingContent)
            }

            (Intent::ControlPrevious, FormStep::AwaitingDate) => self.restart(),
            (Intent::ControlPrevious, FormStep::AwaitingCaption) => self.ask(FormStep::AwaitingDate),
            (Intent::ControlPrevious, FormStep::AwaitingContent) => self.ask(FormStep::AwaitingCaption),

            (Intent::ControlRepeat, step @ (FormStep::AwaitingDate | FormStep::AwaitingCaption | FormStep::AwaitingContent)) => {
                self.ask(step)
            }

            (Intent::ControlFinish, FormStep::AwaitingContent) if self.collected.content.is_some() => self.complete(),

            // Out-of-range control words count as unrecognized.
            _ => {
                let message = self.prompts.invalid_command(&transcript.trim().to_lowercase());
                self.phase = Listen::Command;
                vec![
                    FormDirective::Rejected(message.clone()),
                    FormDirective::Speak {
                        text: message,
                        then: Listen::Command,
                    },
                ]
            }
        }
    }

    /// Asks the question of `step`. Values of `step` and later are discarded.
    fn ask(&mut self, step: FormStep) -> Vec<FormDirective> {
        let question = match step {
            FormStep::AwaitingDate => self.prompts.date_question.clone(),
            FormStep::AwaitingCaption => self.prompts.caption_question.clone(),
            FormStep::AwaitingContent => self.prompts.content_question.clone(),
            FormStep::NotStarted | FormStep::Complete => return self.restart(),
        };

        debug!("Dialog step {:?} -> {:?}", self.step, step);
        self.step = step;
        self.phase = Listen::Value;
        self.last_input_valid = false;
        self.collected.clear_from(step);
        vec![FormDirective::Speak {
            text: question,
            then: Listen::Value,
        }]
    }

    fn restart(&mut self) -> Vec<FormDirective> {
        self.step = FormStep::NotStarted;
        self.phase = Listen::Command;
        self.collected = CollectedFields::default();
        self.last_input_valid = true;
        vec![FormDirective::Speak {
            text: self.prompts.welcome.clone(),
            then: Listen::Command,
        }]
    }

    fn complete(&mut self) -> Vec<FormDirective> {
        let (Some(date), Some(header), Some(content)) = (
            self.collected.date,
            self.collected.caption.clone(),
            self.collected.content.clone(),
        ) else {
            return vec![FormDirective::Aborted {
                reason: self.prompts.dialog_aborted.clone(),
            }];
        };

        self.step = FormStep::Complete;
        info!("Guided dialog complete");
        vec![FormDirective::Completed(PathwayEvent::appointment(date, header, content))]
    }
}
