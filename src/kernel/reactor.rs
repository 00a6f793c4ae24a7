use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dialog::{DialogState, FormDirective, Listen};
use super::event::{Event, RequestId};
use super::intent::{parse, EventQuery, Intent};
use super::presence::{PresenceGraph, PresenceRequest, PresenceState};
use super::scheduler::{Authority, Delivery, SideEffect, TurnOutcome, TurnScheduler};
use super::speech::RecognitionFailure;
use super::telemetry::event::{DialogOutcome, SignalSource, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{Clock, Generation, SystemClock};
use crate::config::EngineConfig;
use crate::driver::Gateway;
use crate::pathway::PathwayEvent;

/// Continuation attached to every turn the reactor arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Router listens for a global command.
    Command,
    /// Farewell spoken; the session ends afterwards.
    Farewell,
    /// Help is open; only "dialog schließen" is honoured.
    HelpCommand,
    /// Turn belongs to the guided dialog.
    Form(Listen),
}

#[derive(Debug, Clone)]
enum PendingRequest {
    Show(EventQuery),
    Delete(EventQuery),
}

/// The command router.
///
/// Owns the always-on listening loop, the turn scheduler, the optional guided
/// dialog and the presence state. `tick_step` is pure with respect to I/O:
/// it consumes gateway/collaborator events and returns the side effects the
/// driver has to execute.
pub struct Reactor {
    pub receiver: mpsc::Receiver<Event>,
    pub telemetry: TelemetryRecorder,
    config: EngineConfig,
    scheduler: TurnScheduler<Cue>,
    presence: PresenceState,
    dialog: Option<DialogState>,
    clock: Box<dyn Clock>,
    requests: Generation,
    pending: HashMap<RequestId, PendingRequest>,
}

impl Reactor {
    pub fn new(receiver: mpsc::Receiver<Event>, config: EngineConfig) -> Self {
        Self {
            receiver,
            telemetry: TelemetryRecorder::new(),
            config,
            scheduler: TurnScheduler::new(),
            presence: PresenceState::Dormant,
            dialog: None,
            clock: Box::new(SystemClock),
            requests: Generation::new(),
            pending: HashMap::new(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn presence(&self) -> PresenceState {
        self.presence
    }

    pub fn dialog(&self) -> Option<&DialogState> {
        self.dialog.as_ref()
    }

    pub fn scheduler(&self) -> &TurnScheduler<Cue> {
        &self.scheduler
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Engine confirmed that the live recognition attempt is running.
    pub fn is_listening(&self) -> bool {
        self.scheduler.is_listening()
    }

    /// Applies one batch of events. Never awaits and never performs I/O.
    pub fn tick_step(&mut self, events: Vec<Event>) -> Vec<SideEffect> {
        let mut effects = Vec::new();
        for event in events {
            self.handle(event, &mut effects);
        }
        effects
    }

    /// Async driver loop: drain events, step, execute effects on the gateway.
    pub async fn run<G: Gateway>(&mut self, gateway: &mut G, shutdown: CancellationToken) {
        info!("Reactor pipeline started. Tick: {}ms", self.config.tick_ms);

        let mut cadence = interval(Duration::from_millis(self.config.tick_ms.max(1)));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = cadence.tick() => {}
            }

            let mut events = Vec::new();
            while let Ok(event) = self.receiver.try_recv() {
                events.push(event);
            }
            events.extend(gateway.poll());
            if events.is_empty() {
                continue;
            }

            for effect in self.tick_step(events) {
                if let Err(e) = gateway.execute(effect) {
                    warn!("Gateway failed to execute effect: {}", e);
                }
            }
        }

        info!("Reactor shutting down");
        for effect in self.tick_step(vec![Event::Deactivate]) {
            if let Err(e) = gateway.execute(effect) {
                warn!("Gateway failed during shutdown: {}", e);
            }
        }
    }

    fn handle(&mut self, event: Event, effects: &mut Vec<SideEffect>) {
        match event {
            Event::Activate => self.activate(effects),
            Event::Deactivate => self.deactivate(effects),
            Event::Recognition { attempt, signal } => {
                let delivery = self.scheduler.on_recognition(attempt, signal, effects);
                self.deliver(delivery, SignalSource::Recognition, effects);
            }
            Event::Synthesis { utterance, signal } => {
                let delivery = self.scheduler.on_synthesis(utterance, signal, effects);
                self.deliver(delivery, SignalSource::Synthesis, effects);
            }
            Event::ShowResolved { request, found } => self.on_show_resolved(request, found, effects),
            Event::DeleteResolved { request, deleted } => self.on_delete_resolved(request, deleted, effects),
            Event::HelpClosed => self.close_help(effects),
        }
    }

    fn deliver(&mut self, delivery: Delivery<Cue>, source: SignalSource, effects: &mut Vec<SideEffect>) {
        match delivery {
            Delivery::Outcome(outcome) => self.on_outcome(outcome, effects),
            Delivery::Absorbed => {}
            Delivery::Stale => self.telemetry.record(TelemetryEvent::StaleSignalDropped { source }),
        }
    }

    fn on_outcome(&mut self, outcome: TurnOutcome<Cue>, effects: &mut Vec<SideEffect>) {
        match outcome {
            TurnOutcome::Heard { owner: Authority::Router, cue: Cue::Command, transcript } => {
                self.dispatch(&transcript, effects);
            }
            TurnOutcome::Heard { owner: Authority::Help, transcript, .. } => {
                if parse(&transcript) == Intent::CloseDialog {
                    effects.push(SideEffect::CloseHelp);
                    self.close_help(effects);
                } else {
                    self.listen(Authority::Help, Cue::HelpCommand, effects);
                }
            }
            TurnOutcome::Heard { owner: Authority::Form, cue: Cue::Form(listen), transcript } => {
                self.drive_form(effects, |dialog| dialog.on_heard(listen, &transcript));
            }
            TurnOutcome::Heard { owner, cue, .. } => {
                warn!("Unexpected transcript for {:?} ({:?}); re-arming", owner, cue);
                self.listen(owner, cue, effects);
            }

            TurnOutcome::Silence { owner: Authority::Form, cue: Cue::Form(listen) } => {
                self.drive_form(effects, |dialog| dialog.on_silence(listen));
            }
            TurnOutcome::Silence { owner, cue } => self.listen(owner, cue, effects),

            TurnOutcome::RecognitionFailed { owner, cue, code } => {
                let failure = RecognitionFailure::classify(&code, &self.config.recovery);
                warn!("Recognition error '{}' for {:?} ({:?})", code, owner, failure.recovery);
                self.telemetry.record(TelemetryEvent::RecognitionFailed {
                    kind: failure.kind,
                    escalated: failure.is_fatal(),
                });

                if failure.is_fatal() {
                    effects.push(SideEffect::Status(failure.user_message().to_string()));
                    self.escalate(effects);
                    return;
                }

                match (owner, cue) {
                    (Authority::Form, Cue::Form(listen)) => {
                        self.drive_form(effects, |dialog| dialog.on_recognition_error(listen, &failure));
                    }
                    (owner, cue) => {
                        effects.push(SideEffect::Status(failure.user_message().to_string()));
                        self.listen(owner, cue, effects);
                    }
                }
            }

            TurnOutcome::Spoken { owner, then: Cue::Farewell } => self.end_session(owner, effects),
            TurnOutcome::Spoken { owner, then } => self.listen(owner, then, effects),

            TurnOutcome::SpeechFailed { owner, then, text, code } => {
                warn!("Synthesis error '{}' for {:?}", code, owner);
                self.telemetry.record(TelemetryEvent::SpeechFailed);
                match (owner, then) {
                    (Authority::Form, _) => self.drive_form(effects, |dialog| dialog.on_speech_failed(&code)),
                    (owner, Cue::Farewell) => {
                        // The farewell text is already on screen.
                        effects.push(SideEffect::Status(code));
                        self.end_session(owner, effects);
                    }
                    (owner, then) => {
                        effects.push(SideEffect::Status(format!("{} {}", code, text)));
                        self.listen(owner, then, effects);
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, transcript: &str, effects: &mut Vec<SideEffect>) {
        let intent = parse(transcript);
        info!("Dispatching {:?}", intent.kind());
        self.telemetry.record(TelemetryEvent::IntentDispatched { kind: intent.kind() });

        match intent {
            Intent::CreateAppointment => self.open_form(effects),
            Intent::AddSymptom { symptom } => {
                if symptom.trim().is_empty() {
                    effects.push(SideEffect::Status(self.config.prompts.empty_symptom.clone()));
                    self.say(Authority::Router, self.config.prompts.empty_symptom.clone(), Cue::Command, effects);
                } else {
                    let record = PathwayEvent::symptom_bundle(self.clock.now(), symptom);
                    effects.push(SideEffect::EmitRecord(record));
                    self.say(Authority::Router, self.config.prompts.symptom_added.clone(), Cue::Command, effects);
                }
            }
            Intent::ShowEvent(query) => {
                if !query.is_complete() {
                    self.reject_query(effects);
                    return;
                }
                let request = RequestId(self.requests.advance());
                self.pending.insert(request, PendingRequest::Show(query.clone()));
                effects.push(SideEffect::RequestShow { request, query });
                self.listen(Authority::Router, Cue::Command, effects);
            }
            Intent::DeleteEvent(query) => {
                if !query.is_complete() {
                    self.reject_query(effects);
                    return;
                }
                // Listening resumes after the outcome has been spoken.
                let request = RequestId(self.requests.advance());
                self.pending.insert(request, PendingRequest::Delete(query.clone()));
                effects.push(SideEffect::RequestDelete { request, query });
            }
            Intent::Help => self.open_help(effects),
            Intent::EndSession => {
                effects.push(SideEffect::Status(self.config.prompts.farewell.clone()));
                self.say(Authority::Router, self.config.prompts.farewell.clone(), Cue::Farewell, effects);
            }
            Intent::CloseDialog
            | Intent::ControlNext
            | Intent::ControlPrevious
            | Intent::ControlRepeat
            | Intent::ControlStart
            | Intent::ControlFinish
            | Intent::Unrecognized => {
                effects.push(SideEffect::Status(self.config.prompts.not_understood.clone()));
                self.say(Authority::Router, self.config.prompts.not_understood.clone(), Cue::Command, effects);
            }
        }
    }

    fn reject_query(&mut self, effects: &mut Vec<SideEffect>) {
        effects.push(SideEffect::Status(self.config.prompts.invalid_query.clone()));
        self.say(Authority::Router, self.config.prompts.invalid_query.clone(), Cue::Command, effects);
    }

    fn activate(&mut self, effects: &mut Vec<SideEffect>) {
        if !self.transition(PresenceRequest::Activate) {
            return;
        }
        self.scheduler.acquire(Authority::Router, effects);
        self.listen(Authority::Router, Cue::Command, effects);
    }

    fn deactivate(&mut self, effects: &mut Vec<SideEffect>) {
        let was = self.presence;
        if !self.transition(PresenceRequest::Deactivate) {
            return;
        }
        self.shut_down_turns(was, effects);
    }

    /// Recognition cannot work: stop the loop instead of retrying blindly.
    fn escalate(&mut self, effects: &mut Vec<SideEffect>) {
        let was = self.presence;
        if !self.transition(PresenceRequest::RecognitionUnavailable) {
            return;
        }
        self.shut_down_turns(was, effects);
    }

    fn end_session(&mut self, owner: Authority, effects: &mut Vec<SideEffect>) {
        self.transition(PresenceRequest::EndSession);
        self.scheduler.release(owner, effects);
    }

    fn shut_down_turns(&mut self, was: PresenceState, effects: &mut Vec<SideEffect>) {
        if self.dialog.take().is_some() {
            self.telemetry.record(TelemetryEvent::DialogFinished {
                outcome: DialogOutcome::Aborted,
            });
        }
        if was == PresenceState::Assisting {
            effects.push(SideEffect::CloseHelp);
        }
        self.scheduler.cancel(effects);
        if let Some(holder) = self.scheduler.authority() {
            self.scheduler.release(holder, effects);
        }
    }

    fn open_help(&mut self, effects: &mut Vec<SideEffect>) {
        if !self.transition(PresenceRequest::OpenHelp) {
            return;
        }
        self.scheduler.acquire(Authority::Help, effects);
        effects.push(SideEffect::OpenHelp);
        self.say(Authority::Help, self.config.prompts.help_opened.clone(), Cue::HelpCommand, effects);
    }

    fn close_help(&mut self, effects: &mut Vec<SideEffect>) {
        if !self.transition(PresenceRequest::CloseHelp) {
            return;
        }
        self.scheduler.acquire(Authority::Router, effects);
        self.listen(Authority::Router, Cue::Command, effects);
    }

    fn open_form(&mut self, effects: &mut Vec<SideEffect>) {
        if !self.transition(PresenceRequest::OpenDialog) {
            return;
        }
        self.scheduler.acquire(Authority::Form, effects);

        let (dialog, directives) = DialogState::open(self.config.prompts.clone());
        self.telemetry.record(TelemetryEvent::FormStepEntered { step: dialog.step() });
        self.dialog = Some(dialog);
        self.apply_form(directives, effects);
    }

    /// Runs one dialog transition and carries out its directives.
    fn drive_form<F>(&mut self, effects: &mut Vec<SideEffect>, step: F)
    where
        F: FnOnce(&mut DialogState) -> Vec<FormDirective>,
    {
        let Some(dialog) = self.dialog.as_mut() else {
            warn!("Dialog turn delivered without an open dialog");
            return;
        };

        let before = dialog.step();
        let directives = step(dialog);
        let after = dialog.step();

        if after != before {
            self.telemetry.record(TelemetryEvent::FormStepEntered { step: after });
        }
        if directives.iter().any(|d| matches!(d, FormDirective::Rejected(_))) {
            self.telemetry.record(TelemetryEvent::InputRejected { step: after });
        }

        self.apply_form(directives, effects);
    }

    fn apply_form(&mut self, directives: Vec<FormDirective>, effects: &mut Vec<SideEffect>) {
        for directive in directives {
            match directive {
                FormDirective::Speak { text, then } => self.say(Authority::Form, text, Cue::Form(then), effects),
                FormDirective::Listen(listen) => self.listen(Authority::Form, Cue::Form(listen), effects),
                FormDirective::Status(message) | FormDirective::Rejected(message) => {
                    effects.push(SideEffect::Status(message))
                }
                FormDirective::Completed(record) => self.close_form(FormClose::Completed(record), effects),
                FormDirective::Cancelled => self.close_form(FormClose::Cancelled, effects),
                FormDirective::Aborted { reason } => self.close_form(FormClose::Aborted(reason), effects),
            }
        }
    }

    /// Hands the scheduler back to the router once the dialog is over.
    fn close_form(&mut self, close: FormClose, effects: &mut Vec<SideEffect>) {
        if self.dialog.take().is_none() {
            return;
        }
        let outcome = match &close {
            FormClose::Completed(_) => DialogOutcome::Completed,
            FormClose::Cancelled => DialogOutcome::Cancelled,
            FormClose::Aborted(_) => DialogOutcome::Aborted,
        };
        info!("Guided dialog closed: {:?}", outcome);
        self.telemetry.record(TelemetryEvent::DialogFinished { outcome });

        self.transition(PresenceRequest::CloseDialog);
        self.scheduler.acquire(Authority::Router, effects);

        match close {
            FormClose::Completed(record) => {
                effects.push(SideEffect::EmitRecord(record));
                self.say(
                    Authority::Router,
                    self.config.prompts.appointment_created.clone(),
                    Cue::Command,
                    effects,
                );
            }
            FormClose::Aborted(reason) => {
                effects.push(SideEffect::Status(reason));
                self.listen(Authority::Router, Cue::Command, effects);
            }
            FormClose::Cancelled => self.listen(Authority::Router, Cue::Command, effects),
        }
    }

    fn on_show_resolved(&mut self, request: RequestId, found: bool, effects: &mut Vec<SideEffect>) {
        match self.pending.remove(&request) {
            Some(PendingRequest::Show(query)) => {
                if found {
                    debug!("Show request {:?} resolved", request);
                    return;
                }
                let date = query
                    .date
                    .map(|day| day.format("%d.%m.%Y").to_string())
                    .unwrap_or(query.raw_date);
                let message = self.config.prompts.not_found(&query.name, &date);
                self.announce(message, effects);
            }
            other => self.drop_answer(request, other),
        }
    }

    fn on_delete_resolved(&mut self, request: RequestId, deleted: bool, effects: &mut Vec<SideEffect>) {
        match self.pending.remove(&request) {
            Some(PendingRequest::Delete(_)) => {
                let message = if deleted {
                    self.config.prompts.deleted.clone()
                } else {
                    self.config.prompts.delete_failed.clone()
                };
                self.announce(message, effects);
            }
            other => self.drop_answer(request, other),
        }
    }

    fn drop_answer(&mut self, request: RequestId, unmatched: Option<PendingRequest>) {
        if let Some(pending) = unmatched {
            // Wrong kind of answer; keep waiting for the right one.
            self.pending.insert(request, pending);
        }
        debug!("Dropping unmatched collaborator answer {:?}", request);
        self.telemetry.record(TelemetryEvent::StaleSignalDropped {
            source: SignalSource::Collaborator,
        });
    }

    /// Speaks a collaborator outcome if the router holds the conversation,
    /// otherwise only displays it.
    fn announce(&mut self, message: String, effects: &mut Vec<SideEffect>) {
        effects.push(SideEffect::Status(message.clone()));
        if self.presence == PresenceState::Attentive && self.scheduler.authority() == Some(Authority::Router) {
            self.say(Authority::Router, message, Cue::Command, effects);
        }
    }

    fn listen(&mut self, who: Authority, cue: Cue, effects: &mut Vec<SideEffect>) {
        if let Err(e) = self.scheduler.listen_once(who, cue, effects) {
            error!("Cannot arm recognition: {}", e);
        }
    }

    fn say(&mut self, who: Authority, text: String, then: Cue, effects: &mut Vec<SideEffect>) {
        if let Err(e) = self.scheduler.speak_then(who, &text, then, effects) {
            error!("Cannot speak: {}", e);
        }
    }

    fn transition(&mut self, request: PresenceRequest) -> bool {
        match PresenceGraph::transition(self.presence, request) {
            Some(next) => {
                if next != self.presence {
                    info!("Presence {:?} -> {:?}", self.presence, next);
                    self.telemetry.record(TelemetryEvent::PresenceTransition {
                        from: self.presence,
                        to: next,
                    });
                }
                self.presence = next;
                true
            }
            None => {
                debug!("Presence {:?} ignores {:?}", self.presence, request);
                false
            }
        }
    }
}

#[derive(Debug)]
enum FormClose {
    Completed(PathwayEvent),
    Cancelled,
    Aborted(String),
}
