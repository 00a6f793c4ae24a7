use chrono::{NaiveDate, NaiveDateTime};
use pathvoice::config::EngineConfig;
use pathvoice::kernel::dialog::FormStep;
use pathvoice::kernel::event::{AttemptId, Event, RecognitionSignal, RequestId, UtteranceId};
use pathvoice::kernel::presence::PresenceState;
use pathvoice::kernel::reactor::Reactor;
use pathvoice::kernel::scheduler::{Authority, SideEffect};
use pathvoice::kernel::time::FixedClock;
use pathvoice::pathway::{EventContent, PathwayEventType};
use tokio::sync::mpsc;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(10, 30, 0).unwrap()
}

fn setup() -> (mpsc::Sender<Event>, Reactor) {
    let (tx, rx) = mpsc::channel(100);
    let reactor = Reactor::new(rx, EngineConfig::default()).with_clock(FixedClock(now()));
    (tx, reactor)
}

fn started(effects: &[SideEffect]) -> Option<AttemptId> {
    effects.iter().rev().find_map(|e| match e {
        SideEffect::StartRecognition(a) => Some(*a),
        _ => None,
    })
}

fn speech(effects: &[SideEffect]) -> Option<(UtteranceId, String)> {
    effects.iter().rev().find_map(|e| match e {
        SideEffect::Speak { utterance, text } => Some((*utterance, text.clone())),
        _ => None,
    })
}

fn statuses(effects: &[SideEffect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Status(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

/// Switches the microphone on and returns the armed attempt.
fn activate(reactor: &mut Reactor) -> AttemptId {
    let effects = reactor.tick_step(vec![Event::Activate]);
    started(&effects).expect("Activation must arm recognition")
}

/// Delivers the transcript and plays back every utterance until the next
/// attempt is armed (or nothing is armed anymore).
fn say(reactor: &mut Reactor, attempt: AttemptId, text: &str) -> (Vec<SideEffect>, Option<AttemptId>) {
    let mut all = reactor.tick_step(vec![Event::heard(attempt, text)]);
    let mut effects = all.clone();
    loop {
        if let Some(next) = started(&effects) {
            return (all, Some(next));
        }
        let Some((utterance, _)) = speech(&effects) else {
            return (all, None);
        };
        effects = reactor.tick_step(vec![Event::spoken(utterance)]);
        all.extend(effects.clone());
    }
}

/// Opens the guided dialog and answers "start".
fn open_dialog(reactor: &mut Reactor) -> AttemptId {
    let attempt = activate(reactor);
    let (_, attempt) = say(reactor, attempt, "neuer termin");
    let (_, attempt) = say(reactor, attempt.expect("welcome turn"), "start");
    attempt.expect("date turn")
}

#[tokio::test]
async fn test_activation_arms_router() {
    let (_tx, mut reactor) = setup();
    assert_eq!(reactor.presence(), PresenceState::Dormant);

    let attempt = activate(&mut reactor);
    assert_eq!(reactor.presence(), PresenceState::Attentive);
    assert_eq!(reactor.scheduler().authority(), Some(Authority::Router));

    reactor.tick_step(vec![Event::Recognition {
        attempt,
        signal: RecognitionSignal::Started,
    }]);
    assert!(reactor.is_listening(), "Listening indicator follows the engine's started signal");

    let effects = reactor.tick_step(vec![Event::Activate]);
    assert!(effects.is_empty(), "Second activation is a no-op");
}

#[tokio::test]
async fn test_new_appointment_reaches_date_step() {
    let (_tx, mut reactor) = setup();
    open_dialog(&mut reactor);

    assert_eq!(reactor.presence(), PresenceState::Guiding);
    assert_eq!(reactor.scheduler().authority(), Some(Authority::Form));
    assert_eq!(reactor.dialog().map(|d| d.step()), Some(FormStep::AwaitingDate));
}

#[tokio::test]
async fn test_full_dialog_emits_appointment() {
    let (_tx, mut reactor) = setup();
    let prompts = reactor.config().prompts.clone();
    let attempt = open_dialog(&mut reactor);

    let (_, attempt) = say(&mut reactor, attempt, "01.05.2024");
    let (_, attempt) = say(&mut reactor, attempt.unwrap(), "weiter");
    let (_, attempt) = say(&mut reactor, attempt.unwrap(), "Zahnarzt");
    let (_, attempt) = say(&mut reactor, attempt.unwrap(), "weiter");
    let (_, attempt) = say(&mut reactor, attempt.unwrap(), "Kontrolle");
    let (effects, attempt) = say(&mut reactor, attempt.unwrap(), "fertig");

    let record = effects
        .iter()
        .find_map(|e| match e {
            SideEffect::EmitRecord(r) => Some(r.clone()),
            _ => None,
        })
        .expect("Appointment record");
    assert_eq!(record.kind, PathwayEventType::Appointment);
    assert_eq!(record.header, "Zahnarzt");
    assert!(effects
        .iter()
        .any(|e| matches!(e, SideEffect::Speak { text, .. } if *text == prompts.appointment_created)));

    assert!(attempt.is_some(), "Router listens again after the dialog");
    assert_eq!(reactor.presence(), PresenceState::Attentive);
    assert!(reactor.dialog().is_none());
    assert_eq!(reactor.telemetry.snapshot().dialog_stats.completed, 1);
}

#[tokio::test]
async fn test_dialog_ignores_global_commands() {
    let (_tx, mut reactor) = setup();
    let attempt = open_dialog(&mut reactor);

    // "hilfe" is a value inside the dialog, not a router command.
    let (effects, _) = say(&mut reactor, attempt, "hilfe");
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::OpenHelp)));
    assert_eq!(reactor.presence(), PresenceState::Guiding);
}

#[tokio::test]
async fn test_close_dialog_returns_to_router() {
    let (_tx, mut reactor) = setup();
    let attempt = open_dialog(&mut reactor);

    let (effects, attempt) = say(&mut reactor, attempt, "dialog schließen");
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::EmitRecord(_))));
    assert!(attempt.is_some());
    assert_eq!(reactor.presence(), PresenceState::Attentive);
    assert_eq!(reactor.scheduler().authority(), Some(Authority::Router));
    assert_eq!(reactor.telemetry.snapshot().dialog_stats.cancelled, 1);
}

#[tokio::test]
async fn test_symptom_is_recorded_with_current_time() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);

    let (effects, attempt) = say(&mut reactor, attempt, "Neues Symptom Kopfschmerzen");
    let record = effects
        .iter()
        .find_map(|e| match e {
            SideEffect::EmitRecord(r) => Some(r.clone()),
            _ => None,
        })
        .expect("Symptom bundle");
    assert_eq!(record.kind, PathwayEventType::SymptomBundle);
    assert_eq!(record.date, now());
    assert_eq!(record.content, EventContent::Symptoms(vec!["Kopfschmerzen".to_string()]));
    assert!(attempt.is_some());
}

#[tokio::test]
async fn test_empty_symptom_creates_nothing() {
    let (_tx, mut reactor) = setup();
    let prompts = reactor.config().prompts.clone();
    let attempt = activate(&mut reactor);

    let (effects, attempt) = say(&mut reactor, attempt, "neues symptom");
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::EmitRecord(_))));
    assert_eq!(statuses(&effects), vec![prompts.empty_symptom]);
    assert!(attempt.is_some());
}

#[tokio::test]
async fn test_delete_not_found_is_spoken_and_listening_resumes() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::heard(attempt, "lösche zahnarzt am 01.05.2024")]);
    let request = effects
        .iter()
        .find_map(|e| match e {
            SideEffect::RequestDelete { request, query } => {
                assert_eq!(query.name, "zahnarzt");
                Some(*request)
            }
            _ => None,
        })
        .expect("Delete request");
    assert!(started(&effects).is_none(), "Router waits for the delete outcome");

    let effects = reactor.tick_step(vec![Event::DeleteResolved {
        request,
        deleted: false,
    }]);
    let (utterance, text) = speech(&effects).expect("Outcome is spoken");
    assert!(text.contains("kein Event mit diesem Namen"), "Got: {}", text);

    let effects = reactor.tick_step(vec![Event::spoken(utterance)]);
    let attempt = started(&effects).expect("Listening resumes after the message");
    reactor.tick_step(vec![Event::Recognition {
        attempt,
        signal: RecognitionSignal::Started,
    }]);
    assert!(reactor.is_listening());
}

#[tokio::test]
async fn test_delete_success_is_confirmed() {
    let (_tx, mut reactor) = setup();
    let prompts = reactor.config().prompts.clone();
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::heard(attempt, "lösche zahnarzt am 01.05.2024")]);
    let request = effects
        .iter()
        .find_map(|e| match e {
            SideEffect::RequestDelete { request, .. } => Some(*request),
            _ => None,
        })
        .unwrap();

    let effects = reactor.tick_step(vec![Event::DeleteResolved { request, deleted: true }]);
    assert_eq!(speech(&effects).map(|(_, t)| t), Some(prompts.deleted));
}

#[tokio::test]
async fn test_show_not_found_names_event() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::heard(attempt, "zeige zahnarzt am 01.05.2024")]);
    let request = effects
        .iter()
        .find_map(|e| match e {
            SideEffect::RequestShow { request, .. } => Some(*request),
            _ => None,
        })
        .expect("Show request");
    assert!(started(&effects).is_some(), "Showing does not block listening");

    let effects = reactor.tick_step(vec![Event::ShowResolved { request, found: false }]);
    assert_eq!(
        statuses(&effects),
        vec!["Es gibt kein Event mit dem Namen zahnarzt zum Datum 01.05.2024.".to_string()]
    );
}

#[tokio::test]
async fn test_query_with_bad_date_is_rejected() {
    let (_tx, mut reactor) = setup();
    let prompts = reactor.config().prompts.clone();
    let attempt = activate(&mut reactor);

    let (effects, attempt) = say(&mut reactor, attempt, "lösche zahnarzt am morgen früh");
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::RequestDelete { .. })));
    assert_eq!(statuses(&effects), vec![prompts.invalid_query]);
    assert!(attempt.is_some());
}

#[tokio::test]
async fn test_unknown_answer_is_dropped() {
    let (_tx, mut reactor) = setup();
    activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::DeleteResolved {
        request: RequestId(42),
        deleted: true,
    }]);
    assert!(effects.is_empty());
    assert_eq!(reactor.telemetry.snapshot().stale_stats.collaborator, 1);
}

#[tokio::test]
async fn test_help_by_voice() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);

    let (effects, attempt) = say(&mut reactor, attempt, "hilfe");
    assert!(effects.iter().any(|e| matches!(e, SideEffect::OpenHelp)));
    assert_eq!(reactor.presence(), PresenceState::Assisting);
    assert_eq!(reactor.scheduler().authority(), Some(Authority::Help));

    // Anything but "dialog schließen" keeps the help open.
    let (_, attempt) = say(&mut reactor, attempt.unwrap(), "neuer termin");
    assert_eq!(reactor.presence(), PresenceState::Assisting);
    assert!(reactor.dialog().is_none());

    let (effects, attempt) = say(&mut reactor, attempt.unwrap(), "dialog schließen");
    assert!(effects.iter().any(|e| matches!(e, SideEffect::CloseHelp)));
    assert_eq!(reactor.presence(), PresenceState::Attentive);
    assert!(attempt.is_some());
}

#[tokio::test]
async fn test_help_closed_from_outside() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);
    say(&mut reactor, attempt, "hilfe");

    let effects = reactor.tick_step(vec![Event::HelpClosed]);
    assert_eq!(reactor.presence(), PresenceState::Attentive);
    assert!(started(&effects).is_some());
}

#[tokio::test]
async fn test_end_session_goes_dormant() {
    let (_tx, mut reactor) = setup();
    let prompts = reactor.config().prompts.clone();
    let attempt = activate(&mut reactor);

    let (effects, attempt) = say(&mut reactor, attempt, "auf ein wiederhören");
    assert!(effects
        .iter()
        .any(|e| matches!(e, SideEffect::Speak { text, .. } if *text == prompts.farewell)));
    assert!(attempt.is_none(), "Nothing is armed after the farewell");
    assert_eq!(reactor.presence(), PresenceState::Dormant);
    assert_eq!(reactor.scheduler().authority(), None);
}

#[tokio::test]
async fn test_unrecognized_reprompts() {
    let (_tx, mut reactor) = setup();
    let prompts = reactor.config().prompts.clone();
    let attempt = activate(&mut reactor);

    let (effects, attempt) = say(&mut reactor, attempt, "weiter");
    assert_eq!(statuses(&effects), vec![prompts.not_understood]);
    assert!(attempt.is_some());
    assert_eq!(reactor.presence(), PresenceState::Attentive);
}

#[tokio::test]
async fn test_silence_restarts_listening() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::silence(attempt)]);
    let next = started(&effects).expect("Re-armed after silence");
    assert_ne!(next, attempt);
}

#[tokio::test]
async fn test_transient_error_retries() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::recognition_error(attempt, "network")]);
    assert_eq!(statuses(&effects).len(), 1);
    assert!(started(&effects).is_some());
    assert_eq!(reactor.presence(), PresenceState::Attentive);
}

#[tokio::test]
async fn test_fatal_error_escalates() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::recognition_error(attempt, "not-allowed")]);
    assert_eq!(statuses(&effects).len(), 1, "User is told why listening stopped");
    assert!(started(&effects).is_none(), "No blind retry loop");
    assert_eq!(reactor.presence(), PresenceState::Dormant);
    assert_eq!(reactor.telemetry.snapshot().failure_stats.escalations, 1);
}

#[tokio::test]
async fn test_fatal_error_retries_when_escalation_disabled() {
    let (_tx, rx) = mpsc::channel(100);
    let mut config = EngineConfig::default();
    config.recovery.escalate_fatal_errors = false;
    let mut reactor = Reactor::new(rx, config);
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::recognition_error(attempt, "not-allowed")]);
    assert!(started(&effects).is_some());
    assert_eq!(reactor.presence(), PresenceState::Attentive);
}

#[tokio::test]
async fn test_fatal_error_in_dialog_aborts_it() {
    let (_tx, mut reactor) = setup();
    let attempt = open_dialog(&mut reactor);

    let effects = reactor.tick_step(vec![Event::recognition_error(attempt, "audio-capture")]);
    assert!(started(&effects).is_none());
    assert!(reactor.dialog().is_none());
    assert_eq!(reactor.presence(), PresenceState::Dormant);
    assert_eq!(reactor.telemetry.snapshot().dialog_stats.aborted, 1);
}

#[tokio::test]
async fn test_synthesis_error_aborts_dialog() {
    let (_tx, mut reactor) = setup();
    let prompts = reactor.config().prompts.clone();
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::heard(attempt, "neuer termin")]);
    let (utterance, _) = speech(&effects).expect("Welcome turn");

    let effects = reactor.tick_step(vec![Event::speech_error(utterance, "synthesis-failed")]);
    assert!(reactor.dialog().is_none(), "Dialog cannot go on without speech");
    assert_eq!(reactor.presence(), PresenceState::Attentive);
    assert!(statuses(&effects).iter().any(|s| s.contains(&prompts.dialog_aborted)));
    assert!(started(&effects).is_some(), "Router resumes");
    assert_eq!(reactor.telemetry.snapshot().failure_stats.speech_failures, 1);
}

#[tokio::test]
async fn test_deactivate_tears_everything_down() {
    let (_tx, mut reactor) = setup();
    let attempt = open_dialog(&mut reactor);

    let effects = reactor.tick_step(vec![Event::Deactivate]);
    assert!(effects
        .iter()
        .any(|e| matches!(e, SideEffect::StopRecognition(a) if *a == attempt)));
    assert!(reactor.dialog().is_none());
    assert_eq!(reactor.presence(), PresenceState::Dormant);
    assert_eq!(reactor.scheduler().authority(), None);

    // Late transcript of the torn-down attempt.
    let effects = reactor.tick_step(vec![Event::heard(attempt, "weiter")]);
    assert!(effects.is_empty(), "Stale signals never reach a handler");
    assert_eq!(reactor.telemetry.snapshot().stale_stats.recognition, 1);
}

#[tokio::test]
async fn test_intent_telemetry() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);
    let (_, attempt) = say(&mut reactor, attempt, "blabla");
    say(&mut reactor, attempt.unwrap(), "neues symptom husten");

    let snapshot = reactor.telemetry.snapshot();
    assert_eq!(snapshot.intent_count(pathvoice::kernel::intent::IntentKind::Unrecognized), 1);
    assert_eq!(snapshot.intent_count(pathvoice::kernel::intent::IntentKind::AddSymptom), 1);
}

#[tokio::test]
async fn test_farewell_speech_failure_shows_code_once() {
    let (_tx, mut reactor) = setup();
    let prompts = reactor.config().prompts.clone();
    let attempt = activate(&mut reactor);

    let effects = reactor.tick_step(vec![Event::heard(attempt, "auf ein wiederhören")]);
    assert_eq!(statuses(&effects), vec![prompts.farewell.clone()]);
    let (utterance, _) = speech(&effects).expect("Farewell turn");

    let effects = reactor.tick_step(vec![Event::speech_error(utterance, "synthesis-failed")]);
    assert_eq!(statuses(&effects), vec!["synthesis-failed".to_string()], "Farewell text is not shown twice");
    assert_eq!(reactor.presence(), PresenceState::Dormant);
}

#[tokio::test]
async fn test_trailing_ended_is_not_stale() {
    let (_tx, mut reactor) = setup();
    let attempt = activate(&mut reactor);

    // Engines report `ended` after every final result.
    let (_, next) = say(&mut reactor, attempt, "hilfe");
    let effects = reactor.tick_step(vec![Event::silence(attempt)]);

    assert!(effects.is_empty());
    assert_eq!(reactor.telemetry.snapshot().stale_stats.recognition, 0);
    assert_eq!(reactor.scheduler().session().map(|s| s.attempt), next, "Help turn stays armed");
}

#[tokio::test]
async fn test_microphone_errors_are_not_rejected_inputs() {
    let (_tx, mut reactor) = setup();
    let attempt = open_dialog(&mut reactor);

    let effects = reactor.tick_step(vec![Event::recognition_error(attempt, "network")]);
    let (utterance, _) = speech(&effects).expect("Question is asked again");
    let effects = reactor.tick_step(vec![Event::spoken(utterance)]);
    let attempt = started(&effects).expect("Date turn re-armed");
    assert_eq!(reactor.telemetry.snapshot().dialog_stats.rejected_inputs, 0);

    say(&mut reactor, attempt, "morgen früh");
    assert_eq!(reactor.telemetry.snapshot().dialog_stats.rejected_inputs, 1);
}
