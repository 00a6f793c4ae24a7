use pathvoice::kernel::dialog::FormStep;
use pathvoice::kernel::intent::IntentKind;
use pathvoice::kernel::presence::{PresenceGraph, PresenceRequest, PresenceState};
use pathvoice::kernel::speech::RecognitionErrorKind;
use pathvoice::kernel::telemetry::event::{DialogOutcome, SignalSource, TelemetryEvent};
use pathvoice::kernel::telemetry::recorder::TelemetryRecorder;

#[test]
fn test_presence_transitions() {
    use PresenceRequest::*;
    use PresenceState::*;

    assert_eq!(PresenceGraph::transition(Dormant, Activate), Some(Attentive));
    assert_eq!(PresenceGraph::transition(Attentive, OpenDialog), Some(Guiding));
    assert_eq!(PresenceGraph::transition(Attentive, OpenHelp), Some(Assisting));
    assert_eq!(PresenceGraph::transition(Guiding, CloseDialog), Some(Attentive));
    assert_eq!(PresenceGraph::transition(Assisting, CloseHelp), Some(Attentive));

    for state in [Attentive, Guiding, Assisting] {
        assert_eq!(PresenceGraph::transition(state, Deactivate), Some(Dormant));
        assert_eq!(PresenceGraph::transition(state, RecognitionUnavailable), Some(Dormant));
    }
}

#[test]
fn test_presence_ignores_invalid_requests() {
    use PresenceRequest::*;
    use PresenceState::*;

    assert_eq!(PresenceGraph::transition(Dormant, OpenDialog), None, "Nothing opens while dormant");
    assert_eq!(PresenceGraph::transition(Guiding, OpenHelp), None, "Help never interrupts the dialog");
    assert_eq!(PresenceGraph::transition(Assisting, OpenDialog), None);
    assert_eq!(PresenceGraph::transition(Attentive, Activate), None);
    assert_eq!(PresenceGraph::transition(Dormant, Deactivate), None);
}

#[test]
fn test_snapshot_counts() {
    let mut recorder = TelemetryRecorder::new();
    recorder.record(TelemetryEvent::PresenceTransition {
        from: PresenceState::Dormant,
        to: PresenceState::Attentive,
    });
    recorder.record(TelemetryEvent::IntentDispatched {
        kind: IntentKind::CreateAppointment,
    });
    recorder.record(TelemetryEvent::IntentDispatched {
        kind: IntentKind::CreateAppointment,
    });
    recorder.record(TelemetryEvent::StaleSignalDropped {
        source: SignalSource::Synthesis,
    });
    recorder.record(TelemetryEvent::RecognitionFailed {
        kind: RecognitionErrorKind::Network,
        escalated: false,
    });
    recorder.record(TelemetryEvent::FormStepEntered {
        step: FormStep::AwaitingDate,
    });
    recorder.record(TelemetryEvent::InputRejected {
        step: FormStep::AwaitingDate,
    });
    recorder.record(TelemetryEvent::DialogFinished {
        outcome: DialogOutcome::Completed,
    });

    let snapshot = recorder.snapshot();
    assert_eq!(snapshot.presence_transitions, 1);
    assert_eq!(snapshot.intent_count(IntentKind::CreateAppointment), 2);
    assert_eq!(snapshot.intent_count(IntentKind::Help), 0);
    assert_eq!(snapshot.stale_stats.synthesis, 1);
    assert_eq!(snapshot.failure_stats.recognition_failures, 1);
    assert_eq!(snapshot.failure_stats.escalations, 0);
    assert_eq!(snapshot.dialog_stats.steps_entered, 1);
    assert_eq!(snapshot.dialog_stats.rejected_inputs, 1);
    assert_eq!(snapshot.dialog_stats.completed, 1);

    recorder.clear();
    assert_eq!(recorder.events().count(), 0);
}

#[test]
fn test_snapshot_serializes_without_content() {
    let mut recorder = TelemetryRecorder::new();
    recorder.record(TelemetryEvent::IntentDispatched {
        kind: IntentKind::AddSymptom,
    });

    let json = serde_json::to_string(&recorder.snapshot()).expect("snapshot serializes");
    assert!(json.contains("AddSymptom"));
}
