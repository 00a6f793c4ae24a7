use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use super::event::{DialogOutcome, SignalSource, TelemetryEvent};
use crate::kernel::intent::IntentKind;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    pub intents: BTreeMap<IntentKind, u64>,
    pub presence_transitions: u64,
    pub stale_stats: StaleStats,
    pub failure_stats: FailureStats,
    pub dialog_stats: DialogStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StaleStats {
    pub recognition: u64,
    pub synthesis: u64,
    pub collaborator: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FailureStats {
    pub recognition_failures: u64,
    pub escalations: u64,
    pub speech_failures: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DialogStats {
    pub completed: u64,
    pub cancelled: u64,
    pub aborted: u64,
    pub steps_entered: u64,
    pub rejected_inputs: u64,
}

impl TelemetrySnapshot {
    pub fn intent_count(&self, kind: IntentKind) -> u64 {
        self.intents.get(&kind).copied().unwrap_or(0)
    }
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::PresenceTransition { .. } => snap.presence_transitions += 1,
            TelemetryEvent::IntentDispatched { kind } => *snap.intents.entry(*kind).or_insert(0) += 1,
            TelemetryEvent::StaleSignalDropped { source } => match source {
                SignalSource::Recognition => snap.stale_stats.recognition += 1,
                SignalSource::Synthesis => snap.stale_stats.synthesis += 1,
                SignalSource::Collaborator => snap.stale_stats.collaborator += 1,
            },
            TelemetryEvent::RecognitionFailed { escalated, .. } => {
                snap.failure_stats.recognition_failures += 1;
                if *escalated {
                    snap.failure_stats.escalations += 1;
                }
            }
            TelemetryEvent::SpeechFailed => snap.failure_stats.speech_failures += 1,
            TelemetryEvent::FormStepEntered { .. } => snap.dialog_stats.steps_entered += 1,
            TelemetryEvent::InputRejected { .. } => snap.dialog_stats.rejected_inputs += 1,
            TelemetryEvent::DialogFinished { outcome } => match outcome {
                DialogOutcome::Completed => snap.dialog_stats.completed += 1,
                DialogOutcome::Cancelled => snap.dialog_stats.cancelled += 1,
                DialogOutcome::Aborted => snap.dialog_stats.aborted += 1,
            },
        }
    }

    snap
}
