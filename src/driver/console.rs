use std::collections::VecDeque;
use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Gateway;
use crate::error::GatewayError;
use crate::kernel::event::{AttemptId, Event, RecognitionSignal, SynthesisSignal};
use crate::kernel::scheduler::SideEffect;
use crate::pathway::{Insertion, Pathway};

/// Typed line that stands in for a recognition error (`!fehler not-allowed`).
const ERROR_PREFIX: &str = "!fehler";

/// Text console standing in for both speech engines and the pathway view.
///
/// Typed lines become final recognition results while an attempt is armed,
/// an empty line is silence. Lines starting with `:` are UI actions:
/// `:start`, `:stop` and `:hilfe-zu`. Speech is printed and reported as
/// finished right away. Both engines run in the configured locale.
pub struct ConsoleHarness<W: Write> {
    lines: mpsc::Receiver<String>,
    locale: String,
    queued: VecDeque<Event>,
    attempt: Option<AttemptId>,
    pathway: Pathway,
    out: W,
}

impl<W: Write> ConsoleHarness<W> {
    pub fn new(lines: mpsc::Receiver<String>, pathway: Pathway, out: W, locale: impl Into<String>) -> Self {
        Self {
            lines,
            locale: locale.into(),
            queued: VecDeque::new(),
            attempt: None,
            pathway,
            out,
        }
    }

    pub fn pathway(&self) -> &Pathway {
        &self.pathway
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    fn translate(&mut self, line: &str) -> Result<Option<Event>, GatewayError> {
        let line = line.trim();
        match line {
            ":start" => return Ok(Some(Event::Activate)),
            ":stop" => return Ok(Some(Event::Deactivate)),
            ":hilfe-zu" => return Ok(Some(Event::HelpClosed)),
            _ => {}
        }

        let Some(attempt) = self.attempt else {
            writeln!(self.out, "[MIC AUS] '{}' ignoriert. Mit :start einschalten.", line)?;
            return Ok(None);
        };

        let event = if line.is_empty() {
            Event::silence(attempt)
        } else if let Some(code) = line.strip_prefix(ERROR_PREFIX) {
            Event::recognition_error(attempt, code.trim())
        } else {
            Event::heard(attempt, line)
        };
        Ok(Some(event))
    }
}

impl<W: Write> Gateway for ConsoleHarness<W> {
    fn execute(&mut self, effect: SideEffect) -> Result<(), GatewayError> {
        match effect {
            SideEffect::StartRecognition(attempt) => {
                self.attempt = Some(attempt);
                self.queued.push_back(Event::Recognition {
                    attempt,
                    signal: RecognitionSignal::Started,
                });
                writeln!(self.out, "[MIC {}] hört zu", self.locale)?;
            }
            SideEffect::StopRecognition(attempt) => {
                if self.attempt == Some(attempt) {
                    self.attempt = None;
                }
            }
            SideEffect::Speak { utterance, text } => {
                writeln!(self.out, "[SAGT {}] {}", self.locale, text)?;
                self.queued.push_back(Event::Synthesis {
                    utterance,
                    signal: SynthesisSignal::Started,
                });
                self.queued.push_back(Event::Synthesis {
                    utterance,
                    signal: SynthesisSignal::Ended,
                });
            }
            SideEffect::EmitRecord(record) => {
                writeln!(self.out, "[PFAD] {}", serde_json::to_string(&record)?)?;
                match self.pathway.insert(record) {
                    Insertion::Added => debug!("Pathway event added"),
                    Insertion::Merged => debug!("Symptom merged into existing bundle"),
                }
            }
            SideEffect::RequestShow { request, query } => {
                let found = match self.pathway.find(&query) {
                    Some(event) => {
                        writeln!(self.out, "[ANZEIGE] {}", serde_json::to_string_pretty(event)?)?;
                        true
                    }
                    None => false,
                };
                self.queued.push_back(Event::ShowResolved { request, found });
            }
            SideEffect::RequestDelete { request, query } => {
                let deleted = self.pathway.delete(&query);
                self.queued.push_back(Event::DeleteResolved { request, deleted });
            }
            SideEffect::OpenHelp => {
                writeln!(
                    self.out,
                    "[HILFE] neuer termin | neues symptom <symptom> | zeige <name> am <datum> | \
                     lösche <name> am <datum> | auf wiederhören | dialog schließen"
                )?;
            }
            SideEffect::CloseHelp => writeln!(self.out, "[HILFE] geschlossen")?,
            SideEffect::Status(message) => writeln!(self.out, "[STATUS] {}", message)?,
        }
        Ok(())
    }

    fn poll(&mut self) -> Vec<Event> {
        // Engine signals settle before the next typed line is read.
        if !self.queued.is_empty() {
            return self.queued.drain(..).collect();
        }

        let Ok(line) = self.lines.try_recv() else {
            return Vec::new();
        };
        match self.translate(&line) {
            Ok(event) => event.into_iter().collect(),
            Err(e) => {
                warn!("Console output failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Forwards stdin lines into a channel until stdin closes.
pub fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut reader = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
