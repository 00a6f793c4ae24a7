use std::path::Path;

use tracing::{debug, info};

use super::{same_day, EventContent, EventQuery, PathwayEvent, PathwayEventType};
use crate::error::PathwayError;

/// What `Pathway::insert` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Added,
    /// Symptoms were appended to the bundle that already covers the day.
    Merged,
}

/// In-memory patient timeline, always sorted by date.
#[derive(Debug, Clone, Default)]
pub struct Pathway {
    events: Vec<PathwayEvent>,
}

impl Pathway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<PathwayEvent>) -> Self {
        let mut pathway = Self { events };
        pathway.sort();
        pathway
    }

    pub fn from_json_str(raw: &str) -> Result<Self, PathwayError> {
        let events: Vec<PathwayEvent> = serde_json::from_str(raw)?;
        Ok(Self::from_events(events))
    }

    pub fn load(path: &Path) -> Result<Self, PathwayError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PathwayError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let pathway = Self::from_json_str(&raw)?;
        info!("Loaded {} pathway events from {}", pathway.len(), path.display());
        Ok(pathway)
    }

    pub fn events(&self) -> &[PathwayEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn insert(&mut self, record: PathwayEvent) -> Insertion {
        let PathwayEvent { id, date, header, content, kind } = record;

        let outcome = match (kind, content) {
            (PathwayEventType::SymptomBundle, EventContent::Symptoms(symptoms)) => {
                let day = date.date();
                let existing = self.events.iter().position(|event| {
                    event.kind == PathwayEventType::SymptomBundle && same_day(event.date.date(), day)
                });

                match existing {
                    Some(index) => {
                        debug!("Extending symptom bundle of {}", day);
                        let bundle = &mut self.events[index];
                        match &mut bundle.content {
                            EventContent::Symptoms(list) => list.extend(symptoms),
                            other => *other = EventContent::Symptoms(symptoms),
                        }
                        Insertion::Merged
                    }
                    None => {
                        debug!("New symptom bundle for {}", day);
                        self.events.push(PathwayEvent {
                            id,
                            date,
                            header,
                            content: EventContent::Symptoms(symptoms),
                            kind,
                        });
                        Insertion::Added
                    }
                }
            }
            (kind, content) => {
                self.events.push(PathwayEvent { id, date, header, content, kind });
                Insertion::Added
            }
        };
        self.sort();
        outcome
    }

    pub fn find(&self, query: &EventQuery) -> Option<&PathwayEvent> {
        self.events.iter().find(|event| event.matches(query))
    }

    /// Removes every event matching the query. Returns whether anything was removed.
    pub fn delete(&mut self, query: &EventQuery) -> bool {
        let before = self.events.len();
        self.events.retain(|event| !event.matches(query));
        before != self.events.len()
    }

    fn sort(&mut self) {
        self.events.sort_by_key(|event| event.date);
    }
}
