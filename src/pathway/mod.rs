//! Pathway data model: the timeline entries a patient creates by voice.

pub mod timeline;

pub use timeline::{Insertion, Pathway};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathwayEventType {
    Appointment,
    SymptomBundle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventContent {
    Text(String),
    Symptoms(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwayEvent {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub date: NaiveDateTime,
    pub header: String,
    pub content: EventContent,
    #[serde(rename = "type")]
    pub kind: PathwayEventType,
}

/// Name + calendar day a user refers to in "zeige/lösche <name> am <date>".
/// `date` is `None` when the spoken date token could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub raw_date: String,
}

impl EventQuery {
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && self.date.is_some()
    }
}

/// Header used for every symptom bundle.
pub const SYMPTOM_BUNDLE_HEADER: &str = "Symptome";

impl PathwayEvent {
    pub fn appointment(date: NaiveDateTime, header: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            header,
            content: EventContent::Text(content),
            kind: PathwayEventType::Appointment,
        }
    }

    pub fn symptom_bundle(date: NaiveDateTime, symptom: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            header: SYMPTOM_BUNDLE_HEADER.to_string(),
            content: EventContent::Symptoms(vec![symptom]),
            kind: PathwayEventType::SymptomBundle,
        }
    }

    /// Delete/merge identity: header case-insensitively, date on day, month
    /// and year. Time of day is ignored.
    pub fn same_identity(&self, other: &PathwayEvent) -> bool {
        headers_match(&self.header, &other.header) && same_day(self.date.date(), other.date.date())
    }

    pub fn matches(&self, query: &EventQuery) -> bool {
        match query.date {
            Some(day) => headers_match(&self.header, &query.name) && same_day(self.date.date(), day),
            None => false,
        }
    }
}

fn headers_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub(crate) fn same_day(a: NaiveDate, b: NaiveDate) -> bool {
    a.day() == b.day() && a.month() == b.month() && a.year() == b.year()
}
