//! Conversation telemetry.
//!
//! Telemetry is a read-only side channel: decision logic never reads it.
//! Events carry ids, kinds and counts only, never transcripts or spoken text.

pub mod event;
pub mod metrics;
pub mod recorder;
