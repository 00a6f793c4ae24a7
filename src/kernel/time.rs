use chrono::{Local, NaiveDateTime};

/// Monotonic counter used to tag recognition attempts, utterances and
/// collaborator requests. A signal carrying an older generation than the one
/// currently armed is stale by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation {
    current: u64,
}

impl Generation {
    pub fn new() -> Self {
        Generation { current: 0 }
    }

    /// Advances and returns the new value. The first value handed out is 1.
    pub fn advance(&mut self) -> u64 {
        self.current += 1;
        self.current
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock seam. Symptom bundles are dated "now"; tests pin it.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
