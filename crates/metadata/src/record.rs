use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Normalized fields pulled out of a tagger dump.
///
/// `series` and `issue` are never empty; a dump without them is rejected by
/// the parser rather than producing a partial record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub series: String,
    pub volume: Option<String>,
    pub issue: String,
    pub year: String,
}

/// Source of the calendar year used when a dump carries no year.
pub trait Clock: Send + Sync {
    fn current_year(&self) -> i32;
}

/// Local wall-clock year.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_year(&self) -> i32 {
        chrono::Local::now().year()
    }
}

/// Always reports the same year.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i32);

impl Clock for FixedClock {
    fn current_year(&self) -> i32 {
        self.0
    }
}
