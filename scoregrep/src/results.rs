use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// What one filter run did, reported after the pool has been joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Threshold the run filtered against
    pub min_score: i64,
    /// Lines pulled from the input
    pub lines_read: u64,
    /// Lines whose score reached the threshold
    pub lines_emitted: u64,
    /// Worker threads started, one per pattern
    pub workers_spawned: usize,
    /// Worker threads joined at shutdown
    pub workers_joined: usize,
    /// Wall time from pool start to the last join
    #[serde(serialize_with = "serialize_elapsed")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// True when every spawned worker was joined
    pub fn is_clean_shutdown(&self) -> bool {
        self.workers_spawned == self.workers_joined
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} lines scored at least {} ({} pattern workers, {})",
            self.lines_emitted,
            self.lines_read,
            self.min_score,
            self.workers_joined,
            humantime::format_duration(self.elapsed)
        )
    }
}

fn serialize_elapsed<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*elapsed).to_string())
}
