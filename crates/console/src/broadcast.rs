//! Broadcast fan-out

use serde::{Deserialize, Serialize};

/// Tally of one completed broadcast.
///
/// The batch always runs to the end: `sent + failed` equals the number of
/// known users at the time the broadcast started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

impl std::fmt::Display for BroadcastReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sent {}, failed {}", self.sent, self.failed)
    }
}
