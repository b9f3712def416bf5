use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Size and timing of one or more transfers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStats {
    pub size_in_bytes: u64,
    pub time_in_millis: u64,
}

impl TransferStats {
    pub fn new(size_in_bytes: u64, elapsed: Duration) -> Self {
        Self {
            size_in_bytes,
            time_in_millis: elapsed.as_millis().try_into().unwrap_or(u64::MAX),
        }
    }

    /// Adds another transfer to this one. Uploads run one at a time, so
    /// the times simply add up.
    pub fn accumulate(&mut self, other: TransferStats) {
        self.size_in_bytes = self.size_in_bytes.saturating_add(other.size_in_bytes);
        self.time_in_millis = self.time_in_millis.saturating_add(other.time_in_millis);
    }

    pub fn size_in_mb(&self) -> f64 {
        self.size_in_bytes as f64 / 1_000_000.0
    }

    /// Megabits per second; zero when no time was measured.
    pub fn throughput_mbps(&self) -> f64 {
        if self.time_in_millis == 0 {
            return 0.0;
        }
        (self.size_in_bytes as f64 * 8.0 / 1_000_000.0) / (self.time_in_millis as f64 / 1000.0)
    }
}

impl fmt::Display for TransferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ms, {:.2} MB, {:.2} Mbps",
            self.time_in_millis,
            self.size_in_mb(),
            self.throughput_mbps()
        )
    }
}
