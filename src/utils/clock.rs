//! Wall-clock source for sample and frame timestamps

use chrono::Utc;

/// Millisecond wall-clock timestamp
pub type TimestampMs = i64;

/// Source of wall-clock time
///
/// Sensor samples, frames and captures are stamped with raw wall-clock time
/// at arrival; no drift correction is applied between sources.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_ms(&self) -> TimestampMs;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_ms(&self) -> TimestampMs {
        Utc::now().timestamp_millis()
    }
}
