//! Shared utilities

pub mod clock;
pub mod error;
pub mod paths;

pub use clock::{Clock, TimestampMs, WallClock};
pub use error::{ErrorResponse, RecorderError, RecorderResult};
