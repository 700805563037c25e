//! Recording state management
//!
//! Defines the operating modes and per-session bookkeeping.

use crate::capture::streamed::FrameStats;
use crate::capture::triggered::CaptureStats;
use crate::utils::clock::TimestampMs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// CSV export name for camera-bearing sessions
pub const CAMERA_SESSION_EXPORT_NAME: &str = "sensor_data.csv";

/// CSV export name for inertial-only (calibration) sessions
pub const CALIBRATION_EXPORT_NAME: &str = "sensor_data_calibration.csv";

/// Mutually exclusive operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatingMode {
    /// No recording in progress
    Idle,
    /// Inertial sensors only
    InertialOnly,
    /// Inertial sensors plus continuous camera frames
    InertialPlusStreamedFrames,
    /// Inertial sensors plus timer-triggered still captures
    InertialPlusTriggeredCaptures,
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self::Idle
    }
}

impl OperatingMode {
    /// Whether this mode needs the camera
    pub fn uses_camera(&self) -> bool {
        matches!(
            self,
            OperatingMode::InertialPlusStreamedFrames | OperatingMode::InertialPlusTriggeredCaptures
        )
    }

    pub fn is_recording(&self) -> bool {
        *self != OperatingMode::Idle
    }

    /// Name the finished CSV is exported under
    pub fn export_file_name(&self) -> &'static str {
        match self {
            OperatingMode::InertialOnly => CALIBRATION_EXPORT_NAME,
            _ => CAMERA_SESSION_EXPORT_NAME,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatingMode::Idle => "idle",
            OperatingMode::InertialOnly => "inertial-only",
            OperatingMode::InertialPlusStreamedFrames => "inertial+streamed-frames",
            OperatingMode::InertialPlusTriggeredCaptures => "inertial+triggered-captures",
        };
        f.write_str(name)
    }
}

/// The active recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Unique session id (for logs)
    pub id: Uuid,

    pub mode: OperatingMode,

    /// Wall-clock start time
    pub started_at_ms: TimestampMs,

    /// Streamed frames counted so far
    pub frame_counter: u64,

    /// Triggered captures issued so far
    pub capture_counter: u64,
}

impl RecordingSession {
    /// Create a new session with zeroed counters
    pub fn new(mode: OperatingMode, started_at_ms: TimestampMs) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            started_at_ms,
            frame_counter: 0,
            capture_counter: 0,
        }
    }
}

/// Result of a stopped session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub mode: OperatingMode,
    pub started_at_ms: TimestampMs,
    pub stopped_at_ms: TimestampMs,

    /// Samples written to the CSV
    pub samples: u64,

    /// Sandbox CSV, if it was open
    pub csv_path: Option<PathBuf>,

    /// Exported CSV copy, if the export succeeded
    pub exported_csv: Option<PathBuf>,

    pub frames: FrameStats,
    pub captures: CaptureStats,
}

impl SessionSummary {
    pub fn duration_ms(&self) -> i64 {
        self.stopped_at_ms - self.started_at_ms
    }
}

/// What the controller did in response to a configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Nothing was recording
    None,
    /// Session kept running untouched
    Ignored,
    /// Session was stopped, exported and started again in the same mode
    Restarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_names_per_mode() {
        assert_eq!(
            OperatingMode::InertialOnly.export_file_name(),
            "sensor_data_calibration.csv"
        );
        assert_eq!(
            OperatingMode::InertialPlusStreamedFrames.export_file_name(),
            "sensor_data.csv"
        );
        assert_eq!(
            OperatingMode::InertialPlusTriggeredCaptures.export_file_name(),
            "sensor_data.csv"
        );
    }

    #[test]
    fn test_mode_flags() {
        assert!(!OperatingMode::Idle.is_recording());
        assert!(!OperatingMode::InertialOnly.uses_camera());
        assert!(OperatingMode::InertialPlusStreamedFrames.uses_camera());
        assert!(OperatingMode::InertialPlusTriggeredCaptures.uses_camera());
        assert_eq!(OperatingMode::default(), OperatingMode::Idle);
    }

    #[test]
    fn test_new_session_has_zero_counters() {
        let session = RecordingSession::new(OperatingMode::InertialOnly, 42);
        assert_eq!(session.frame_counter, 0);
        assert_eq!(session.capture_counter, 0);
        assert_eq!(session.started_at_ms, 42);
    }
}
