//! Recorder configuration
//!
//! Loaded from a TOML file. Every field has a default, so a partial file (or
//! none at all) is valid:
//!
//! ```toml
//! [storage]
//! sandbox_dir = "/data/recorder"
//!
//! [frames]
//! save_interval = 3
//!
//! [captures]
//! interval_ms = 500
//! max_captures = 20
//! ```

use crate::capture::streamed::StreamedPipelineConfig;
use crate::capture::traits::{CameraSettings, Resolution};
use crate::capture::triggered::TriggeredPipelineConfig;
use crate::export::DirectoryExport;
use crate::sensor::buffer::DEFAULT_FLUSH_THRESHOLD;
use crate::sensor::types::SamplingRate;
use crate::utils::error::{RecorderError, RecorderResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level recorder configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub storage: StorageConfig,
    pub sensors: SensorConfig,
    pub frames: FrameConfig,
    pub captures: CaptureConfig,
    pub camera: CameraConfig,
    pub export: ExportConfig,
}

/// Private capture area
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the capture sandbox
    pub sandbox_dir: PathBuf,
    /// Session CSV, relative to the sandbox
    pub csv_file_name: String,
    /// Streamed frames, relative to the sandbox
    pub frames_dir: PathBuf,
    /// Single-shot frames, relative to the sandbox
    pub single_shots_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sandbox_dir: PathBuf::from("recordings"),
            csv_file_name: "sensor_data.csv".to_string(),
            frames_dir: PathBuf::from("Frames"),
            single_shots_dir: PathBuf::from("SingleShots"),
        }
    }
}

/// Inertial sampling
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Buffered bytes that trigger a write to the CSV
    pub flush_threshold: usize,
    pub sampling_rate: SamplingRate,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            sampling_rate: SamplingRate::Game,
        }
    }
}

/// Streamed-frame persistence
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Persist every Nth frame
    pub save_interval: u64,
    /// Safety detach for single-shot capture
    pub single_shot_timeout_ms: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            save_interval: 1,
            single_shot_timeout_ms: 300,
        }
    }
}

/// Triggered still capture
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interval_ms: u64,
    pub max_captures: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_captures: 100,
        }
    }
}

/// Manual camera parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub exposure_time_ns: u64,
    pub sensitivity_iso: u32,
    pub focus_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let settings = CameraSettings::default();
        Self {
            width: settings.resolution.width,
            height: settings.resolution.height,
            exposure_time_ns: settings.exposure_time_ns,
            sensitivity_iso: settings.sensitivity_iso,
            focus_distance: settings.focus_distance,
        }
    }
}

/// Public export area
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub documents_dir: PathBuf,
    pub pictures_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("export/Documents/SyncCameraApp"),
            pictures_dir: PathBuf::from("export/Pictures/SyncCameraApp"),
        }
    }
}

impl RecorderConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RecorderResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(contents: &str) -> RecorderResult<Self> {
        let config: RecorderConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults rooted at `dir` (sandbox and export both inside it)
    pub fn rooted_at(dir: &Path) -> Self {
        let mut config = Self::default();
        config.storage.sandbox_dir = dir.join("sandbox");
        config.export.documents_dir = dir.join("Documents");
        config.export.pictures_dir = dir.join("Pictures");
        config
    }

    pub fn validate(&self) -> RecorderResult<()> {
        if self.frames.save_interval == 0 {
            return Err(RecorderError::InvalidConfig(
                "frames.save_interval must be at least 1".to_string(),
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(RecorderError::InvalidConfig(format!(
                "camera resolution {}x{} is empty",
                self.camera.width, self.camera.height
            )));
        }
        if self.storage.csv_file_name.is_empty() {
            return Err(RecorderError::InvalidConfig(
                "storage.csv_file_name is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Session CSV inside the sandbox
    pub fn csv_path(&self) -> PathBuf {
        self.storage.sandbox_dir.join(&self.storage.csv_file_name)
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            resolution: Resolution {
                width: self.camera.width,
                height: self.camera.height,
            },
            exposure_time_ns: self.camera.exposure_time_ns,
            sensitivity_iso: self.camera.sensitivity_iso,
            focus_distance: self.camera.focus_distance,
        }
    }

    pub fn streamed_pipeline(&self) -> StreamedPipelineConfig {
        StreamedPipelineConfig {
            save_interval: self.frames.save_interval,
            frames_dir: self.storage.sandbox_dir.join(&self.storage.frames_dir),
            single_shots_dir: self.storage.sandbox_dir.join(&self.storage.single_shots_dir),
            single_shot_timeout: Duration::from_millis(self.frames.single_shot_timeout_ms),
        }
    }

    pub fn triggered_pipeline(&self) -> TriggeredPipelineConfig {
        TriggeredPipelineConfig {
            interval: Duration::from_millis(self.captures.interval_ms),
            max_captures: self.captures.max_captures,
        }
    }

    pub fn directory_export(&self) -> DirectoryExport {
        DirectoryExport::new(&self.export.documents_dir, &self.export.pictures_dir)
    }
}
