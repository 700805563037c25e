//! Camera trait definitions
//!
//! Platform-agnostic seams for the camera collaborator. The streamed path
//! pushes raw planar frames into a [`FrameAnalyzer`]; the triggered path pulls
//! one encoded still image at a time from a [`StillCamera`].

use crate::utils::clock::TimestampMs;
use crate::utils::error::RecorderResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Manual camera parameters, fixed when the camera is bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSettings {
    /// Target resolution
    pub resolution: Resolution,

    /// Exposure time in nanoseconds (auto-exposure off)
    pub exposure_time_ns: u64,

    /// Sensor sensitivity (ISO)
    pub sensitivity_iso: u32,

    /// Focus distance in diopters (autofocus off)
    pub focus_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution {
                width: 640,
                height: 480,
            },
            exposure_time_ns: 1_700_000,
            sensitivity_iso: 2000,
            focus_distance: 1.0,
        }
    }
}

/// One image plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub data: Vec<u8>,
    /// Bytes between the starts of two rows
    pub row_stride: usize,
    /// Bytes between two horizontally adjacent samples
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Tightly packed plane
    pub fn packed(data: Vec<u8>, width: usize) -> Self {
        Self::new(data, width, 1)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Raw 4:2:0 planar frame delivered by the camera
///
/// The frame owns its buffer; dropping it releases the buffer back to the
/// camera (the optional release hook runs exactly once).
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Luma plane
    pub y: Plane,
    /// Chroma-U (Cb) plane
    pub u: Plane,
    /// Chroma-V (Cr) plane
    pub v: Plane,
    /// Sensor timestamp, if the camera provides one
    pub sensor_timestamp_ns: Option<i64>,
    release: Option<ReleaseHook>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, y: Plane, u: Plane, v: Plane) -> Self {
        Self {
            width,
            height,
            y,
            u,
            v,
            sensor_timestamp_ns: None,
            release: None,
        }
    }

    /// Attach a hook run when the frame is released
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn with_sensor_timestamp(mut self, timestamp_ns: i64) -> Self {
        self.sensor_timestamp_ns = Some(timestamp_ns);
        self
    }
}

impl Drop for RawFrame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("y_len", &self.y.len())
            .field("u_len", &self.u.len())
            .field("v_len", &self.v.len())
            .finish()
    }
}

/// Encoded frame ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub timestamp_ms: TimestampMs,
    pub sequence_number: u64,
    /// JPEG bytes
    pub bytes: Vec<u8>,
}

/// Consumer of streamed frames
pub trait FrameAnalyzer: Send + Sync {
    /// Handle one frame; the frame is released when dropped
    fn analyze(&self, frame: RawFrame);
}

/// Streaming camera (push model)
pub trait FrameSource: Send + Sync {
    /// Whether camera access has been granted
    fn has_permission(&self) -> bool;

    /// Bind the camera with fixed settings and start delivering frames
    fn bind(&self, settings: &CameraSettings, analyzer: Arc<dyn FrameAnalyzer>)
        -> RecorderResult<()>;

    /// Stop delivering frames; no `analyze` call starts after this returns
    fn unbind(&self);
}

/// Still-image camera (pull model)
pub trait StillCamera: Send + Sync {
    /// Whether camera access has been granted
    fn has_permission(&self) -> bool;

    fn bind(&self, settings: &CameraSettings) -> RecorderResult<()>;

    /// Capture one still image, returning JPEG bytes
    fn capture_still(&self) -> RecorderResult<Vec<u8>>;

    fn unbind(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_frame_release_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let frame = RawFrame::new(
            2,
            2,
            Plane::packed(vec![0; 4], 2),
            Plane::packed(vec![128], 1),
            Plane::packed(vec![128], 1),
        )
        .on_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(frame);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_camera_settings() {
        let settings = CameraSettings::default();
        assert_eq!(settings.resolution, Resolution { width: 640, height: 480 });
        assert_eq!(settings.exposure_time_ns, 1_700_000);
        assert_eq!(settings.sensitivity_iso, 2000);
    }
}
