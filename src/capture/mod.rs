//! Camera capture
//!
//! This module provides the camera seams and the two frame pipelines:
//! continuous streamed frames and timer-triggered still captures.

pub mod encoder;
pub mod streamed;
pub mod traits;
pub mod triggered;

pub use encoder::{encode_frame, pack_planes, EncodeError, JPEG_QUALITY};
pub use streamed::{FrameStats, StreamedFramePipeline, StreamedPipelineConfig};
pub use traits::{
    CameraSettings, CapturedFrame, FrameAnalyzer, FrameSource, Plane, RawFrame, Resolution,
    StillCamera,
};
pub use triggered::{CaptureStats, TriggeredCapturePipeline, TriggeredPipelineConfig};
