//! Inertial sensor recording
//!
//! - [`types`]: sensor kinds, raw events and stamped samples
//! - [`buffer`]: flush-on-threshold sample text buffer
//! - [`collector`]: stamps events and appends them to the session CSV
//! - [`source`]: the sensor collaborator seam

pub mod buffer;
pub mod collector;
pub mod source;
pub mod types;

pub use buffer::{SampleBuffer, DEFAULT_FLUSH_THRESHOLD};
pub use collector::{ClosedLog, SensorCollector};
pub use source::{SensorEventSink, SensorSource};
pub use types::{RawSensorEvent, SamplingRate, SensorKind, SensorSample, CSV_HEADER};
