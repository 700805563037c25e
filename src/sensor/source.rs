//! Sensor collaborator interface
//!
//! The platform sensor driver is external. The recorder only subscribes and
//! unsubscribes; events are pushed into a [`SensorEventSink`].

use super::types::{RawSensorEvent, SamplingRate, SensorKind};
use crate::utils::error::RecorderResult;
use std::sync::Arc;

/// Receiver of raw sensor events
///
/// Called on whatever thread the sensor driver delivers on. Implementations
/// must not assume anything about their caller beyond "unsubscribe happens
/// before the sink is released".
pub trait SensorEventSink: Send + Sync {
    fn on_sensor_event(&self, event: RawSensorEvent);
}

/// Platform sensor source
pub trait SensorSource: Send + Sync {
    /// Start delivering events of `kind` to `sink`
    ///
    /// Fails when the device has no such sensor.
    fn subscribe(
        &self,
        kind: SensorKind,
        rate: SamplingRate,
        sink: Arc<dyn SensorEventSink>,
    ) -> RecorderResult<()>;

    /// Drop every subscription; no event is delivered after this returns
    fn unsubscribe_all(&self);
}
