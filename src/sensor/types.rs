//! Inertial sample types

use crate::utils::clock::TimestampMs;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns of the session CSV
pub const CSV_COLUMNS: [&str; 5] = ["Timestamp", "Sensor", "X", "Y", "Z"];

/// Header line written at the start of every session's CSV block
pub const CSV_HEADER: &str = "Timestamp,Sensor,X,Y,Z\n";

/// Platform sensor type codes
pub mod type_codes {
    pub const ACCELEROMETER: u32 = 1;
    pub const MAGNETIC_FIELD: u32 = 2;
    pub const GYROSCOPE: u32 = 4;
}

/// Inertial sensor kinds recorded by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
}

impl SensorKind {
    /// Every kind a session subscribes to
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::Magnetometer,
    ];

    /// Map a platform sensor type code; unknown codes yield `None`
    pub fn from_type_code(code: u32) -> Option<Self> {
        match code {
            type_codes::ACCELEROMETER => Some(SensorKind::Accelerometer),
            type_codes::GYROSCOPE => Some(SensorKind::Gyroscope),
            type_codes::MAGNETIC_FIELD => Some(SensorKind::Magnetometer),
            _ => None,
        }
    }

    /// Platform type code for this kind
    pub fn type_code(&self) -> u32 {
        match self {
            SensorKind::Accelerometer => type_codes::ACCELEROMETER,
            SensorKind::Gyroscope => type_codes::GYROSCOPE,
            SensorKind::Magnetometer => type_codes::MAGNETIC_FIELD,
        }
    }

    /// Literal written in the `Sensor` column
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "Accelerometer",
            SensorKind::Gyroscope => "Gyroscope",
            SensorKind::Magnetometer => "Magnetometer",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested platform sampling rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingRate {
    /// As fast as the hardware allows
    Fastest,
    /// Highest rate usable without saturating the platform
    #[default]
    Game,
    /// Rate suitable for UI updates
    Ui,
    /// Default platform rate
    Normal,
}

impl SamplingRate {
    /// Nominal delay between events in microseconds
    pub fn period_us(&self) -> u32 {
        match self {
            SamplingRate::Fastest => 0,
            SamplingRate::Game => 20_000,
            SamplingRate::Ui => 66_667,
            SamplingRate::Normal => 200_000,
        }
    }
}

/// Raw event as delivered by the sensor collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSensorEvent {
    /// Platform sensor type code
    pub sensor_type: u32,
    /// x, y, z
    pub values: [f32; 3],
}

impl RawSensorEvent {
    pub fn new(sensor_type: u32, values: [f32; 3]) -> Self {
        Self { sensor_type, values }
    }

    /// Event for a known kind
    pub fn of(kind: SensorKind, values: [f32; 3]) -> Self {
        Self::new(kind.type_code(), values)
    }
}

/// One timestamped 3-axis inertial reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp_ms: TimestampMs,
    pub kind: SensorKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SensorSample {
    /// Stamp a raw event; `None` for unrecognized sensor types
    pub fn from_event(event: &RawSensorEvent, timestamp_ms: TimestampMs) -> Option<Self> {
        let kind = SensorKind::from_type_code(event.sensor_type)?;
        let [x, y, z] = event.values;
        Some(Self {
            timestamp_ms,
            kind,
            x,
            y,
            z,
        })
    }
}

impl SensorSample {
    /// Fields of the CSV record, in [`CSV_COLUMNS`] order
    pub fn record(&self) -> [String; 5] {
        [
            self.timestamp_ms.to_string(),
            self.kind.as_str().to_string(),
            self.x.to_string(),
            self.y.to_string(),
            self.z.to_string(),
        ]
    }
}
