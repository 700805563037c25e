//! IMU Sync Recorder - synchronized inertial and camera capture.
//!
//! Records accelerometer, gyroscope and magnetometer samples to a CSV log,
//! optionally alongside streamed camera frames or timer-triggered still
//! captures, and exports the results to a shared area when a session stops.
//! Platform sensors, cameras and storage are reached through the traits in
//! [`sensor::source`], [`capture::traits`] and [`export`].

pub mod capture;
pub mod config;
pub mod export;
pub mod recorder;
pub mod sensor;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::RecorderConfig;
pub use recorder::{Collaborators, OperatingMode, RecordingEvent, SessionController};
pub use utils::error::{RecorderError, RecorderResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_DIRECTIVE: &str = "imu_sync_recorder=debug";

/// Initialize tracing/logging
///
/// `RUST_LOG` takes precedence over `default_directive`. Returns `false` if
/// a global subscriber was already installed by the host.
pub fn init_logging(default_directive: &str) -> bool {
    let initialized = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!("Starting IMU Sync Recorder v{}", env!("CARGO_PKG_VERSION"));
    }
    initialized
}
