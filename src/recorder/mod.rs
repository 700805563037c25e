//! Recording session management
//!
//! - [`state`]: operating modes and per-session bookkeeping
//! - [`controller`]: the session controller that owns the mode and drives
//!   the sensor collector and camera pipelines

pub mod controller;
pub mod state;

pub use controller::{Collaborators, ModeWatch, RecordingEvent, SessionController};
pub use state::{LifecycleAction, OperatingMode, RecordingSession, SessionSummary};
