//! Recording session controller
//!
//! Owns the single [`OperatingMode`] and drives the start/stop lifecycle:
//! camera pipeline, sensor subscriptions, CSV log and the final export.
//! Each mode only differs in which pipeline hooks it activates.

use super::state::{LifecycleAction, OperatingMode, RecordingSession, SessionSummary};
use crate::capture::streamed::{FrameStats, StreamedFramePipeline};
use crate::capture::traits::{FrameSource, StillCamera};
use crate::capture::triggered::{CaptureStats, TriggeredCapturePipeline};
use crate::config::RecorderConfig;
use crate::export::{ExportKind, ExportTarget};
use crate::sensor::collector::{ClosedLog, SensorCollector};
use crate::sensor::source::{SensorEventSink, SensorSource};
use crate::sensor::types::SensorKind;
use crate::utils::clock::{Clock, WallClock};
use crate::utils::error::{ErrorResponse, RecorderError, RecorderResult};
use parking_lot::RwLock;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted during recording
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Recording started
    Started { mode: OperatingMode, session_id: Uuid },
    /// Recording stopped
    Stopped(SessionSummary),
    /// Session CSV copied to the export area
    CsvExported(PathBuf),
    /// Single-shot frame written
    SingleShotSaved(PathBuf),
    /// Triggered capture exported
    CaptureSaved(PathBuf),
    /// Triggered capture failed; the sequence continues
    CaptureFailed { index: u64, message: String },
    /// Error to surface to the user
    Error(ErrorResponse),
}

/// External collaborators the controller drives
pub struct Collaborators {
    pub sensors: Arc<dyn SensorSource>,
    pub frame_source: Option<Arc<dyn FrameSource>>,
    pub still_camera: Option<Arc<dyn StillCamera>>,
    pub export: Arc<dyn ExportTarget>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Sensor source and export target only; no camera, wall clock
    pub fn new(sensors: Arc<dyn SensorSource>, export: Arc<dyn ExportTarget>) -> Self {
        Self {
            sensors,
            frame_source: None,
            still_camera: None,
            export,
            clock: Arc::new(WallClock),
        }
    }

    pub fn with_frame_source(mut self, source: Arc<dyn FrameSource>) -> Self {
        self.frame_source = Some(source);
        self
    }

    pub fn with_still_camera(mut self, camera: Arc<dyn StillCamera>) -> Self {
        self.still_camera = Some(camera);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Read-only view of the current mode, shareable across threads
#[derive(Clone)]
pub struct ModeWatch(Arc<RwLock<OperatingMode>>);

impl ModeWatch {
    pub fn get(&self) -> OperatingMode {
        *self.0.read()
    }
}

/// Single owner of the recording session
pub struct SessionController {
    config: RecorderConfig,

    /// Current operating mode
    mode: Arc<RwLock<OperatingMode>>,

    /// Active session, `None` when idle
    session: Option<RecordingSession>,

    sensors: Arc<dyn SensorSource>,
    frame_source: Option<Arc<dyn FrameSource>>,
    still_camera: Option<Arc<dyn StillCamera>>,
    export: Arc<dyn ExportTarget>,
    clock: Arc<dyn Clock>,

    collector: Arc<SensorCollector>,
    streamed: StreamedFramePipeline,
    triggered: Option<TriggeredCapturePipeline>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl SessionController {
    /// Create an idle controller
    pub fn new(config: RecorderConfig, collaborators: Collaborators) -> RecorderResult<Self> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(100);
        let Collaborators {
            sensors,
            frame_source,
            still_camera,
            export,
            clock,
        } = collaborators;

        let collector = Arc::new(SensorCollector::new(
            clock.clone(),
            config.sensors.flush_threshold,
        ));
        let streamed =
            StreamedFramePipeline::new(config.streamed_pipeline(), clock.clone(), event_tx.clone());
        let triggered = still_camera.as_ref().map(|camera| {
            TriggeredCapturePipeline::new(
                config.triggered_pipeline(),
                camera.clone(),
                export.clone(),
                clock.clone(),
                event_tx.clone(),
            )
        });

        Ok(Self {
            config,
            mode: Arc::new(RwLock::new(OperatingMode::Idle)),
            session: None,
            sensors,
            frame_source,
            still_camera,
            export,
            clock,
            collector,
            streamed,
            triggered,
            event_tx,
        })
    }

    /// Get the current operating mode
    pub fn mode(&self) -> OperatingMode {
        *self.mode.read()
    }

    /// Shareable read-only view of the mode
    pub fn mode_watch(&self) -> ModeWatch {
        ModeWatch(self.mode.clone())
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Snapshot of the active session with live counters
    pub fn session(&self) -> Option<RecordingSession> {
        let mut session = self.session.clone()?;
        session.frame_counter = self.frame_stats(session.mode).delivered;
        session.capture_counter = self.capture_stats(session.mode).issued;
        Some(session)
    }

    fn emit_error(&self, error: &RecorderError) {
        let _ = self.event_tx.send(RecordingEvent::Error(ErrorResponse::from(error)));
    }

    /// Start a session in `mode`
    ///
    /// Starting the mode that is already active returns
    /// [`RecorderError::AlreadyRecording`]; starting a different mode while
    /// one is active returns [`RecorderError::ModeConflict`]. Neither changes
    /// any state.
    pub fn start(&mut self, mode: OperatingMode) -> RecorderResult<()> {
        let active = self.mode();
        if mode == OperatingMode::Idle {
            return Err(RecorderError::InvalidMode(
                "cannot start a session in idle mode".to_string(),
            ));
        }
        if active == mode {
            tracing::warn!("Start ignored: already recording in {} mode", mode);
            return Err(RecorderError::AlreadyRecording(mode));
        }
        if active != OperatingMode::Idle {
            tracing::warn!("Start of {} rejected while {} is active", mode, active);
            return Err(RecorderError::ModeConflict {
                active,
                requested: mode,
            });
        }

        // Camera first: a failed bind must leave no sensor or file behind
        let camera_result = match mode {
            OperatingMode::InertialPlusStreamedFrames => self.activate_streamed(),
            OperatingMode::InertialPlusTriggeredCaptures => self.activate_triggered(),
            _ => Ok(()),
        };
        if let Err(e) = camera_result {
            tracing::error!("Failed to start {} session: {}", mode, e);
            self.emit_error(&e);
            return Err(e);
        }

        let session = RecordingSession::new(mode, self.clock.now_ms());
        tracing::info!("Starting {} session {}", mode, session.id);

        let csv_path = self.config.csv_path();
        if let Err(e) = self.collector.open(&csv_path) {
            let e = RecorderError::from(e);
            tracing::warn!(
                "Sensor log {:?} could not be opened, samples will be discarded: {}",
                csv_path,
                e
            );
            self.emit_error(&e);
        }

        let sink: Arc<dyn SensorEventSink> = self.collector.clone();
        let rate = self.config.sensors.sampling_rate;
        for kind in SensorKind::ALL {
            if let Err(e) = self.sensors.subscribe(kind, rate, sink.clone()) {
                tracing::warn!("{} unavailable, recording without it: {}", kind, e);
            }
        }

        let _ = self.event_tx.send(RecordingEvent::Started {
            mode,
            session_id: session.id,
        });
        self.session = Some(session);
        *self.mode.write() = mode;

        tracing::info!("Recording started ({})", mode);
        Ok(())
    }

    fn activate_streamed(&mut self) -> RecorderResult<()> {
        let source = self.frame_source.clone().ok_or_else(|| {
            RecorderError::StartupBinding("no streaming camera available".to_string())
        })?;
        if !source.has_permission() {
            return Err(RecorderError::PermissionDenied(
                "camera access not granted".to_string(),
            ));
        }

        let analyzer = self
            .streamed
            .start_streaming()
            .map_err(|e| RecorderError::StartupBinding(e.to_string()))?;

        if let Err(e) = source.bind(&self.config.camera_settings(), analyzer) {
            self.streamed.stop();
            return Err(binding_error(e));
        }
        Ok(())
    }

    fn activate_triggered(&mut self) -> RecorderResult<()> {
        let camera = self.still_camera.clone().ok_or_else(|| {
            RecorderError::StartupBinding("no still camera available".to_string())
        })?;
        if !camera.has_permission() {
            return Err(RecorderError::PermissionDenied(
                "camera access not granted".to_string(),
            ));
        }

        camera
            .bind(&self.config.camera_settings())
            .map_err(binding_error)?;

        let started = match self.triggered.as_mut() {
            Some(pipeline) => pipeline.start(),
            None => Ok(()),
        };
        if let Err(e) = started {
            camera.unbind();
            return Err(RecorderError::StartupBinding(e.to_string()));
        }
        Ok(())
    }

    fn frame_stats(&self, mode: OperatingMode) -> FrameStats {
        if mode == OperatingMode::InertialPlusStreamedFrames {
            self.streamed.stats()
        } else {
            FrameStats::default()
        }
    }

    fn capture_stats(&self, mode: OperatingMode) -> CaptureStats {
        match (mode, &self.triggered) {
            (OperatingMode::InertialPlusTriggeredCaptures, Some(pipeline)) => pipeline.stats(),
            _ => CaptureStats::default(),
        }
    }

    /// Stop the active session
    ///
    /// Deactivates the mode pipeline, unsubscribes every sensor, flushes and
    /// closes the CSV, then exports it. Returns `None` (and does nothing) when
    /// idle. Failures along the way are logged and reported as events; the
    /// controller always ends up idle.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        let mode = self.mode();
        if mode == OperatingMode::Idle {
            return None;
        }

        tracing::info!("Stopping {} session", mode);

        let mut frames = FrameStats::default();
        let mut captures = CaptureStats::default();
        match mode {
            OperatingMode::InertialPlusStreamedFrames => {
                if let Some(source) = &self.frame_source {
                    source.unbind();
                }
                frames = self.streamed.stop();
            }
            OperatingMode::InertialPlusTriggeredCaptures => {
                if let Some(pipeline) = self.triggered.as_mut() {
                    captures = pipeline.stop();
                }
                if let Some(camera) = &self.still_camera {
                    camera.unbind();
                }
            }
            _ => {}
        }

        self.sensors.unsubscribe_all();

        let closed = match self.collector.close() {
            Ok(closed) => closed,
            Err(e) => {
                let e = RecorderError::from(e);
                tracing::warn!("Failed to finalize sensor log: {}", e);
                self.emit_error(&e);
                None
            }
        };
        let exported_csv = closed.as_ref().and_then(|log| self.export_csv(log, mode));

        let stopped_at_ms = self.clock.now_ms();
        let session = self
            .session
            .take()
            .unwrap_or_else(|| RecordingSession::new(mode, stopped_at_ms));
        *self.mode.write() = OperatingMode::Idle;

        let summary = SessionSummary {
            id: session.id,
            mode,
            started_at_ms: session.started_at_ms,
            stopped_at_ms,
            samples: closed.as_ref().map(|log| log.samples).unwrap_or(0),
            csv_path: closed.map(|log| log.path),
            exported_csv,
            frames,
            captures,
        };

        tracing::info!(
            "Recording stopped. Duration: {}ms, {} samples, {} frames saved, {} captures saved",
            summary.duration_ms(),
            summary.samples,
            summary.frames.saved,
            summary.captures.saved
        );
        let _ = self.event_tx.send(RecordingEvent::Stopped(summary.clone()));
        Some(summary)
    }

    fn export_csv(&self, log: &ClosedLog, mode: OperatingMode) -> Option<PathBuf> {
        let result = fs::read(&log.path).and_then(|bytes| {
            self.export
                .export(mode.export_file_name(), ExportKind::Document, &bytes)
        });

        match result {
            Ok(path) => {
                tracing::info!("Sensor CSV exported to {:?}", path);
                let _ = self.event_tx.send(RecordingEvent::CsvExported(path.clone()));
                Some(path)
            }
            Err(e) => {
                let e = RecorderError::from(e);
                tracing::warn!("Failed to export sensor CSV: {}", e);
                self.emit_error(&e);
                None
            }
        }
    }

    /// Save exactly one frame as `single_<ms>.jpg`
    ///
    /// Uses the live pipeline during a streamed session; otherwise binds the
    /// camera just for this frame. Gives up after the single-shot timeout.
    /// Returns the saved path, or `None` if no frame could be saved in time.
    pub fn capture_single_frame(&mut self) -> RecorderResult<Option<PathBuf>> {
        let source = self.frame_source.clone().ok_or_else(|| {
            RecorderError::StartupBinding("no streaming camera available".to_string())
        })?;
        if !source.has_permission() {
            let e = RecorderError::PermissionDenied("camera access not granted".to_string());
            self.emit_error(&e);
            return Err(e);
        }

        let timeout = self.streamed.single_shot_timeout();

        if self.mode() == OperatingMode::InertialPlusStreamedFrames {
            let reply = self.streamed.request_single_shot();
            return Ok(self.await_single_shot(reply.recv_timeout(timeout)));
        }

        let analyzer = self
            .streamed
            .start_single_shot_only()
            .map_err(|e| RecorderError::StartupBinding(e.to_string()))?;
        let reply = self.streamed.request_single_shot();

        if let Err(e) = source.bind(&self.config.camera_settings(), analyzer) {
            self.streamed.stop();
            let e = binding_error(e);
            self.emit_error(&e);
            return Err(e);
        }

        let saved = self.await_single_shot(reply.recv_timeout(timeout));
        source.unbind();
        self.streamed.stop();
        Ok(saved)
    }

    fn await_single_shot(
        &self,
        reply: Result<Option<PathBuf>, RecvTimeoutError>,
    ) -> Option<PathBuf> {
        match reply {
            Ok(saved) => saved,
            Err(_) => {
                self.streamed.cancel_single_shot();
                tracing::warn!("No frame arrived for single-shot capture, detaching");
                None
            }
        }
    }

    /// Block until the triggered-capture budget is spent, up to `timeout`
    pub fn wait_for_capture_budget(&self, timeout: Duration) -> bool {
        match &self.triggered {
            Some(pipeline) if self.mode() == OperatingMode::InertialPlusTriggeredCaptures => {
                pipeline.wait_until_finished(timeout)
            }
            _ => false,
        }
    }

    /// Handle a display configuration change (e.g. rotation)
    ///
    /// Inertial-only sessions keep running untouched. Camera sessions cannot
    /// carry a live camera binding across the change, so they are stopped
    /// (including export) and started again in the same mode.
    pub fn on_configuration_changed(&mut self) -> RecorderResult<LifecycleAction> {
        let mode = self.mode();
        match mode {
            OperatingMode::Idle => Ok(LifecycleAction::None),
            OperatingMode::InertialOnly => {
                tracing::debug!("Configuration change ignored in inertial-only mode");
                Ok(LifecycleAction::Ignored)
            }
            _ => {
                tracing::info!("Configuration change in {} mode, restarting session", mode);
                self.stop();
                self.start(mode)?;
                Ok(LifecycleAction::Restarted)
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.mode().is_recording() {
            tracing::info!("Controller torn down while recording, stopping session");
            self.stop();
        }
    }
}

/// Permission failures pass through; anything else is a binding failure
fn binding_error(error: RecorderError) -> RecorderError {
    if error.blocks_camera() {
        error
    } else {
        RecorderError::StartupBinding(error.to_string())
    }
}
