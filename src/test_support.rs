//! Test doubles for the platform collaborators

use crate::capture::traits::{
    CameraSettings, FrameAnalyzer, FrameSource, Plane, RawFrame, StillCamera,
};
use crate::export::{ExportKind, ExportTarget};
use crate::sensor::source::{SensorEventSink, SensorSource};
use crate::sensor::types::{RawSensorEvent, SamplingRate, SensorKind};
use crate::utils::clock::{Clock, TimestampMs};
use crate::utils::error::{RecorderError, RecorderResult};
use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Clock that returns `start`, `start + 1`, ... on successive reads
pub struct StepClock {
    next: AtomicI64,
}

impl StepClock {
    pub fn new(start: TimestampMs) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl Clock for StepClock {
    fn now_ms(&self) -> TimestampMs {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

/// Uniform-colour frame with tightly packed planes
pub fn solid_frame(width: u32, height: u32, y: u8, u: u8, v: u8) -> RawFrame {
    let chroma_w = (width as usize).div_ceil(2);
    let chroma_h = (height as usize).div_ceil(2);
    RawFrame::new(
        width,
        height,
        Plane::packed(vec![y; (width * height) as usize], width as usize),
        Plane::packed(vec![u; chroma_w * chroma_h], chroma_w),
        Plane::packed(vec![v; chroma_w * chroma_h], chroma_w),
    )
}

/// Minimal JPEG marker pair returned by [`MockStillCamera`]
pub const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

/// Sensor source that hands events straight to its subscribers
#[derive(Default)]
pub struct MockSensorSource {
    missing: Vec<SensorKind>,
    subscriptions: Mutex<Vec<(SensorKind, Arc<dyn SensorEventSink>)>>,
}

impl MockSensorSource {
    /// Device without the given sensors
    pub fn without(missing: &[SensorKind]) -> Self {
        Self {
            missing: missing.to_vec(),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Deliver `event` to every sink subscribed to its sensor type
    pub fn emit(&self, event: RawSensorEvent) {
        let sinks: Vec<Arc<dyn SensorEventSink>> = self
            .subscriptions
            .lock()
            .iter()
            .filter(|(kind, _)| kind.type_code() == event.sensor_type)
            .map(|(_, sink)| sink.clone())
            .collect();
        for sink in sinks {
            sink.on_sensor_event(event);
        }
    }

    pub fn last_sink(&self) -> Option<Arc<dyn SensorEventSink>> {
        self.subscriptions.lock().last().map(|(_, sink)| sink.clone())
    }
}

impl SensorSource for MockSensorSource {
    fn subscribe(
        &self,
        kind: SensorKind,
        _rate: SamplingRate,
        sink: Arc<dyn SensorEventSink>,
    ) -> RecorderResult<()> {
        if self.missing.contains(&kind) {
            return Err(RecorderError::Capture(format!("no {} on this device", kind)));
        }
        self.subscriptions.lock().push((kind, sink));
        Ok(())
    }

    fn unsubscribe_all(&self) {
        self.subscriptions.lock().clear();
    }
}

struct Feeder {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Streaming camera double
///
/// In manual mode frames are pushed with [`MockFrameSource::deliver`]; in
/// auto-feeding mode a thread delivers frames for as long as it is bound.
pub struct MockFrameSource {
    permission: bool,
    auto_feed: bool,
    analyzer: Mutex<Option<Arc<dyn FrameAnalyzer>>>,
    feeder: Mutex<Option<Feeder>>,
    binds: AtomicUsize,
    unbinds: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl Default for MockFrameSource {
    fn default() -> Self {
        Self {
            permission: true,
            auto_feed: false,
            analyzer: Mutex::new(None),
            feeder: Mutex::new(None),
            binds: AtomicUsize::new(0),
            unbinds: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockFrameSource {
    pub fn without_permission() -> Self {
        Self {
            permission: false,
            ..Self::default()
        }
    }

    pub fn auto_feeding() -> Self {
        Self {
            auto_feed: true,
            ..Self::default()
        }
    }

    /// Push one frame to the bound analyzer; dropped when unbound
    pub fn deliver(&self, frame: RawFrame) {
        let frame = counted(frame, &self.released);
        let analyzer = self.analyzer.lock().clone();
        if let Some(analyzer) = analyzer {
            analyzer.analyze(frame);
        }
    }

    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn unbind_count(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }

    /// Frames released back to the camera
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

fn counted(frame: RawFrame, released: &Arc<AtomicUsize>) -> RawFrame {
    let released = released.clone();
    frame.on_release(move || {
        released.fetch_add(1, Ordering::SeqCst);
    })
}

impl FrameSource for MockFrameSource {
    fn has_permission(&self) -> bool {
        self.permission
    }

    fn bind(
        &self,
        _settings: &CameraSettings,
        analyzer: Arc<dyn FrameAnalyzer>,
    ) -> RecorderResult<()> {
        if !self.permission {
            return Err(RecorderError::PermissionDenied("camera".to_string()));
        }
        self.binds.fetch_add(1, Ordering::SeqCst);

        if self.auto_feed {
            let stop = Arc::new(AtomicBool::new(false));
            let released = self.released.clone();
            let feeder_stop = stop.clone();
            let feeder_analyzer = analyzer.clone();
            let handle = thread::spawn(move || {
                while !feeder_stop.load(Ordering::SeqCst) {
                    let frame = counted(solid_frame(8, 8, 120, 128, 128), &released);
                    feeder_analyzer.analyze(frame);
                    thread::sleep(Duration::from_millis(2));
                }
            });
            *self.feeder.lock() = Some(Feeder { stop, handle });
        }

        *self.analyzer.lock() = Some(analyzer);
        Ok(())
    }

    fn unbind(&self) {
        self.unbinds.fetch_add(1, Ordering::SeqCst);
        self.analyzer.lock().take();
        if let Some(feeder) = self.feeder.lock().take() {
            feeder.stop.store(true, Ordering::SeqCst);
            let _ = feeder.handle.join();
        }
    }
}

/// Still camera double; captures numbered from 1 can be set to fail
pub struct MockStillCamera {
    permission: bool,
    fail_bind: bool,
    failing: Vec<u64>,
    requests: AtomicU64,
    unbinds: AtomicUsize,
}

impl Default for MockStillCamera {
    fn default() -> Self {
        Self {
            permission: true,
            fail_bind: false,
            failing: Vec::new(),
            requests: AtomicU64::new(0),
            unbinds: AtomicUsize::new(0),
        }
    }
}

impl MockStillCamera {
    pub fn failing_on(captures: &[u64]) -> Self {
        Self {
            failing: captures.to_vec(),
            ..Self::default()
        }
    }

    pub fn failing_bind() -> Self {
        Self {
            fail_bind: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn unbind_count(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }
}

impl StillCamera for MockStillCamera {
    fn has_permission(&self) -> bool {
        self.permission
    }

    fn bind(&self, _settings: &CameraSettings) -> RecorderResult<()> {
        if self.fail_bind {
            return Err(RecorderError::Capture("camera in use".to_string()));
        }
        Ok(())
    }

    fn capture_still(&self) -> RecorderResult<Vec<u8>> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.contains(&n) {
            return Err(RecorderError::Capture(format!("capture {} failed", n)));
        }
        Ok(FAKE_JPEG.to_vec())
    }

    fn unbind(&self) {
        self.unbinds.fetch_add(1, Ordering::SeqCst);
    }
}

/// Export target that keeps everything in memory
#[derive(Default)]
pub struct MemoryExport {
    files: Mutex<Vec<(String, ExportKind, Vec<u8>)>>,
}

impl MemoryExport {
    /// Names of exported pictures, in export order
    pub fn pictures(&self) -> Vec<String> {
        self.files
            .lock()
            .iter()
            .filter(|(_, kind, _)| *kind == ExportKind::Picture)
            .map(|(name, _, _)| name.clone())
            .collect()
    }

    /// Exported documents as (name, bytes)
    pub fn documents(&self) -> Vec<(String, Vec<u8>)> {
        self.files
            .lock()
            .iter()
            .filter(|(_, kind, _)| *kind == ExportKind::Document)
            .map(|(name, _, bytes)| (name.clone(), bytes.clone()))
            .collect()
    }
}

impl ExportTarget for MemoryExport {
    fn export(&self, file_name: &str, kind: ExportKind, bytes: &[u8]) -> io::Result<PathBuf> {
        self.files
            .lock()
            .push((file_name.to_string(), kind, bytes.to_vec()));
        Ok(PathBuf::from("memory").join(file_name))
    }
}
