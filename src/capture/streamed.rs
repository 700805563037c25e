//! Streamed-frame pipeline
//!
//! Frames pushed by the camera are handed to one dedicated worker thread
//! through a zero-capacity channel, so the pipeline never holds more than one
//! frame in flight; a camera that cannot hand a frame over is expected to drop
//! it upstream. Every `save_interval`-th frame is encoded and written as
//! `frame_<ms>.jpg`. Each frame is released as soon as the worker is done with
//! it, saved or not.
//!
//! The same worker also serves single-shot requests: the next frame delivered
//! after [`StreamedFramePipeline::request_single_shot`] is written as
//! `single_<ms>.jpg`.

use super::encoder::encode_frame;
use super::traits::{CapturedFrame, FrameAnalyzer, RawFrame};
use crate::recorder::controller::RecordingEvent;
use crate::utils::clock::Clock;
use crate::utils::paths::{timestamped_path, FRAME_PREFIX, JPEG_EXTENSION, SINGLE_SHOT_PREFIX};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Streamed-frame pipeline settings
#[derive(Debug, Clone)]
pub struct StreamedPipelineConfig {
    /// Persist every Nth frame (1 = every frame)
    pub save_interval: u64,
    /// Directory for `frame_<ms>.jpg`
    pub frames_dir: PathBuf,
    /// Directory for `single_<ms>.jpg`
    pub single_shots_dir: PathBuf,
    /// How long a single-shot request waits for a frame
    pub single_shot_timeout: Duration,
}

/// Counters for one activation of the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    /// Frames counted by the streaming path (the frame counter)
    pub delivered: u64,
    /// Frames written to disk
    pub saved: u64,
    /// Frames dropped because encoding or writing failed
    pub failed: u64,
}

struct SingleShotRequest {
    deadline: Instant,
    reply: Sender<Option<PathBuf>>,
}

struct Shared {
    config: StreamedPipelineConfig,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<RecordingEvent>,
    persist_stream: AtomicBool,
    frame_counter: AtomicU64,
    saved: AtomicU64,
    failed: AtomicU64,
    single_shot: Mutex<Option<SingleShotRequest>>,
}

impl Shared {
    fn process(&self, frame: RawFrame) {
        let timestamp_ms = self.clock.now_ms();

        let stream_seq = if self.persist_stream.load(Ordering::SeqCst) {
            let n = self.frame_counter.fetch_add(1, Ordering::SeqCst) + 1;
            Some(n).filter(|n| n % self.config.save_interval.max(1) == 0)
        } else {
            None
        };
        let single_shot = self.take_single_shot();

        if stream_seq.is_none() && single_shot.is_none() {
            return;
        }

        let bytes = match encode_frame(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Dropping frame: {}", e);
                self.failed.fetch_add(1, Ordering::Relaxed);
                if let Some(request) = single_shot {
                    let _ = request.reply.send(None);
                }
                return;
            }
        };
        drop(frame);

        if let Some(request) = single_shot {
            let captured = CapturedFrame {
                timestamp_ms,
                sequence_number: 0,
                bytes: bytes.clone(),
            };
            let dir = &self.config.single_shots_dir;
            let saved = match write_frame(dir, SINGLE_SHOT_PREFIX, captured) {
                Ok(path) => {
                    tracing::info!("Saved single image: {:?}", path);
                    let _ = self.events.send(RecordingEvent::SingleShotSaved(path.clone()));
                    Some(path)
                }
                Err(e) => {
                    tracing::warn!("Failed to write single image: {}", e);
                    None
                }
            };
            let _ = request.reply.send(saved);
        }

        if let Some(sequence_number) = stream_seq {
            let captured = CapturedFrame {
                timestamp_ms,
                sequence_number,
                bytes,
            };
            match write_frame(&self.config.frames_dir, FRAME_PREFIX, captured) {
                Ok(path) => {
                    self.saved.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Saved frame {} to {:?}", sequence_number, path);
                }
                Err(e) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Failed to write frame {}: {}", sequence_number, e);
                }
            }
        }
    }

    /// Take a pending single-shot request that has not expired
    fn take_single_shot(&self) -> Option<SingleShotRequest> {
        let request = self.single_shot.lock().take()?;
        if Instant::now() > request.deadline {
            tracing::debug!("Single-shot request expired before a frame arrived");
            let _ = request.reply.send(None);
            return None;
        }
        Some(request)
    }

    fn stats(&self) -> FrameStats {
        FrameStats {
            delivered: self.frame_counter.load(Ordering::SeqCst),
            saved: self.saved.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Write an encoded frame under a timestamped name; the frame is consumed
fn write_frame(dir: &Path, prefix: &str, frame: CapturedFrame) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = timestamped_path(dir, prefix, frame.timestamp_ms, JPEG_EXTENSION);
    fs::write(&path, &frame.bytes)?;
    Ok(path)
}

type FrameSlot = Arc<Mutex<Option<SyncSender<RawFrame>>>>;

/// Analyzer handed to the camera; forwards frames to the worker
struct FrameFeed {
    slot: FrameSlot,
}

impl FrameAnalyzer for FrameFeed {
    fn analyze(&self, frame: RawFrame) {
        let guard = self.slot.lock();
        match guard.as_ref() {
            // Blocks until the worker takes the frame
            Some(sender) => {
                if let Err(mpsc::SendError(frame)) = sender.send(frame) {
                    drop(frame);
                }
            }
            None => drop(frame),
        }
    }
}

struct FrameWorker {
    slot: FrameSlot,
    handle: JoinHandle<()>,
}

/// Continuous frame pipeline with throttled persistence
pub struct StreamedFramePipeline {
    shared: Arc<Shared>,
    worker: Option<FrameWorker>,
}

impl StreamedFramePipeline {
    pub fn new(
        config: StreamedPipelineConfig,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<RecordingEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                clock,
                events,
                persist_stream: AtomicBool::new(false),
                frame_counter: AtomicU64::new(0),
                saved: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                single_shot: Mutex::new(None),
            }),
            worker: None,
        }
    }

    /// Start persisting streamed frames; returns the analyzer to bind
    pub fn start_streaming(&mut self) -> io::Result<Arc<dyn FrameAnalyzer>> {
        self.shared.frame_counter.store(0, Ordering::SeqCst);
        self.shared.saved.store(0, Ordering::SeqCst);
        self.shared.failed.store(0, Ordering::SeqCst);
        self.shared.persist_stream.store(true, Ordering::SeqCst);
        self.spawn_worker()
    }

    /// Start the worker for single shots only; streamed frames are not saved
    pub fn start_single_shot_only(&mut self) -> io::Result<Arc<dyn FrameAnalyzer>> {
        self.shared.persist_stream.store(false, Ordering::SeqCst);
        self.spawn_worker()
    }

    fn spawn_worker(&mut self) -> io::Result<Arc<dyn FrameAnalyzer>> {
        if let Some(worker) = &self.worker {
            return Ok(Arc::new(FrameFeed {
                slot: worker.slot.clone(),
            }));
        }

        let (tx, rx) = mpsc::sync_channel::<RawFrame>(0);
        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("frame-analysis".to_string())
            .spawn(move || run_worker(shared, rx))?;

        let slot: FrameSlot = Arc::new(Mutex::new(Some(tx)));
        self.worker = Some(FrameWorker {
            slot: slot.clone(),
            handle,
        });

        tracing::info!(
            "Frame analysis worker started (save every {} frame(s))",
            self.shared.config.save_interval
        );
        Ok(Arc::new(FrameFeed { slot }))
    }

    /// Ask for the next delivered frame to be saved as a single shot
    ///
    /// The receiver yields the saved path, or `None` if the frame could not be
    /// written. It disconnects without a value if the pipeline stops first.
    pub fn request_single_shot(&self) -> Receiver<Option<PathBuf>> {
        let (reply, rx) = mpsc::channel();
        let request = SingleShotRequest {
            deadline: Instant::now() + self.shared.config.single_shot_timeout,
            reply,
        };
        if self.shared.single_shot.lock().replace(request).is_some() {
            tracing::debug!("Replacing pending single-shot request");
        }
        rx
    }

    /// Cancel a pending single-shot request
    pub fn cancel_single_shot(&self) {
        self.shared.single_shot.lock().take();
    }

    /// Whether frames are being persisted
    pub fn is_streaming(&self) -> bool {
        self.shared.persist_stream.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.worker.is_some()
    }

    pub fn stats(&self) -> FrameStats {
        self.shared.stats()
    }

    pub fn single_shot_timeout(&self) -> Duration {
        self.shared.config.single_shot_timeout
    }

    /// Detach the worker
    ///
    /// Frames already handed over are processed and released before this
    /// returns. Returns the counters of the finished activation.
    pub fn stop(&mut self) -> FrameStats {
        self.shared.persist_stream.store(false, Ordering::SeqCst);
        self.cancel_single_shot();

        if let Some(worker) = self.worker.take() {
            worker.slot.lock().take();
            if worker.handle.join().is_err() {
                tracing::error!("Frame analysis worker panicked");
            }
            tracing::info!("Frame analysis worker stopped");
        }

        self.shared.stats()
    }
}

impl Drop for StreamedFramePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(shared: Arc<Shared>, rx: Receiver<RawFrame>) {
    while let Ok(frame) = rx.recv() {
        shared.process(frame);
    }
}
