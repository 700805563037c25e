//! Triggered-capture pipeline
//!
//! A fixed-delay timer issues one still capture per tick until the capture
//! budget is spent or the pipeline is stopped. Each tick is scheduled only
//! after the previous one finished. A failed capture is logged and the
//! sequence carries on with the next tick.

use super::traits::StillCamera;
use crate::export::{ExportKind, ExportTarget};
use crate::recorder::controller::RecordingEvent;
use crate::utils::clock::Clock;
use crate::utils::paths::{timestamped_name, CAPTURE_PREFIX, JPEG_EXTENSION};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::broadcast;

/// Triggered-capture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggeredPipelineConfig {
    /// Delay between the end of one tick and the next
    pub interval: Duration,
    /// Capture budget per session
    pub max_captures: u64,
}

/// Counters for one activation of the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStats {
    /// Ticks that issued a capture request (the capture counter)
    pub issued: u64,
    /// Captures exported successfully
    pub saved: u64,
    /// Captures that failed or could not be exported
    pub failed: u64,
}

struct Shared {
    config: TriggeredPipelineConfig,
    camera: Arc<dyn StillCamera>,
    export: Arc<dyn ExportTarget>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<RecordingEvent>,
    issued: AtomicU64,
    saved: AtomicU64,
    failed: AtomicU64,
    finished: AtomicBool,
}

impl Shared {
    fn budget_left(&self) -> bool {
        self.issued.load(Ordering::SeqCst) < self.config.max_captures
    }

    fn tick(&self) {
        let index = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let timestamp_ms = self.clock.now_ms();

        let result = self.camera.capture_still().and_then(|bytes| {
            let name = timestamped_name(CAPTURE_PREFIX, timestamp_ms, JPEG_EXTENSION);
            self.export
                .export(&name, ExportKind::Picture, &bytes)
                .map_err(Into::into)
        });

        match result {
            Ok(path) => {
                self.saved.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(
                    "Capture {}/{} saved to {:?}",
                    index,
                    self.config.max_captures,
                    path
                );
                let _ = self.events.send(RecordingEvent::CaptureSaved(path));
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                tracing::warn!("Capture {}/{} failed: {}", index, self.config.max_captures, e);
                let _ = self.events.send(RecordingEvent::CaptureFailed {
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    fn stats(&self) -> CaptureStats {
        CaptureStats {
            issued: self.issued.load(Ordering::SeqCst),
            saved: self.saved.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

struct CaptureTimer {
    cancel: Sender<()>,
    finished: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Timer-driven still capture with a capture budget
pub struct TriggeredCapturePipeline {
    shared: Arc<Shared>,
    timer: Option<CaptureTimer>,
}

impl TriggeredCapturePipeline {
    pub fn new(
        config: TriggeredPipelineConfig,
        camera: Arc<dyn StillCamera>,
        export: Arc<dyn ExportTarget>,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<RecordingEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                camera,
                export,
                clock,
                events,
                issued: AtomicU64::new(0),
                saved: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                finished: AtomicBool::new(false),
            }),
            timer: None,
        }
    }

    /// Reset counters and arm the timer
    pub fn start(&mut self) -> io::Result<()> {
        if self.timer.is_some() {
            return Ok(());
        }

        self.shared.issued.store(0, Ordering::SeqCst);
        self.shared.saved.store(0, Ordering::SeqCst);
        self.shared.failed.store(0, Ordering::SeqCst);
        self.shared.finished.store(false, Ordering::SeqCst);

        let (cancel, cancel_rx) = mpsc::channel::<()>();
        let (finished_tx, finished) = mpsc::channel::<()>();
        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("capture-timer".to_string())
            .spawn(move || run_timer(shared, cancel_rx, finished_tx))?;

        self.timer = Some(CaptureTimer {
            cancel,
            finished,
            handle,
        });

        tracing::info!(
            "Capture timer armed: {} captures every {:?}",
            self.shared.config.max_captures,
            self.shared.config.interval
        );
        Ok(())
    }

    /// Block until the budget is spent, up to `timeout`
    pub fn wait_until_finished(&self, timeout: Duration) -> bool {
        if self.shared.finished.load(Ordering::SeqCst) {
            return true;
        }
        match &self.timer {
            Some(timer) => timer.finished.recv_timeout(timeout).is_ok(),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }

    pub fn stats(&self) -> CaptureStats {
        self.shared.stats()
    }

    /// Cancel pending ticks and wait for the timer thread to exit
    ///
    /// A capture already in progress completes first; no tick runs after
    /// this returns.
    pub fn stop(&mut self) -> CaptureStats {
        if let Some(timer) = self.timer.take() {
            let _ = timer.cancel.send(());
            drop(timer.cancel);
            if timer.handle.join().is_err() {
                tracing::error!("Capture timer thread panicked");
            }
            tracing::info!("Capture timer cancelled");
        }
        self.shared.stats()
    }
}

impl Drop for TriggeredCapturePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_timer(shared: Arc<Shared>, cancel: Receiver<()>, finished: Sender<()>) {
    while shared.budget_left() {
        match cancel.recv_timeout(shared.config.interval) {
            Err(RecvTimeoutError::Timeout) => shared.tick(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }

    shared.finished.store(true, Ordering::SeqCst);
    tracing::info!(
        "Capture budget exhausted after {} captures",
        shared.issued.load(Ordering::SeqCst)
    );
    let _ = finished.send(());
}
