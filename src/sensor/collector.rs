//! Sensor sample collector
//!
//! Turns raw sensor events into timestamped CSV records and feeds them into
//! the session's [`SampleBuffer`]. The buffer and the CSV file handle sit
//! behind a single lock, so appending a sample and closing the log can never
//! interleave: once [`SensorCollector::close`] returns, late events are
//! discarded.

use super::buffer::SampleBuffer;
use super::source::SensorEventSink;
use super::types::{RawSensorEvent, SensorSample, CSV_COLUMNS};
use crate::utils::clock::Clock;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Open CSV log for the active session
struct SampleLog {
    path: PathBuf,
    buffer: SampleBuffer<File>,
    samples: u64,
}

/// Summary of a closed CSV log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedLog {
    /// CSV file that was written
    pub path: PathBuf,
    /// Samples appended during the session
    pub samples: u64,
}

/// Receives raw sensor events and appends them to the session CSV
pub struct SensorCollector {
    clock: Arc<dyn Clock>,
    flush_threshold: usize,
    log: Mutex<Option<SampleLog>>,
    /// Events that arrived with no open log
    discarded: AtomicU64,
    /// Events with an unrecognized sensor type
    unrecognized: AtomicU64,
}

impl SensorCollector {
    pub fn new(clock: Arc<dyn Clock>, flush_threshold: usize) -> Self {
        Self {
            clock,
            flush_threshold,
            log: Mutex::new(None),
            discarded: AtomicU64::new(0),
            unrecognized: AtomicU64::new(0),
        }
    }

    /// Open `path` in append mode and write the header
    ///
    /// A log that is still open is flushed and closed first.
    pub fn open(&self, path: &Path) -> io::Result<()> {
        let mut guard = self.log.lock();
        if let Some(previous) = guard.take() {
            tracing::warn!("Replacing open sensor log {:?}", previous.path);
            if let Err(e) = previous.buffer.finish() {
                tracing::warn!("Failed to flush previous sensor log: {}", e);
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        {
            let mut header = csv::Writer::from_writer(&mut file);
            header.write_record(CSV_COLUMNS)?;
            header.flush()?;
        }

        *guard = Some(SampleLog {
            path: path.to_path_buf(),
            buffer: SampleBuffer::new(file, self.flush_threshold),
            samples: 0,
        });

        tracing::info!("Sensor log opened: {:?}", path);
        Ok(())
    }

    /// Record one raw event
    ///
    /// Returns the stamped sample if it was appended. Events are dropped when
    /// no log is open or the sensor type is unknown.
    pub fn record(&self, event: &RawSensorEvent) -> Option<SensorSample> {
        let mut guard = self.log.lock();
        let Some(log) = guard.as_mut() else {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let Some(sample) = SensorSample::from_event(event, self.clock.now_ms()) else {
            self.unrecognized.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        log.samples += 1;
        if let Err(e) = log.buffer.append(sample.record()) {
            tracing::warn!("Failed to flush sensor samples to {:?}: {}", log.path, e);
        }
        Some(sample)
    }

    /// Flush pending samples and close the log
    ///
    /// Returns `Ok(None)` if no log was open.
    pub fn close(&self) -> io::Result<Option<ClosedLog>> {
        let Some(log) = self.log.lock().take() else {
            return Ok(None);
        };

        let pending = log.buffer.len();
        let file = log.buffer.finish()?;
        file.sync_all()?;
        drop(file);

        tracing::info!(
            "Sensor log closed: {:?} ({} samples, {} bytes flushed on close)",
            log.path,
            log.samples,
            pending
        );

        Ok(Some(ClosedLog {
            path: log.path,
            samples: log.samples,
        }))
    }

    /// Whether a session log is open
    pub fn is_open(&self) -> bool {
        self.log.lock().is_some()
    }

    /// Bytes buffered but not yet written
    pub fn pending_len(&self) -> usize {
        self.log.lock().as_ref().map(|l| l.buffer.len()).unwrap_or(0)
    }

    /// Events discarded because no session was active
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Events dropped for an unrecognized sensor type
    pub fn unrecognized(&self) -> u64 {
        self.unrecognized.load(Ordering::Relaxed)
    }
}

impl SensorEventSink for SensorCollector {
    fn on_sensor_event(&self, event: RawSensorEvent) {
        self.record(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::types::{type_codes, SensorKind, CSV_HEADER};
    use crate::test_support::StepClock;
    use std::thread;
    use tempfile::tempdir;

    fn collector(threshold: usize) -> SensorCollector {
        SensorCollector::new(Arc::new(StepClock::new(1_000)), threshold)
    }

    fn read_records(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_events_without_session_are_discarded() {
        let collector = collector(500);
        assert!(collector
            .record(&RawSensorEvent::of(SensorKind::Accelerometer, [1.0, 2.0, 3.0]))
            .is_none());
        assert_eq!(collector.discarded(), 1);
        assert!(collector.close().unwrap().is_none());
    }

    #[test]
    fn test_records_in_arrival_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sensor_data.csv");
        let collector = collector(64);
        collector.open(&path).unwrap();

        let events = [
            RawSensorEvent::of(SensorKind::Accelerometer, [0.1, 0.2, 9.8]),
            RawSensorEvent::of(SensorKind::Gyroscope, [0.01, -0.02, 0.03]),
            RawSensorEvent::of(SensorKind::Magnetometer, [22.5, -4.0, 40.25]),
            RawSensorEvent::of(SensorKind::Accelerometer, [0.3, 0.1, 9.7]),
            RawSensorEvent::of(SensorKind::Gyroscope, [1.0, 1.0, 1.0]),
        ];
        for event in &events {
            collector.on_sensor_event(*event);
        }

        let closed = collector.close().unwrap().unwrap();
        assert_eq!(closed.samples, 5);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Timestamp,Sensor,X,Y,Z\n"));

        let records = read_records(&path);
        assert_eq!(records.len(), events.len());
        for (i, (record, event)) in records.iter().zip(events.iter()).enumerate() {
            let kind = SensorKind::from_type_code(event.sensor_type).unwrap();
            assert_eq!(record[0], (1_000 + i as i64).to_string());
            assert_eq!(record[1], kind.as_str());
            assert_eq!(record[2].parse::<f32>().unwrap(), event.values[0]);
            assert_eq!(record[3].parse::<f32>().unwrap(), event.values[1]);
            assert_eq!(record[4].parse::<f32>().unwrap(), event.values[2]);
        }
    }

    #[test]
    fn test_close_flushes_unwritten_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sensor_data.csv");
        let collector = collector(10_000);
        collector.open(&path).unwrap();

        collector.record(&RawSensorEvent::of(SensorKind::Gyroscope, [1.0, 2.0, 3.0]));
        assert!(collector.pending_len() > 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), CSV_HEADER);

        collector.close().unwrap();
        assert_eq!(read_records(&path).len(), 1);

        // Late events after close are discarded, file untouched
        collector.record(&RawSensorEvent::of(SensorKind::Gyroscope, [4.0, 5.0, 6.0]));
        assert_eq!(read_records(&path).len(), 1);
    }

    #[test]
    fn test_unrecognized_sensor_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sensor_data.csv");
        let collector = collector(500);
        collector.open(&path).unwrap();

        assert!(collector
            .record(&RawSensorEvent::new(type_codes::GYROSCOPE + 100, [1.0, 1.0, 1.0]))
            .is_none());
        assert_eq!(collector.unrecognized(), 1);
        assert_eq!(collector.close().unwrap().unwrap().samples, 0);
    }

    #[test]
    fn test_append_mode_keeps_previous_sessions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sensor_data.csv");
        let collector = collector(500);

        for _ in 0..2 {
            collector.open(&path).unwrap();
            collector.record(&RawSensorEvent::of(SensorKind::Accelerometer, [1.0, 1.0, 1.0]));
            collector.close().unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(CSV_HEADER).count(), 2);
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_reopen_flushes_previous_tail_before_new_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sensor_data.csv");
        let collector = collector(10_000);

        collector.open(&path).unwrap();
        collector.record(&RawSensorEvent::of(SensorKind::Gyroscope, [1.0, 1.0, 1.0]));
        collector.open(&path).unwrap();
        collector.record(&RawSensorEvent::of(SensorKind::Gyroscope, [2.0, 2.0, 2.0]));
        collector.close().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Timestamp,Sensor,X,Y,Z",
                "1000,Gyroscope,1,1,1",
                "Timestamp,Sensor,X,Y,Z",
                "1001,Gyroscope,2,2,2",
            ]
        );
    }

    #[test]
    fn test_concurrent_appends_and_close_lose_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sensor_data.csv");
        let collector = Arc::new(collector(100));
        collector.open(&path).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let collector = collector.clone();
                thread::spawn(move || {
                    let mut appended = 0u64;
                    for i in 0..500 {
                        let event =
                            RawSensorEvent::of(SensorKind::Accelerometer, [i as f32, 0.0, 0.0]);
                        if collector.record(&event).is_some() {
                            appended += 1;
                        }
                    }
                    appended
                })
            })
            .collect();

        thread::sleep(std::time::Duration::from_millis(1));
        let closed = collector.close().unwrap().unwrap();
        let appended: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(closed.samples, appended);
        assert_eq!(read_records(&path).len() as u64, appended);
    }
}
