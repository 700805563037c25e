//! Append-only sample record buffer
//!
//! Accumulates CSV records in memory and writes them through to the
//! underlying writer once the accumulated length exceeds a threshold. Content
//! order always equals append order.

use std::io::{self, Write};

/// Flush threshold in bytes of buffered text
pub const DEFAULT_FLUSH_THRESHOLD: usize = 500;

/// In-memory CSV writer; records are delimited by `\n`
fn accumulator(threshold: usize) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::with_capacity(threshold + 128))
}

/// Flush-on-threshold CSV accumulator in front of a writer
#[derive(Debug)]
pub struct SampleBuffer<W: Write> {
    pending: csv::Writer<Vec<u8>>,
    threshold: usize,
    writer: W,
    records: u64,
    bytes_written: u64,
}

impl<W: Write> SampleBuffer<W> {
    /// Create a buffer that flushes into `writer` once more than `threshold`
    /// bytes are pending
    pub fn new(writer: W, threshold: usize) -> Self {
        Self {
            pending: accumulator(threshold),
            threshold,
            writer,
            records: 0,
            bytes_written: 0,
        }
    }

    /// Append one record
    ///
    /// Returns `Ok(true)` when the append pushed the buffer over the threshold
    /// and its contents were written out.
    pub fn append<I, T>(&mut self, record: I) -> io::Result<bool>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.pending.write_record(record)?;
        self.pending.flush()?;
        self.records += 1;

        if self.len() > self.threshold {
            self.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Write all pending records to the writer and clear the buffer
    ///
    /// Pending records are cleared even if the write fails; a failed flush is
    /// not retried.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let pending = std::mem::replace(&mut self.pending, accumulator(self.threshold));
        let text = pending.into_inner().map_err(|e| e.into_error())?;
        let result = self
            .writer
            .write_all(&text)
            .and_then(|_| self.writer.flush());
        if result.is_ok() {
            self.bytes_written += text.len() as u64;
        }
        result
    }

    /// Flush pending records and hand back the writer
    pub fn finish(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.writer)
    }

    /// Pending (unflushed) length in bytes
    pub fn len(&self) -> usize {
        self.pending.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.get_ref().is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Records appended since creation
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Bytes successfully written through to the writer
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}
