//! Shared output sink for Raw Records.
//!
//! Every listener of every domain writes through one `SharedSink`. The lock
//! is held only while the already-formatted record is written, so a record
//! is never torn by a concurrent writer and formatting never serializes
//! unrelated domains.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::telemetry::RawRecord;

/// Cloneable handle to the single record output stream.
#[derive(Clone)]
pub struct SharedSink {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    records: Arc<AtomicU64>,
}

impl SharedSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            records: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sink writing to process standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Writes one complete record under the exclusive lock.
    ///
    /// A poisoned lock is recovered: the guarded writer holds no partial
    /// state of ours, since every write is a single `write_all` of a whole
    /// record.
    pub fn write_record(&self, record: &RawRecord) -> io::Result<()> {
        let text = record.render();
        {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
        }
        self.records.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Total records written successfully through any clone of this sink.
    pub fn records_written(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SharedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSink")
            .field("records", &self.records_written())
            .finish_non_exhaustive()
    }
}

/// In-memory writer whose contents can be inspected while it is shared.
///
/// Used by tests and by embedders that want records in memory.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::DomainId;
    use crate::domain::telemetry::{RecordHeader, TopicKind};
    use serde_json::json;
    use std::thread;

    /// Writer that accepts at most `chunk` bytes per call, which is what
    /// exposes torn records when writes are not serialized.
    struct TrickleWriter {
        inner: CaptureBuffer,
        chunk: usize,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.inner.write(&buf[..n])?;
            thread::yield_now();
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record(domain: u32, sequence: u64) -> RawRecord {
        let fields = json!({"vs_task_status": domain, "td_description": "x".repeat(40)});
        RawRecord::new(
            RecordHeader::new(DomainId::new(domain), TopicKind::Intelligence),
            sequence,
            fields.as_object().unwrap().clone(),
        )
    }

    #[test]
    fn write_record_counts_records() {
        let buffer = CaptureBuffer::new();
        let sink = SharedSink::new(buffer.clone());

        sink.write_record(&record(1, 1)).unwrap();
        sink.write_record(&record(1, 2)).unwrap();

        assert_eq!(sink.records_written(), 2);
        assert_eq!(buffer.text().matches("TOPIC: intelligence").count(), 2);
    }

    #[test]
    fn concurrent_writers_never_interleave_records() {
        let buffer = CaptureBuffer::new();
        let sink = SharedSink::new(TrickleWriter {
            inner: buffer.clone(),
            chunk: 7,
        });

        let handles: Vec<_> = (0..8u32)
            .map(|domain| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for sequence in 1..=25 {
                        sink.write_record(&record(domain, sequence)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected: std::collections::HashSet<String> = (0..8u32)
            .flat_map(|d| (1..=25).map(move |s| record(d, s).render()))
            .collect();
        let text = buffer.text();
        let mut seen = 0;
        for chunk in text.split_inclusive("}\n") {
            assert!(expected.contains(chunk), "torn record: {:?}", chunk);
            seen += 1;
        }
        assert_eq!(seen, 200);
        assert_eq!(sink.records_written(), 200);
    }
}
