//! Bridge from an upstream byte stream to the hub.
//!
//! # Event Flow
//!
//! ```text
//! upstream bytes (child stdout/stderr, stdin)
//!          │
//!          ▼
//! ┌────────────────────┐
//! │   StreamParser     │  one per stream
//! └────────────────────┘
//!          │ SampleEvent
//!          ▼
//! ┌────────────────────┐
//! │    EventSink       │  BroadcastHub
//! └────────────────────┘
//! ```
//!
//! Each chunk is parsed and its events delivered before the next read, so
//! events of one stream reach the sink in stream order.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::watch;

use crate::adapters::stream::{ParserStats, StreamParser, DEFAULT_MAX_BUFFER_BYTES};
use crate::ports::EventSink;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upstream {0} was not captured")]
    MissingPipe(&'static str),

    #[error("upstream read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read settings for upstream streams.
#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    pub read_chunk_bytes: usize,
    pub max_buffer_bytes: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            read_chunk_bytes: 8192,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}

/// What one stream produced before it ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub source: String,
    pub bytes: u64,
    pub parser: ParserStats,
}

/// Feeds upstream streams through a parser into an [`EventSink`].
pub struct StreamIngestor {
    sink: Arc<dyn EventSink>,
    settings: IngestSettings,
}

impl StreamIngestor {
    pub fn new(sink: Arc<dyn EventSink>, settings: IngestSettings) -> Self {
        Self { sink, settings }
    }

    /// Reads `reader` to its end. The sink sees the stream attach and detach.
    pub async fn ingest<R>(&self, source: &str, mut reader: R) -> Result<IngestSummary, IngestError>
    where
        R: AsyncRead + Unpin,
    {
        let mut parser = StreamParser::new(source).with_max_buffer(self.settings.max_buffer_bytes);
        let mut chunk = vec![0u8; self.settings.read_chunk_bytes.max(1)];
        let mut bytes = 0u64;

        self.sink.stream_attached(true).await;
        tracing::info!(source = %source, sink = self.sink.name(), "upstream stream attached");

        let result = loop {
            let n = match reader.read(&mut chunk).await {
                Ok(0) => break Ok(()),
                Ok(n) => n,
                Err(e) => break Err(e),
            };
            bytes += n as u64;
            for event in parser.feed(&chunk[..n]) {
                self.sink.deliver(event).await;
            }
        };

        self.sink.stream_attached(false).await;
        let summary = IngestSummary {
            source: source.to_string(),
            bytes,
            parser: parser.stats(),
        };
        tracing::info!(
            source = %source,
            bytes,
            events = summary.parser.events,
            malformed = summary.parser.malformed_blocks,
            "upstream stream ended"
        );

        result?;
        Ok(summary)
    }

    /// Ingests this process's standard input until it ends or `shutdown` fires.
    pub async fn run_stdin(&self, mut shutdown: watch::Receiver<bool>) -> Result<Option<IngestSummary>, IngestError> {
        tokio::select! {
            summary = self.ingest("stdin", tokio::io::stdin()) => summary.map(Some),
            _ = wait_for_stop(&mut shutdown) => Ok(None),
        }
    }

    /// Spawns `program` and ingests both its stdout and stderr.
    ///
    /// On shutdown the child is killed and the remaining output drained.
    pub async fn run_command(
        &self,
        program: &str,
        args: &[String],
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<IngestSummary>, IngestError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| IngestError::Spawn {
                program: program.to_string(),
                source,
            })?;
        tracing::info!(program = %program, pid = child.id(), "upstream process started");

        let stdout = child.stdout.take().ok_or(IngestError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(IngestError::MissingPipe("stderr"))?;
        let out_name = format!("{}:stdout", program);
        let err_name = format!("{}:stderr", program);

        let streams = async {
            tokio::join!(self.ingest(&out_name, stdout), self.ingest(&err_name, stderr))
        };
        tokio::pin!(streams);

        let mut stopping = false;
        let (out, err) = loop {
            tokio::select! {
                results = &mut streams => break results,
                _ = wait_for_stop(&mut shutdown), if !stopping => {
                    stopping = true;
                    tracing::info!(program = %program, "stopping upstream process");
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(program = %program, error = %e, "failed to signal upstream process");
                    }
                }
            }
        };

        match child.wait().await {
            Ok(status) => tracing::info!(program = %program, status = %status, "upstream process exited"),
            Err(e) => tracing::warn!(program = %program, error = %e, "failed to reap upstream process"),
        }

        Ok(vec![out?, err?])
    }
}

/// Resolves once the flag is raised or the sender is gone.
async fn wait_for_stop(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::{BroadcastHub, ServerMessage};

    const STREAM: &str = "Monitor: Subscriber created for domain 2\n[domain=2] TOPIC: aircraft coredata2\nSample '1' RECEIVED\n - {latitude: 39.9, longitude: 32.8, altitude: 1500.0}\n[domain=2] TOPIC: intelligence\nSample '1' RECEIVED\n - {vs_task_status: 1}\n";

    /// Reader returning the stream a few bytes at a time.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            let end = (self.pos + 5).min(self.data.len());
            let piece = self.data[self.pos..end].to_vec();
            buf.put_slice(&piece);
            self.pos = end;
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn ingested_events_reach_viewers_in_order() {
        let hub = Arc::new(BroadcastHub::default());
        let (_id, mut rx) = hub.join().await;
        rx.recv().await;
        let ingestor = StreamIngestor::new(hub.clone(), IngestSettings::default());

        let reader = Trickle {
            data: STREAM.as_bytes().to_vec(),
            pos: 0,
        };
        let summary = ingestor.ingest("test", reader).await.unwrap();

        assert_eq!(summary.parser.events, 2);
        assert_eq!(summary.bytes, STREAM.len() as u64);
        assert!(matches!(rx.recv().await, Some(ServerMessage::AircraftData(_))));
        assert!(matches!(rx.recv().await, Some(ServerMessage::Intelligence(_))));
        assert_eq!(hub.snapshot().await.active_streams, 0);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let ingestor = StreamIngestor::new(Arc::new(BroadcastHub::default()), IngestSettings::default());
        let (_tx, rx) = watch::channel(false);

        let result = ingestor
            .run_command("definitely-not-a-real-program-7c1f", &[], rx)
            .await;

        assert!(matches!(result, Err(IngestError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_output_is_parsed_from_both_pipes() {
        let hub = Arc::new(BroadcastHub::default());
        let ingestor = StreamIngestor::new(hub.clone(), IngestSettings::default());
        let (_tx, rx) = watch::channel(false);
        let script = "printf '[domain=1] TOPIC: messaging\\n - {message_type: 2}\\n'; printf '[domain=3] TOPIC: intelligence\\n - {vs_task_status: 1}\\n' 1>&2";

        let summaries = ingestor
            .run_command("sh", &["-c".to_string(), script.to_string()], rx)
            .await
            .unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries.iter().map(|s| s.parser.events).sum::<u64>(), 2);
        assert_eq!(hub.snapshot().await.sources_seen, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shutdown_kills_long_running_command() {
        let ingestor = StreamIngestor::new(Arc::new(BroadcastHub::default()), IngestSettings::default());
        let (tx, rx) = watch::channel(false);

        let args = ["30".to_string()];
        let run = ingestor.run_command("sleep", &args, rx);
        let stop = async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            tx.send(true).unwrap();
        };
        let (result, ()) = tokio::time::timeout(std::time::Duration::from_secs(5), async { tokio::join!(run, stop) })
            .await
            .unwrap();

        assert_eq!(result.unwrap().len(), 2);
    }
}
