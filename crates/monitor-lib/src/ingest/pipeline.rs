//! Telemetry ingestion loop
//!
//! Reads raw bytes from the transport, runs framing to a fixed point on every
//! chunk, decodes each frame, persists it and feeds the reading window.
//! Framing and decoding problems stay here: they are counted and logged,
//! never surfaced to prediction callers.

use super::{
    FrameExtractor, FramingMode, RecordDecoder, RecordSink, SharedWindow, DEFAULT_MAX_FRAME_BYTES,
};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::models::DEFAULT_CHANNEL;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// How frame boundaries are detected
    pub framing: FramingMode,
    /// Telemetry field pushed into the reading window
    pub channel: String,
    /// Bytes requested from the transport per read
    pub read_chunk_size: usize,
    /// Largest unterminated frame held before it is discarded
    pub max_frame_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::Flat,
            channel: DEFAULT_CHANNEL.to_string(),
            read_chunk_size: 1024,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// What one chunk produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub frames: usize,
    pub decoded: usize,
    pub rejected: usize,
    /// Decoded records that did not carry the window channel
    pub missing_channel: usize,
    pub sink_errors: usize,
}

/// Totals over a whole ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub bytes_read: u64,
    pub frames: u64,
    pub decoded: u64,
    pub rejected: u64,
    pub missing_channel: u64,
    pub sink_errors: u64,
    /// Stray bytes the framer dropped outside any frame
    pub bytes_skipped: u64,
    /// Unterminated frames discarded for exceeding `max_frame_bytes`
    pub frame_overflows: u64,
}

impl IngestStats {
    fn absorb(&mut self, outcome: IngestOutcome) {
        self.frames += outcome.frames as u64;
        self.decoded += outcome.decoded as u64;
        self.rejected += outcome.rejected as u64;
        self.missing_channel += outcome.missing_channel as u64;
        self.sink_errors += outcome.sink_errors as u64;
    }
}

/// Owns the framer and decoder for one byte stream
pub struct IngestPipeline {
    extractor: FrameExtractor,
    decoder: RecordDecoder,
    window: SharedWindow,
    sink: Arc<dyn RecordSink>,
    config: IngestConfig,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
    stats: IngestStats,
}

impl IngestPipeline {
    pub fn new(
        config: IngestConfig,
        window: SharedWindow,
        sink: Arc<dyn RecordSink>,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            extractor: FrameExtractor::with_mode(config.framing)
                .with_max_frame_bytes(config.max_frame_bytes),
            decoder: RecordDecoder::new(),
            window,
            sink,
            config,
            metrics: MonitorMetrics::new(),
            logger,
            stats: IngestStats::default(),
        }
    }

    /// Feed one chunk of raw bytes through framing, decoding, persistence
    /// and the reading window
    pub async fn ingest(&mut self, chunk: &[u8]) -> IngestOutcome {
        let frames = self.extractor.push(chunk);
        let mut outcome = IngestOutcome {
            frames: frames.len(),
            ..Default::default()
        };
        if frames.is_empty() {
            return outcome;
        }
        self.metrics.add_frames_extracted(frames.len() as u64);

        for frame in frames {
            let record = match self.decoder.decode(&frame) {
                Ok(record) => record,
                Err(e) => {
                    outcome.rejected += 1;
                    self.metrics.inc_decode_errors();
                    self.logger
                        .log_frame_rejected(&e.source.to_string(), &e.preview);
                    continue;
                }
            };
            outcome.decoded += 1;

            match self.sink.write(&record).await {
                Ok(()) => self.metrics.inc_records_persisted(),
                Err(e) => {
                    outcome.sink_errors += 1;
                    self.metrics.inc_sink_errors();
                    warn!(error = %e, "Failed to persist telemetry record");
                }
            }

            match record.field(&self.config.channel) {
                Some(value) => {
                    let len = self.window.push(value).await;
                    self.metrics.set_window_readings(len);
                }
                None => {
                    outcome.missing_channel += 1;
                    debug!(
                        channel = %self.config.channel,
                        "Record without window channel, window left unchanged"
                    );
                }
            }
        }

        self.stats.absorb(outcome);
        outcome
    }

    /// Read from `reader` until EOF, shutdown or a read error.
    ///
    /// The sink is flushed and the run is logged on every exit path; a read
    /// error is returned after that.
    pub async fn run<R>(
        mut self,
        mut reader: R,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<IngestStats>
    where
        R: AsyncRead + Unpin,
    {
        info!(
            channel = %self.config.channel,
            framing = ?self.config.framing,
            "Starting telemetry ingestion"
        );

        let mut buf = vec![0u8; self.config.read_chunk_size.max(1)];
        let mut failure = None;
        let reason = loop {
            tokio::select! {
                read = reader.read(&mut buf) => match read {
                    Ok(0) => break "end of stream",
                    Ok(n) => {
                        self.stats.bytes_read += n as u64;
                        self.ingest(&buf[..n]).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Telemetry stream read failed");
                        failure = Some(e);
                        break "read error";
                    }
                },
                _ = shutdown.recv() => {
                    break "shutdown";
                }
            }
        };

        if let Err(e) = self.sink.flush().await {
            warn!(error = %e, "Failed to flush telemetry sink");
        }
        if self.extractor.pending_len() > 0 {
            debug!(
                pending_bytes = self.extractor.pending_len(),
                "Discarding incomplete trailing frame"
            );
        }

        let framer = self.extractor.stats();
        self.stats.bytes_skipped = framer.bytes_skipped;
        self.stats.frame_overflows = framer.overflows;

        self.logger.log_ingest_finished(&self.stats, reason);

        match failure {
            Some(e) => Err(e).context("Failed to read telemetry stream"),
            None => Ok(self.stats),
        }
    }
}
