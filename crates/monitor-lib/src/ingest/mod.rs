//! Telemetry ingestion
//!
//! This module turns the raw byte stream from the motor controller into
//! telemetry records:
//! - Frame extraction from arbitrarily chunked bytes
//! - Strict record decoding with malformed-frame accounting
//! - The bounded reading window shared with the prediction service
//! - Record persistence sinks

mod decoder;
mod framer;
mod pipeline;
mod sink;
mod window;

pub use decoder::RecordDecoder;
pub use framer::{FrameExtractor, FramerStats, FramingMode, DEFAULT_MAX_FRAME_BYTES};
pub use pipeline::{IngestConfig, IngestOutcome, IngestPipeline, IngestStats};
pub use sink::{CsvSink, MemorySink, RecordSink};
pub use window::{ReadingWindow, SharedWindow, DEFAULT_WINDOW_CAPACITY};
