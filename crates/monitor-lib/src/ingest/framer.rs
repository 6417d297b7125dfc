//! Frame extraction from a continuous byte stream
//!
//! The transport hands over bytes in chunks that have nothing to do with
//! record boundaries. The extractor accumulates them and cuts out every
//! `{...}` span that is complete, discarding consumed bytes.

use serde::Deserialize;
use tracing::warn;

const OPEN: u8 = b'{';
const CLOSE: u8 = b'}';

/// Largest unterminated frame kept while waiting for its closing delimiter
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// How a frame's closing delimiter is located
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// The first `}` after the first `{` closes the frame. Records from the
    /// controller are flat objects, so nesting is never tracked.
    #[default]
    Flat,
    /// Depth-counting scanner: closes only when depth returns to zero and
    /// ignores braces inside string literals.
    Nested,
}

/// Counters kept by the extractor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    pub frames_emitted: u64,
    /// Stray bytes dropped ahead of an opening delimiter
    pub bytes_skipped: u64,
    /// Unterminated frames discarded for exceeding the size limit
    pub overflows: u64,
}

/// Turns an append-only byte buffer into candidate frames
#[derive(Debug)]
pub struct FrameExtractor {
    buffer: Vec<u8>,
    mode: FramingMode,
    max_frame_bytes: usize,
    stats: FramerStats,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::with_mode(FramingMode::default())
    }
}

impl FrameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: FramingMode) -> Self {
        Self {
            buffer: Vec::new(),
            mode,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            stats: FramerStats::default(),
        }
    }

    /// Cap the bytes held for a frame that has not closed yet
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes.max(1);
        self
    }

    /// Append a chunk and return every frame that is now complete.
    ///
    /// Runs to a fixed point: a single chunk may complete several frames.
    /// An empty result means the buffer is waiting for more bytes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;

        while let Some((start, end)) = self.next_span(&self.buffer[consumed..]) {
            frames.push(self.buffer[consumed + start..consumed + end].to_vec());
            self.stats.bytes_skipped += start as u64;
            consumed += end;
        }

        // Nothing before the next opening delimiter can be part of a frame
        let stray = self.buffer[consumed..]
            .iter()
            .position(|&b| b == OPEN)
            .unwrap_or(self.buffer.len() - consumed);
        self.stats.bytes_skipped += stray as u64;
        consumed += stray;

        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
        self.stats.frames_emitted += frames.len() as u64;

        if self.buffer.len() > self.max_frame_bytes {
            warn!(
                pending_bytes = self.buffer.len(),
                max_frame_bytes = self.max_frame_bytes,
                "Unterminated frame exceeded size limit, discarding"
            );
            self.buffer.clear();
            self.stats.overflows += 1;
        }

        frames
    }

    /// Bytes still waiting for a closing delimiter
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    fn next_span(&self, buf: &[u8]) -> Option<(usize, usize)> {
        match self.mode {
            FramingMode::Flat => flat_span(buf),
            FramingMode::Nested => nested_span(buf),
        }
    }
}

/// Span `[start, end)` of the first `{` through the first `}` after it
fn flat_span(buf: &[u8]) -> Option<(usize, usize)> {
    let start = buf.iter().position(|&b| b == OPEN)?;
    let close = buf[start..].iter().position(|&b| b == CLOSE)?;
    Some((start, start + close + 1))
}

/// Span of the first balanced object starting at the first `{`
fn nested_span(buf: &[u8]) -> Option<(usize, usize)> {
    let start = buf.iter().position(|&b| b == OPEN)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in buf[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            OPEN => depth += 1,
            CLOSE => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }

    None
}
