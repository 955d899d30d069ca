//! Output capture: bounded accumulation and live line sinks

use serde::Serialize;
use std::io::Write;
use tokio::sync::mpsc;

/// Per-command capture ceiling (512 KiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 512 * 1024;

/// Appended to captured output that hit the ceiling
pub const TRUNCATION_MARKER: &str = "\n... [output truncated] ...";

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// One line of live output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    /// Source pipe
    pub stream: OutputStream,
    /// Line text without the trailing newline
    pub text: String,
}

/// Receiver of live output while a command runs.
///
/// Ordering is guaranteed within one stream only; stdout and stderr lines may
/// interleave arbitrarily.
pub trait OutputSink: Send {
    /// Called once per line, in arrival order
    fn line(&mut self, stream: OutputStream, text: &str);
}

impl OutputSink for Vec<OutputLine> {
    fn line(&mut self, stream: OutputStream, text: &str) {
        self.push(OutputLine {
            stream,
            text: text.to_string(),
        });
    }
}

impl OutputSink for mpsc::UnboundedSender<OutputLine> {
    fn line(&mut self, stream: OutputStream, text: &str) {
        // A dropped receiver only means nobody is watching anymore
        let _ = self.send(OutputLine {
            stream,
            text: text.to_string(),
        });
    }
}

/// Sink writing lines to an `io::Write`, stderr lines prefixed with `stderr: `
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn line(&mut self, stream: OutputStream, text: &str) {
        let written = match stream {
            OutputStream::Stdout => writeln!(self.writer, "{}", text),
            OutputStream::Stderr => writeln!(self.writer, "stderr: {}", text),
        };
        if written.is_ok() {
            let _ = self.writer.flush();
        }
    }
}

/// Combined-output accumulator with a hard byte ceiling.
///
/// Bytes past the ceiling are discarded; the marker is only added when the
/// buffer is finalised.
#[derive(Debug)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    /// Create a buffer holding at most `limit` bytes
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(limit.min(8 * 1024)),
            limit,
            truncated: false,
        }
    }

    /// Append raw bytes, dropping whatever exceeds the ceiling
    pub fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        let take = chunk.len().min(room);
        self.bytes.extend_from_slice(&chunk[..take]);
    }

    /// Whether anything was dropped so far
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Bytes captured so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Convert to text, appending [`TRUNCATION_MARKER`] if the ceiling was hit
    #[must_use]
    pub fn finish(self) -> (String, bool) {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            // Lossy decoding of a cut multi-byte sequence can grow the text
            if text.len() > self.limit {
                let mut end = self.limit;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
            }
            text.push_str(TRUNCATION_MARKER);
        }
        (text, self.truncated)
    }
}
