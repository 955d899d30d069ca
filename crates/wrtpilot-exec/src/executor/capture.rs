//! Concurrent stdout/stderr capture
//!
//! Each pipe gets a reader task that forwards lines over a channel. A single
//! consumer owns both the bounded accumulator and the sink, so no lock is
//! needed and lines are delivered in arrival order.

use crate::output::{OutputBuffer, OutputSink, OutputStream};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Longest single line forwarded as one event
const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Buffered line events between readers and the consumer
const CHANNEL_CAPACITY: usize = 64;

/// How long to keep draining after the process has been waited on.
/// Grandchildren that inherited the pipes can hold them open indefinitely.
const IO_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

struct Chunk {
    stream: OutputStream,
    bytes: Vec<u8>,
}

impl Chunk {
    fn text(&self) -> String {
        let mut end = self.bytes.len();
        while end > 0 && matches!(self.bytes[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        String::from_utf8_lossy(&self.bytes[..end]).into_owned()
    }
}

async fn forward_lines<R>(reader: R, stream: OutputStream, tx: mpsc::Sender<Chunk>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut bytes = Vec::new();
        match (&mut reader)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut bytes)
            .await
        {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(Chunk { stream, bytes }).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(?stream, error = %e, "Output pipe read failed");
                break;
            }
        }
    }
}

/// Drain both pipes while `wait` runs.
///
/// Returns the output of `wait` together with the accumulated combined
/// output. Every line is also handed to `sink`, regardless of whether the
/// accumulator has already hit its ceiling.
pub(crate) async fn collect_output<F, T>(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    limit: usize,
    mut sink: Option<&mut dyn OutputSink>,
    wait: F,
) -> (T, OutputBuffer)
where
    F: Future<Output = T>,
{
    let (tx, mut rx) = mpsc::channel::<Chunk>(CHANNEL_CAPACITY);
    let mut readers = Vec::with_capacity(2);
    if let Some(pipe) = stdout {
        readers.push(tokio::spawn(forward_lines(
            pipe,
            OutputStream::Stdout,
            tx.clone(),
        )));
    }
    if let Some(pipe) = stderr {
        readers.push(tokio::spawn(forward_lines(
            pipe,
            OutputStream::Stderr,
            tx.clone(),
        )));
    }
    drop(tx);

    let mut buffer = OutputBuffer::new(limit);
    let mut finished: Option<T> = None;
    let mut drain_deadline: Option<Instant> = None;
    tokio::pin!(wait);

    loop {
        tokio::select! {
            chunk = rx.recv() => match chunk {
                Some(chunk) => {
                    buffer.push(&chunk.bytes);
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.line(chunk.stream, &chunk.text());
                    }
                }
                None => break,
            },
            result = &mut wait, if finished.is_none() => {
                finished = Some(result);
                drain_deadline = Some(Instant::now() + IO_DRAIN_TIMEOUT);
            }
            _ = drain_timer(drain_deadline), if drain_deadline.is_some() => {
                warn!("Output pipes still open after process exit, giving up on drain");
                break;
            }
        }
    }

    for reader in readers {
        reader.abort();
    }

    let result = match finished {
        Some(result) => result,
        None => wait.await,
    };
    (result, buffer)
}

async fn drain_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
