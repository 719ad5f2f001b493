use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::chunk::{StreamChunk, parse_payload};

const EVENT_MARKER: &str = "data: ";

pub type ByteStreamError = Box<dyn std::error::Error + Send + Sync + 'static>;
type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ByteStreamError>> + Send>>;

enum ChunkSource {
    /// Raw bytes from an open HTTP response (or a test fixture stream).
    Live(ByteStream),
    /// Pre-decoded chunks, used by mock backends in tests.
    Canned(VecDeque<StreamChunk>),
}

/// Lazy, single-pass, finite sequence of reply chunks.
///
/// The raw byte stream is buffered and split on line boundaries; only lines
/// prefixed with `data: ` carry payload, each parsed independently. The
/// sequence always terminates: a `done`/`error` payload, a malformed
/// payload, a transport fault, an idle timeout, and a clean end-of-stream
/// without a terminal chunk all end it (the non-server cases as a synthetic
/// `error` chunk). After the terminal chunk the stream is fused and only
/// yields `None`. Dropping the stream releases the underlying connection.
pub struct ReplyStream {
    source: ChunkSource,
    buffer: Vec<u8>,
    terminated: bool,
    idle_timeout: Option<Duration>,
}

impl ReplyStream {
    pub fn from_byte_stream(
        stream: impl Stream<Item = Result<Bytes, ByteStreamError>> + Send + 'static,
    ) -> Self {
        Self {
            source: ChunkSource::Live(Box::pin(stream)),
            buffer: Vec::new(),
            terminated: false,
            idle_timeout: None,
        }
    }

    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        Self::from_byte_stream(
            response
                .bytes_stream()
                .map(|item| item.map_err(|error| Box::new(error) as ByteStreamError)),
        )
    }

    /// Builds a stream that yields `chunks` as-is. A canned sequence without
    /// a terminal chunk still ends with the synthetic truncation error, the
    /// same as a live stream that closes early.
    pub fn from_chunks(chunks: Vec<StreamChunk>) -> Self {
        Self {
            source: ChunkSource::Canned(chunks.into()),
            buffer: Vec::new(),
            terminated: false,
            idle_timeout: None,
        }
    }

    /// Bounds the wait for each chunk; expiry terminates the stream with a
    /// synthetic error chunk.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Yields the next chunk, or `None` once a terminal chunk was returned.
    pub async fn next_chunk(&mut self) -> Option<StreamChunk> {
        if self.terminated {
            return None;
        }

        let chunk = if let ChunkSource::Canned(queue) = &mut self.source {
            queue
                .pop_front()
                .unwrap_or_else(|| StreamChunk::synthetic_error(TRUNCATED_STREAM_NOTICE))
        } else {
            self.next_live_chunk().await
        };

        if chunk.is_terminal() {
            self.terminated = true;
        }
        Some(chunk)
    }

    async fn next_live_chunk(&mut self) -> StreamChunk {
        loop {
            // Drain complete buffered lines before touching the wire again.
            while let Some(line) = take_line(&mut self.buffer) {
                if let Some(chunk) = decode_line(&line) {
                    return chunk;
                }
            }

            let ChunkSource::Live(stream) = &mut self.source else {
                return StreamChunk::synthetic_error(TRUNCATED_STREAM_NOTICE);
            };

            let item = match self.idle_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, stream.next()).await {
                    Ok(item) => item,
                    Err(_) => {
                        return StreamChunk::synthetic_error(format!(
                            "reply stream stalled for more than {}s",
                            timeout.as_secs()
                        ));
                    }
                },
                None => stream.next().await,
            };

            match item {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(error)) => {
                    return StreamChunk::synthetic_error(format!(
                        "reply stream transport failure: {error}"
                    ));
                }
                None => {
                    // Flush a trailing line that arrived without its newline.
                    let leftover = String::from_utf8_lossy(&self.buffer).to_string();
                    self.buffer.clear();
                    if let Some(chunk) = decode_line(leftover.trim_end_matches('\r')) {
                        return chunk;
                    }
                    return StreamChunk::synthetic_error(TRUNCATED_STREAM_NOTICE);
                }
            }
        }
    }
}

const TRUNCATED_STREAM_NOTICE: &str = "reply stream ended before completion";

fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    let newline = buffer.iter().position(|&byte| byte == b'\n')?;
    let raw: Vec<u8> = buffer.drain(..=newline).collect();
    let line = String::from_utf8_lossy(&raw[..newline]);
    Some(line.trim_end_matches('\r').to_string())
}

/// Decodes one line of the event protocol. Lines without the `data: `
/// marker carry no payload; malformed payloads become a terminal synthetic
/// error chunk.
fn decode_line(line: &str) -> Option<StreamChunk> {
    let payload = line.strip_prefix(EVENT_MARKER)?.trim();
    if payload.is_empty() {
        return None;
    }

    match parse_payload(payload) {
        Ok(chunk) => Some(chunk),
        Err(error) => {
            tracing::warn!(error = %error, "malformed stream payload");
            Some(StreamChunk::synthetic_error(format!(
                "malformed stream payload: {error}"
            )))
        }
    }
}
