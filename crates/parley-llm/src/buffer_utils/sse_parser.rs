use anyhow::Result;
use futures::{Stream, StreamExt};
use std::fmt::Display;

use super::buffering::CircularLineBuffer;
use crate::traits::EventStream;
use crate::StreamEvent;

/// Strategy for turning SSE `data:` payloads into stream events
pub trait SseLineParser: Send {
    /// Parse one data payload into zero or more events
    fn parse_data_line(&mut self, data: &str) -> Result<Vec<StreamEvent>>;

    /// Check if this payload signals end of stream
    fn is_done_marker(&self, data: &str) -> bool {
        data == "[DONE]"
    }

    /// Events to emit once the stream is over
    fn finish(&mut self) -> Vec<StreamEvent> {
        Vec::new()
    }
}

/// Generic SSE reader over any byte-chunk stream
///
/// Only `data:` fields are interpreted; comments (`: keep-alive`), blank
/// lines and other fields are skipped. The first error ends the stream.
pub fn parse_sse_stream<S, B, E, P>(stream: S, mut parser: P) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
    P: SseLineParser + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(stream);
        let mut buffer = CircularLineBuffer::with_capacity(4096);
        let mut finished = false;

        'chunks: while let Some(chunk_result) = byte_chunks.next().await {
            let bytes = match chunk_result {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {}", e));
                    return;
                }
            };
            buffer.extend(bytes.as_ref());

            while let Some(line_result) = buffer.next_line() {
                let line = match line_result {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let Some(data) = data_payload(&line) else {
                    continue;
                };

                if parser.is_done_marker(data) {
                    finished = true;
                    break 'chunks;
                }

                match parser.parse_data_line(data) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        // A final frame may arrive without its trailing newline
        if !finished {
            if let Some(Ok(line)) = buffer.take_remainder() {
                if let Some(data) = data_payload(&line) {
                    if !parser.is_done_marker(data) {
                        match parser.parse_data_line(data) {
                            Ok(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }
                }
            }
        }

        for event in parser.finish() {
            yield Ok(event);
        }
    })
}

fn data_payload(line: &str) -> Option<&str> {
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    line.strip_prefix("data:").map(str::trim_start)
}
