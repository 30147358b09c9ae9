//! Line-oriented view of a streamed HTTP body

use crate::error::{Error, Result};
use bytes::{Buf, Bytes, BytesMut};
use futures::stream::Stream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Streaming completion body, yielded one text line at a time.
///
/// Lines are split on `\n` with a trailing `\r` removed. Blank lines are
/// yielded as empty strings so the server's framing (SSE event separators
/// included) reaches the caller untouched. Dropping the stream closes the
/// underlying connection.
pub struct LineStream {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: BytesMut,
    done: bool,
}

impl LineStream {
    /// Wrap a byte stream, usually `reqwest::Response::bytes_stream()`
    pub fn new(stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
            buffer: BytesMut::new(),
            done: false,
        }
    }

    /// Create a stream over a response body
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    fn take_line(&mut self) -> Option<Result<String>> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line = self.buffer.split_to(end);
        self.buffer.advance(1);
        Some(decode_line(&mut line))
    }

    fn take_rest(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = self.buffer.split();
        Some(decode_line(&mut line))
    }
}

fn decode_line(line: &mut BytesMut) -> Result<String> {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    String::from_utf8(line.to_vec())
        .map_err(|e| Error::stream(format!("line is not valid UTF-8: {}", e)))
}

impl Stream for LineStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line) = self.take_line() {
                return Poll::Ready(Some(line));
            }

            if self.done {
                return Poll::Ready(self.take_rest());
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => self.buffer.extend_from_slice(&chunk),
                Poll::Ready(Some(Err(e))) => {
                    // The connection is unusable after a transport error.
                    self.done = true;
                    self.buffer.clear();
                    return Poll::Ready(Some(Err(Error::Http(e))));
                }
                Poll::Ready(None) => self.done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl fmt::Debug for LineStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineStream")
            .field("buffered", &self.buffer.len())
            .field("done", &self.done)
            .finish()
    }
}
