//! Newline-delimited JSON framing
//!
//! Every message in either direction is one JSON document followed by `\n`.
//! A trailing `\r` is tolerated on input.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Initial read buffer capacity
const READ_CHUNK: usize = 4096;

/// Error type for line framing
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),
}

/// Serialize `item` as one line, newline included
pub fn encode_line<T: Serialize>(item: &T) -> Result<Bytes, serde_json::Error> {
    let mut line = serde_json::to_vec(item)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

fn strip_cr(line: &mut BytesMut) {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
}

/// Splits an async byte stream into lines
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
    /// Prefix of `buf` already searched for a newline
    scanned: usize,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Create a reader rejecting lines longer than `max_len` bytes
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
            scanned: 0,
            max_len,
        }
    }

    /// Next line without its terminator, or `None` at end of stream
    ///
    /// A final line without a newline is returned as-is. Cancel safe: bytes
    /// already read stay buffered for the next call.
    pub async fn next_line(&mut self) -> Result<Option<Bytes>, CodecError> {
        loop {
            if let Some(pos) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
                let end = self.scanned + pos;
                self.scanned = 0;

                let mut line = self.buf.split_to(end + 1);
                line.truncate(end);
                strip_cr(&mut line);

                if line.len() > self.max_len {
                    return Err(CodecError::LineTooLong(self.max_len));
                }
                return Ok(Some(line.freeze()));
            }

            self.scanned = self.buf.len();
            if self.buf.len() > self.max_len {
                return Err(CodecError::LineTooLong(self.max_len));
            }

            self.buf.reserve(READ_CHUNK);
            if self.inner.read_buf(&mut self.buf).await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }

                self.scanned = 0;
                let mut line = self.buf.split();
                strip_cr(&mut line);
                return Ok(Some(line.freeze()));
            }
        }
    }
}

/// Writes one serialized item per line, each bounded by a timeout
#[derive(Debug)]
pub struct LineWriter<W> {
    inner: W,
    timeout: Duration,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    /// Create a writer bounding each line by `timeout`
    pub fn new(inner: W, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Serialize `item` as one line and flush it
    pub async fn write_item<T: Serialize>(&mut self, item: &T) -> Result<(), CodecError> {
        let line = encode_line(item)?;

        let write = async {
            self.inner.write_all(&line).await?;
            self.inner.flush().await
        };

        match tokio::time::timeout(self.timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CodecError::WriteTimeout(self.timeout)),
        }
    }

    /// Flush and close the write side
    pub async fn shutdown(&mut self) -> Result<(), CodecError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
