//! Length-prefixed framing for stream transports (panic-free).
//!
//! Wire layout: `u16` big-endian payload length, then the payload.
//!
//! Parsing rules:
//! - Never index (`buf[0]`); always use `Buf` and `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{GateError, Result};

/// Header size in bytes.
pub const FRAME_HEADER_LEN: usize = 2;

/// Largest payload a 2-byte header can announce.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Prefix `payload` with its length.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(GateError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Incremental decoder over a read buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    max_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(MAX_FRAME_LEN)
    }
}

impl FrameDecoder {
    /// `max_len` is clamped to what the header can express.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.min(MAX_FRAME_LEN),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Pull one complete frame out of `buf`.
    ///
    /// Returns `Ok(None)` while the frame is still incomplete; partial bytes
    /// stay buffered. An oversized header is unrecoverable for the stream.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Bytes>> {
        if buf.remaining() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let mut header: &[u8] = buf.as_ref();
        let len = header.get_u16() as usize;
        if len > self.max_len {
            return Err(GateError::FrameTooLarge {
                len,
                max: self.max_len,
            });
        }

        if buf.remaining() < FRAME_HEADER_LEN + len {
            buf.reserve(FRAME_HEADER_LEN + len - buf.remaining());
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_LEN);
        Ok(Some(buf.split_to(len).freeze()))
    }
}
