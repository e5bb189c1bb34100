//! Little-endian wire helpers
//!
//! Every codec in the Logix5000 stack uses the same byte order: CIP data is
//! little-endian throughout, so all encoders go through `bytes::BufMut`
//! `_le` methods and all decoders go through [`WireCursor`]. The cursor is
//! seekable because structure decode addresses members by absolute byte
//! offset inside the structure window, not by sequential reads.

use crate::error::{LogixError, LogixResult};

/// A bounds-checked read cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct WireCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// Move the cursor to an absolute position within the slice.
    pub fn seek(&mut self, pos: usize) -> LogixResult<()> {
        if pos > self.buf.len() {
            return Err(LogixError::Truncated {
                needed: pos,
                remaining: self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Skip `count` bytes without reading them.
    pub fn advance(&mut self, count: usize) -> LogixResult<()> {
        self.check(count)?;
        self.pos += count;
        Ok(())
    }

    /// A new cursor over the unread remainder, with its own position.
    ///
    /// Structure decode works inside such a window so member offsets are
    /// absolute within the structure while the outer cursor is advanced by
    /// the declared structure size in one step.
    pub fn window(&self) -> WireCursor<'a> {
        WireCursor::new(&self.buf[self.pos..])
    }

    fn check(&self, needed: usize) -> LogixResult<()> {
        if self.remaining() < needed {
            return Err(LogixError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn take(&mut self, count: usize) -> LogixResult<&'a [u8]> {
        self.check(count)?;
        let bytes = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn get_u8(&mut self) -> LogixResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_i8(&mut self) -> LogixResult<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn get_u16(&mut self) -> LogixResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn get_i16(&mut self) -> LogixResult<i16> {
        let b = self.take(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn get_u32(&mut self) -> LogixResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_i32(&mut self) -> LogixResult<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_i64(&mut self) -> LogixResult<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn get_f32(&mut self) -> LogixResult<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a NUL-terminated Latin-1 string, consuming the terminator.
    ///
    /// Template definitions carry the structure name and member names in
    /// this form.
    pub fn get_nul_string(&mut self) -> LogixResult<String> {
        let mut name = String::new();
        loop {
            let byte = self.get_u8()?;
            if byte == 0 {
                return Ok(name);
            }
            name.push(byte as char);
        }
    }
}

/// Append `count` zero bytes, used for member and trailing structure padding.
pub fn put_padding(out: &mut Vec<u8>, count: usize) {
    out.resize(out.len() + count, 0);
}
