// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Little-endian read/write cursors for the ROS wire format.
//!
//! No alignment or padding: every primitive is written at the current offset
//! using its native width.

use super::WireError;

/// Generate bounds-checked little-endian read methods.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, WireError> {
            let bytes = self.read_bytes($size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(<$type>::from_le_bytes(raw))
        }
    };
}

/// Generate little-endian write methods.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        #[inline]
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Growable output buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_i8, i8);
    impl_write_le!(write_u16, u16);
    impl_write_le!(write_i16, i16);
    impl_write_le!(write_u32, u32);
    impl_write_le!(write_i32, i32);
    impl_write_le!(write_u64, u64);
    impl_write_le!(write_i64, i64);
    impl_write_le!(write_f32, f32);
    impl_write_le!(write_f64, f64);

    /// Write a 4-byte length prefix.
    pub fn write_len(&mut self, len: usize) -> Result<(), WireError> {
        let len = u32::try_from(len).map_err(|_| WireError::LengthOverflow(len))?;
        self.write_u32(len);
        Ok(())
    }

    /// Length-prefixed string bytes (no terminator).
    pub fn write_string(&mut self, s: &str) -> Result<(), WireError> {
        self.write_len(s.len())?;
        self.buffer.extend_from_slice(s.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Bounds-checked input cursor.
///
/// Every read that would pass the end of the buffer fails with
/// [`WireError::BufferUnderrun`] and leaves the offset untouched.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], WireError> {
        if count > self.remaining() {
            return Err(WireError::BufferUnderrun {
                offset: self.offset,
                need: count,
                have: self.remaining(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_i8, i8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_i64, i64, 8);
    impl_read_le!(read_f32, f32, 4);
    impl_read_le!(read_f64, f64, 8);

    /// Read a 4-byte length prefix, rejecting lengths whose minimal encoding
    /// (`len * min_elem_size`) cannot fit in the remaining bytes.
    pub fn read_len(&mut self, min_elem_size: usize) -> Result<usize, WireError> {
        let start = self.offset;
        let len = self.read_u32()? as usize;
        let need = len.saturating_mul(min_elem_size);
        if need > self.remaining() {
            let have = self.remaining();
            self.offset = start;
            return Err(WireError::BufferUnderrun {
                offset: start + 4,
                need,
                have,
            });
        }
        Ok(len)
    }

    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len = self.read_len(1)?;
        let offset = self.offset;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8 { offset })
    }
}
