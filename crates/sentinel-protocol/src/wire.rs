// Copyright (c) Hetu Project
// SPDX-License-Identifier: Apache-2.0

//! Primitive wire reading and writing
//!
//! All multi-byte integers and floats are little-endian. Every read is
//! bounds-checked first so a short buffer surfaces as
//! [`ProtocolError::Truncated`] naming the field, never as a panic or a value
//! read from the wrong offset.

use bytes::{Buf, BufMut};

use crate::error::{ProtocolError, Result};

/// Longest LEB128 encoding of a `u32`
pub const MAX_VARINT_LEN: usize = 5;

/// Bounds-checked cursor over an inbound buffer
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<()> {
        if self.buf.len() < needed {
            return Err(ProtocolError::Truncated {
                field,
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        self.ensure(field, 1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16> {
        self.ensure(field, 2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64> {
        self.ensure(field, 8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_f64(&mut self, field: &'static str) -> Result<f64> {
        self.ensure(field, 8)?;
        Ok(self.buf.get_f64_le())
    }

    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        self.ensure(field, N)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Read an unsigned LEB128 varint of at most [`MAX_VARINT_LEN`] bytes
    pub fn read_varint_u32(&mut self, field: &'static str) -> Result<u32> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_u8(field)?;
            let chunk = u32::from(byte & 0x7F);
            // The fifth byte only has room for the top four bits of a u32.
            if i == MAX_VARINT_LEN - 1 && chunk > 0x0F {
                return Err(ProtocolError::Malformed(format!(
                    "{} varint overflows 32 bits",
                    field
                )));
            }
            value |= chunk << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ProtocolError::Malformed(format!(
            "{} varint longer than {} bytes",
            field, MAX_VARINT_LEN
        )))
    }
}

/// Append an unsigned LEB128 varint
pub fn put_varint_u32<B: BufMut>(buf: &mut B, mut value: u32) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Map signed to unsigned so small magnitudes stay short: 0, -1, 1, -2 -> 0, 1, 2, 3
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
