//! Bit payload stored directly in a cell

use crate::{Error, Result};
use std::fmt;

/// A big-endian bit string
///
/// Bits past `len` in the last byte are always zero, so two bit strings
/// with the same bits compare (and hash) equal regardless of how they
/// were built.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitString {
    data: Vec<u8>,
    len: usize,
}

impl BitString {
    /// Create an empty bit string
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the first `bit_len` bits of `data`
    pub fn from_bytes(data: &[u8], bit_len: usize) -> Result<Self> {
        if bit_len > data.len() * 8 {
            return Err(Error::InvalidBits(format!(
                "{} bits requested from {} bytes",
                bit_len,
                data.len()
            )));
        }
        let mut data = data[..bit_len.div_ceil(8)].to_vec();
        let rem = bit_len % 8;
        if rem != 0 {
            if let Some(last) = data.last_mut() {
                *last &= 0xffu8 << (8 - rem);
            }
        }
        Ok(BitString { data, len: bit_len })
    }

    /// Parse a literal such as `"10110"`
    pub fn from_binary(s: &str) -> Result<Self> {
        let mut bits = BitString::new();
        for c in s.chars() {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                _ => return Err(Error::InvalidBits(format!("unexpected {c:?} in {s:?}"))),
            }
        }
        Ok(bits)
    }

    /// Parse hex with an optional `_` completion tag
    ///
    /// With the tag, the last set bit marks the end of the payload and is
    /// dropped together with the zeros after it, so lengths that are not a
    /// multiple of four can be written in hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let (digits, tagged) = match s.strip_suffix('_') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        let mut bits = BitString::new();
        for c in digits.chars() {
            let nibble = c
                .to_digit(16)
                .ok_or_else(|| Error::InvalidBits(format!("unexpected {c:?} in {s:?}")))?;
            bits.push_uint(u64::from(nibble), 4);
        }
        if tagged {
            while bits.len > 0 && !bits.get(bits.len - 1) {
                bits.truncate(bits.len - 1);
            }
            if bits.len == 0 {
                return Err(Error::InvalidBits(format!("missing completion bit in {s:?}")));
            }
            bits.truncate(bits.len - 1);
        }
        Ok(bits)
    }

    /// Get the length in bits
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing bytes, `len().div_ceil(8)` of them
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bit at position `i`; panics when out of range
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bit index {i} out of range for length {}", self.len);
        self.data[i / 8] & (0x80 >> (i % 8)) != 0
    }

    /// Append one bit
    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.len / 8] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Append the low `bits` bits of `value`, most significant first
    pub fn push_uint(&mut self, value: u64, bits: usize) {
        for i in (0..bits).rev() {
            self.push(i < 64 && (value >> i) & 1 == 1);
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if self.len % 8 == 0 {
            self.data.extend_from_slice(bytes);
            self.len += bytes.len() * 8;
        } else {
            for &b in bytes {
                self.push_uint(u64::from(b), 8);
            }
        }
    }

    pub fn extend_from(&mut self, other: &BitString) {
        for i in 0..other.len {
            self.push(other.get(i));
        }
    }

    fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        self.data.truncate(len.div_ceil(8));
        let rem = len % 8;
        if rem != 0 {
            if let Some(last) = self.data.last_mut() {
                *last &= 0xffu8 << (8 - rem);
            }
        }
        self.len = len;
    }

    pub fn to_binary(&self) -> String {
        (0..self.len)
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect()
    }

    /// Hex rendering, tagged with `_` when the length is not nibble aligned
    pub fn to_hex(&self) -> String {
        let mut padded = self.clone();
        let tagged = self.len % 4 != 0;
        if tagged {
            padded.push(true);
            while padded.len % 4 != 0 {
                padded.push(false);
            }
        }
        let mut out = hex::encode(&padded.data);
        if padded.len % 8 != 0 {
            out.pop();
        }
        if tagged {
            out.push('_');
        }
        out
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{{{}}}", self.to_hex())
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString({}, {})", self.len, self.to_hex())
    }
}
