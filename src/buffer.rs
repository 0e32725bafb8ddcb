//! # BitBuffer - Ordered Bit Accumulation and Consumption
//!
//! Single accumulation/consumption structure for every encode/decode call.
//! The buffer is an ordered sequence of bits with a defined direction: the
//! *front* is the consumption end. Field codecs build their own small buffer
//! in natural order with [`BitBuffer::push_bits`], and the message-level
//! wrapper splices each finished field onto the front of the stream with
//! [`BitBuffer::prepend`]. Decoding therefore sees the most recently encoded
//! field first and walks the message backwards, which is exactly what the
//! key-frame array scheme requires (the key is appended last, decoded
//! first).
//!
//! Bit order within a single `push_bits`/`consume_bits` pair is MSB-first:
//! pushing `0b101` with width 3 produces bits `1, 0, 1` in consumption
//! order. Byte packing places the front bit in the most significant bit of
//! byte 0; only the final partial byte is zero-padded.
//!
//! Encoding a field must never read past the field's own computed size, and
//! decoding must consume precisely the size the codec reported; the buffer
//! enforces the mechanical half of that contract by refusing to consume
//! more bits than it holds ([`CodecError::OutOfBits`]).

use crate::{CodecError, Result};
use std::collections::VecDeque;
use std::fmt;

/// Ordered, resizable sequence of bits.
///
/// Cheap to clone for lookahead; cloning is the non-mutating "view"
/// used when a decoder needs to inspect bits it may not end up consuming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuffer {
    /// Front (index 0) is the consumption end.
    bits: VecDeque<bool>,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self {
            bits: VecDeque::new(),
        }
    }

    /// Current bit count.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Append `width` bits of `value` at the back, MSB-first.
    ///
    /// Only the lowest `width` bits of `value` are used; a value narrower
    /// than `width` is zero-extended, preserving its numeric value. Widths
    /// above 64 are rejected.
    pub fn push_bits(&mut self, value: u64, width: usize) -> Result<()> {
        if width > 64 {
            return Err(CodecError::InvalidBitWidth(width));
        }
        for i in (0..width).rev() {
            self.bits.push_back((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Remove and return the first `width` bits, MSB-first.
    pub fn consume_bits(&mut self, width: usize) -> Result<u64> {
        let value = self.peek_bits(width)?;
        self.bits.drain(..width);
        Ok(value)
    }

    /// Read the first `width` bits without removing them.
    pub fn peek_bits(&self, width: usize) -> Result<u64> {
        if width > 64 {
            return Err(CodecError::InvalidBitWidth(width));
        }
        if width > self.bits.len() {
            return Err(CodecError::OutOfBits {
                requested: width,
                available: self.bits.len(),
            });
        }
        let mut value = 0u64;
        for i in 0..width {
            value = (value << 1) | u64::from(self.bits[i]);
        }
        Ok(value)
    }

    /// Concatenate `other` at the back, preserving its internal order.
    pub fn append(&mut self, mut other: BitBuffer) {
        self.bits.append(&mut other.bits);
    }

    /// Splice `other` onto the front so it is consumed first, preserving
    /// its internal order. This is the message-stream operation: each
    /// successive field becomes the new prefix.
    pub fn prepend(&mut self, other: BitBuffer) {
        for bit in other.bits.into_iter().rev() {
            self.bits.push_front(bit);
        }
    }

    /// Pack into bytes, front bit first (MSB of byte 0). The final partial
    /// byte, if any, is padded with zeros in its low bits; that padding is
    /// the only implicit padding anywhere in the body stream.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.bits.len().div_ceil(8)];
        for (i, bit) in self.bits.iter().enumerate() {
            if *bit {
                out[i / 8] |= 0x80 >> (i % 8);
            }
        }
        out
    }

    /// Rebuild a buffer from packed bytes. Up to seven trailing pad bits
    /// reappear at the back; they are never consumed because decoders take
    /// exactly the sum of the declared field sizes from the front.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut bits = VecDeque::with_capacity(bytes.len() * 8);
        for byte in bytes {
            for i in (0..8).rev() {
                bits.push_back((byte >> i) & 1 == 1);
            }
        }
        Self { bits }
    }
}

impl fmt::Display for BitBuffer {
    /// Bits in consumption order, front first. Used by trace logging.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.bits {
            write!(f, "{}", u8::from(*bit))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_consume_roundtrip() {
        let mut buf = BitBuffer::new();
        buf.push_bits(0b101, 3).unwrap();
        buf.push_bits(0b11, 2).unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.consume_bits(3).unwrap(), 0b101);
        assert_eq!(buf.consume_bits(2).unwrap(), 0b11);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_zero_extension_preserves_value() {
        let mut buf = BitBuffer::new();
        buf.push_bits(5, 16).unwrap();
        assert_eq!(buf.consume_bits(16).unwrap(), 5);
    }

    #[test]
    fn test_prepend_is_consumed_first() {
        let mut stream = BitBuffer::new();
        let mut first = BitBuffer::new();
        first.push_bits(0b0001, 4).unwrap();
        let mut second = BitBuffer::new();
        second.push_bits(0b0010, 4).unwrap();

        stream.prepend(first);
        stream.prepend(second);

        // The field encoded last comes off the front first.
        assert_eq!(stream.consume_bits(4).unwrap(), 0b0010);
        assert_eq!(stream.consume_bits(4).unwrap(), 0b0001);
    }

    #[test]
    fn test_prepend_preserves_internal_order() {
        let mut element = BitBuffer::new();
        element.push_bits(0b110, 3).unwrap(); // prefix
        element.push_bits(0b01010101, 8).unwrap(); // content

        let mut stream = BitBuffer::new();
        stream.push_bits(0b1, 1).unwrap();
        stream.prepend(element);

        assert_eq!(stream.consume_bits(3).unwrap(), 0b110);
        assert_eq!(stream.consume_bits(8).unwrap(), 0b01010101);
        assert_eq!(stream.consume_bits(1).unwrap(), 1);
    }

    #[test]
    fn test_byte_packing_roundtrip() {
        let mut buf = BitBuffer::new();
        buf.push_bits(0xDEAD, 16).unwrap();
        buf.push_bits(0b101, 3).unwrap();

        let bytes = buf.to_bytes();
        assert_eq!(bytes.len(), 3); // 19 bits -> 3 bytes

        let mut back = BitBuffer::from_bytes(&bytes);
        assert_eq!(back.len(), 24); // pad bits reappear at the back
        assert_eq!(back.consume_bits(16).unwrap(), 0xDEAD);
        assert_eq!(back.consume_bits(3).unwrap(), 0b101);
        assert_eq!(back.consume_bits(5).unwrap(), 0); // padding
    }

    #[test]
    fn test_consume_past_end_fails() {
        let mut buf = BitBuffer::new();
        buf.push_bits(1, 4).unwrap();
        let err = buf.consume_bits(5).unwrap_err();
        assert!(matches!(
            err,
            CodecError::OutOfBits {
                requested: 5,
                available: 4
            }
        ));
        // The failed consume must not have disturbed the buffer.
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_peek_is_nonmutating() {
        let mut buf = BitBuffer::new();
        buf.push_bits(0b1010, 4).unwrap();
        assert_eq!(buf.peek_bits(4).unwrap(), 0b1010);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.consume_bits(4).unwrap(), 0b1010);
    }
}
