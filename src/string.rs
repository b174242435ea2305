//! String encoding (EXI 7.1.10).
//!
//! A length (number of characters) as Unsigned Integer followed by each
//! character's code point as Unsigned Integer. The string table stores misses
//! with the length shifted by an offset (EXI 7.3.3), so the encoder takes the
//! offset and the decoder receives the already-adjusted length.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, unsigned_integer};

/// Encodes `value` with its length written as `chars + offset`.
///
/// ASCII-Fast-Path: jeder ASCII-Codepoint ist als Unsigned Integer genau
/// ein Byte ohne Continuation-Bit, also identisch mit dem Roh-Byte.
pub fn encode_with_offset(writer: &mut BitWriter, value: &str, offset: u64) {
    if value.is_ascii() {
        unsigned_integer::encode(writer, value.len() as u64 + offset);
        writer.write_octets(value.as_bytes());
    } else {
        unsigned_integer::encode(writer, value.chars().count() as u64 + offset);
        for ch in value.chars() {
            unsigned_integer::encode(writer, u64::from(ch));
        }
    }
}

/// Encodes a plain length-prefixed string.
pub fn encode(writer: &mut BitWriter, value: &str) {
    encode_with_offset(writer, value, 0);
}

/// Decodes `len` code points.
///
/// Fails with [`Error::InvalidCodePoint`] for surrogates or values above U+10FFFF.
pub fn decode_chars(reader: &mut BitReader, len: u64, max_len: Option<usize>) -> Result<String> {
    if let Some(max) = max_len
        && len > max as u64
    {
        return Err(Error::ValueLengthExceeded { length: len, max });
    }
    // Jeder Codepoint belegt mindestens ein Byte
    let len = usize::try_from(len).map_err(|_| Error::PrematureEndOfStream)?;
    reader.ensure_available(len.saturating_mul(8))?;
    let mut s = String::new();
    s.try_reserve(len).map_err(|_| Error::OutOfMemory(len))?;
    for _ in 0..len {
        let cp = unsigned_integer::decode(reader)?;
        let ch = u32::try_from(cp)
            .ok()
            .and_then(char::from_u32)
            .ok_or(Error::InvalidCodePoint(cp))?;
        s.push(ch);
    }
    Ok(s)
}

/// Decodes a plain length-prefixed string.
pub fn decode(reader: &mut BitReader, max_len: Option<usize>) -> Result<String> {
    let len = unsigned_integer::decode(reader)?;
    decode_chars(reader, len, max_len)
}
