//! n-bit unsigned integer encoding (EXI 7.1.9).
//!
//! Represents an unsigned integer value using exactly `n` bits. When `n` is 0
//! the value is omitted entirely. Choice indices, count prefixes, root codes
//! and compact identifiers all go through here.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

/// Encodes `value` using exactly `n` bits.
///
/// Callers compute `n` with [`crate::bit_width::for_count`], so the value
/// always fits; this is only checked in debug builds.
#[inline]
pub fn encode(writer: &mut BitWriter, value: u64, n: u8) {
    debug_assert!(n <= 64, "bit width must be 0..=64, got {n}");
    debug_assert!(n == 64 || value < (1u64 << n), "value {value} does not fit in {n} bits");
    writer.write_bits(value, n);
}

/// Decodes an unsigned integer from exactly `n` bits.
#[inline]
pub fn decode(reader: &mut BitReader, n: u8) -> Result<u64> {
    reader.read_bits(n)
}

/// Decodes an index in `0..count` written with `⌈log₂(count)⌉` bits.
///
/// When `count` is not a power of two, some bit patterns are out of range;
/// those are reported as [`Error::InvalidEventCode`] with `context`.
pub fn decode_index(reader: &mut BitReader, count: usize, context: &'static str) -> Result<usize> {
    let n = crate::bit_width::for_count(count);
    let value = reader.read_bits(n)?;
    let index = usize::try_from(value).unwrap_or(usize::MAX);
    if index >= count {
        return Err(Error::invalid_event_code(value, context));
    }
    Ok(index)
}
