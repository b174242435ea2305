//! Signed integer encoding (EXI 7.1.5).
//!
//! Three encoding variants depending on schema-derived bounds:
//! 1. Bounded (range ≤ 4096): n-bit unsigned offset from minimum
//! 2. Non-negative (min ≥ 0): `unsigned_integer` directly (no wrapper here)
//! 3. Unbounded signed: 1-bit sign + unsigned integer magnitude

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, bit_width, n_bit_unsigned_integer, unsigned_integer};

/// Largest value range that is written as an n-bit offset.
pub const MAX_BOUNDED_RANGE: i128 = 4096;

/// Encodes a signed integer (unbounded case).
///
/// Sign bit (0 = non-negative, 1 = negative) followed by the magnitude as an
/// unsigned integer. For negative values the magnitude is `(-value - 1)`.
pub fn encode(writer: &mut BitWriter, value: i64) {
    if value >= 0 {
        writer.write_bit(false);
        unsigned_integer::encode(writer, value as u64);
    } else {
        writer.write_bit(true);
        // (-value - 1) ohne Overflow bei i64::MIN
        unsigned_integer::encode(writer, !(value as u64));
    }
}

/// Decodes a signed integer (unbounded case).
pub fn decode(reader: &mut BitReader) -> Result<i64> {
    let sign = reader.read_bit()?;
    let magnitude = unsigned_integer::decode(reader)?;
    if magnitude > i64::MAX as u64 {
        return Err(Error::IntegerOverflow);
    }
    if sign {
        Ok(-(magnitude as i64) - 1)
    } else {
        Ok(magnitude as i64)
    }
}

/// Encodes a bounded integer as an n-bit offset from `min`,
/// `n = ⌈log₂(max - min + 1)⌉`.
pub fn encode_bounded(writer: &mut BitWriter, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::InvalidValue(format!("{value} outside [{min}, {max}]")));
    }
    let n = bit_width::for_count(bounded_range(min, max));
    n_bit_unsigned_integer::encode(writer, (value as i128 - min as i128) as u64, n);
    Ok(())
}

/// Decodes a bounded integer.
pub fn decode_bounded(reader: &mut BitReader, min: i64, max: i64) -> Result<i64> {
    let range = bounded_range(min, max);
    let offset = n_bit_unsigned_integer::decode(reader, bit_width::for_count(range))?;
    if offset >= range as u64 {
        return Err(Error::IntegerOverflow);
    }
    Ok((min as i128 + offset as i128) as i64)
}

fn bounded_range(min: i64, max: i64) -> usize {
    debug_assert!(max >= min && max as i128 - min as i128 + 1 <= MAX_BOUNDED_RANGE);
    (max as i128 - min as i128 + 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_round_trip(value: i64) -> i64 {
        let mut w = BitWriter::new();
        encode(&mut w, value);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r).unwrap()
    }

    #[test]
    fn signed_extremes() {
        for v in [0, 1, -1, 63, -64, i64::MAX, i64::MIN] {
            assert_eq!(signed_round_trip(v), v);
        }
    }

    #[test]
    fn minus_one_layout() {
        // sign=1, magnitude 0 -> 1 + 0000000|0 ...
        let mut w = BitWriter::new();
        encode(&mut w, -1);
        assert_eq!(w.into_vec(), vec![0x80, 0x00]);
    }

    #[test]
    fn bounded_byte_range() {
        let mut w = BitWriter::new();
        encode_bounded(&mut w, -128, -128, 127).unwrap();
        encode_bounded(&mut w, 127, -128, 127).unwrap();
        assert_eq!(w.bit_position(), 16);
        let data = w.into_vec();
        assert_eq!(data, vec![0x00, 0xFF]);
        let mut r = BitReader::new(&data);
        assert_eq!(decode_bounded(&mut r, -128, 127).unwrap(), -128);
        assert_eq!(decode_bounded(&mut r, -128, 127).unwrap(), 127);
    }

    #[test]
    fn bounded_rejects_out_of_range() {
        let mut w = BitWriter::new();
        assert!(matches!(encode_bounded(&mut w, 11, 0, 10), Err(Error::InvalidValue(_))));
        assert_eq!(w.bit_position(), 0);
    }

    #[test]
    fn bounded_offset_beyond_range() {
        // Bereich 0..=4 -> 3 Bits, Offset 7 ist ungültig
        let data = [0b1110_0000];
        let mut r = BitReader::new(&data);
        assert_eq!(decode_bounded(&mut r, 0, 4), Err(Error::IntegerOverflow));
    }

    #[test]
    fn single_value_range_uses_no_bits() {
        let mut w = BitWriter::new();
        encode_bounded(&mut w, 5, 5, 5).unwrap();
        assert_eq!(w.bit_position(), 0);
    }
}
