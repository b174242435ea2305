//! Variable-length unsigned integer encoding (EXI 7.1.6).
//!
//! Each octet carries a continuation bit (MSB) and 7 data bits. The least
//! significant group is written first; the last octet has continuation = 0.
//! Lengths, string-table misses and code points all use this representation.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

/// Encodes a `u64` as a variable-length unsigned integer.
#[inline]
pub fn encode(writer: &mut BitWriter, value: u64) {
    if value < 128 {
        // Fast-Path: Single-Byte (kleine Längen, ASCII Codepoints)
        writer.write_octet(value as u8);
        return;
    }
    let mut v = value;
    loop {
        let low7 = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            writer.write_octet(low7);
            break;
        }
        writer.write_octet(0x80 | low7);
    }
}

/// Decodes a variable-length unsigned integer.
///
/// Fails with [`Error::IntegerOverflow`] if the value does not fit in a `u64`.
#[inline]
pub fn decode(reader: &mut BitReader) -> Result<u64> {
    let byte = reader.read_octet()?;
    if byte & 0x80 == 0 {
        return Ok(u64::from(byte));
    }
    let mut result = u64::from(byte & 0x7F);
    let mut shift: u32 = 7;
    loop {
        let byte = reader.read_octet()?;
        let data = u64::from(byte & 0x7F);
        // Beim 10. Byte ist nur Daten-Bit 0 gültig und kein Continuation-Bit erlaubt.
        if shift == 63 && (data > 1 || byte & 0x80 != 0) {
            return Err(Error::IntegerOverflow);
        }
        result |= data << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Decodes a length and checks it against the bits left in the stream,
/// assuming each unit occupies at least `min_bits_per_unit` bits.
pub fn decode_length(reader: &mut BitReader, min_bits_per_unit: usize) -> Result<usize> {
    let len = decode(reader)?;
    let len = usize::try_from(len).map_err(|_| Error::PrematureEndOfStream)?;
    reader.ensure_available(len.saturating_mul(min_bits_per_unit))?;
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: u64) -> u64 {
        let mut w = BitWriter::new();
        encode(&mut w, value);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r).unwrap()
    }

    #[test]
    fn single_byte_boundary() {
        assert_eq!(round_trip(0), 0);
        let mut w = BitWriter::new();
        encode(&mut w, 127);
        assert_eq!(w.into_vec(), vec![0x7F]);
    }

    #[test]
    fn two_byte_encoding() {
        let mut w = BitWriter::new();
        encode(&mut w, 128);
        // low7=0x00 mit Continuation, dann 0x01
        assert_eq!(w.into_vec(), vec![0x80, 0x01]);

        let mut w = BitWriter::new();
        encode(&mut w, 12345);
        // 12345 = 0b1100000_0111001
        assert_eq!(w.into_vec(), vec![0xB9, 0x60]);
    }

    #[test]
    fn max_value() {
        assert_eq!(round_trip(u64::MAX), u64::MAX);
        let mut w = BitWriter::new();
        encode(&mut w, u64::MAX);
        assert_eq!(w.into_vec().len(), 10);
    }

    #[test]
    fn overflow_rejected() {
        // 10 Bytes, letztes Byte mit Datenbit > 1
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r), Err(Error::IntegerOverflow));
    }

    #[test]
    fn truncated_continuation() {
        let data = [0x80];
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r), Err(Error::PrematureEndOfStream));
    }

    #[test]
    fn length_larger_than_stream() {
        // Länge 100, aber nur 2 Bytes folgen
        let data = [100, 1, 2];
        let mut r = BitReader::new(&data);
        assert_eq!(decode_length(&mut r, 8), Err(Error::PrematureEndOfStream));

        let data = [2, 1, 2];
        let mut r = BitReader::new(&data);
        assert_eq!(decode_length(&mut r, 8), Ok(2));
    }
}
