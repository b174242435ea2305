//! EXI header (EXI 5).
//!
//! Written streams always carry the minimal header: no cookie, distinguishing
//! bits `10`, no options, final version 1. That is exactly one byte, `0x80`,
//! followed immediately by the body without padding.
//!
//! When reading, an optional `$EXI` cookie is skipped. Streams announcing
//! header options are rejected: both sides of this codec agree on the options
//! out of band.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, n_bit_unsigned_integer};

const EXI_COOKIE: [u8; 4] = *b"$EXI";
const DISTINGUISHING_BITS: u64 = 0b10;

pub fn write(writer: &mut BitWriter) {
    n_bit_unsigned_integer::encode(writer, DISTINGUISHING_BITS, 2);
    // Presence Bit: keine Options
    writer.write_bit(false);
    // Final-Version (Preview-Bit 0), Version 1 = 0000
    writer.write_bit(false);
    n_bit_unsigned_integer::encode(writer, 0, 4);
}

pub fn read(reader: &mut BitReader, data: &[u8]) -> Result<()> {
    if data.starts_with(&EXI_COOKIE) {
        let mut cookie = [0u8; 4];
        reader.read_octets(&mut cookie)?;
    }
    let bits = n_bit_unsigned_integer::decode(reader, 2)?;
    if bits != DISTINGUISHING_BITS {
        return Err(Error::InvalidDistinguishingBits(bits as u8));
    }
    if reader.read_bit()? {
        return Err(Error::MalformedHeader("header options are not supported".into()));
    }
    let preview = reader.read_bit()?;
    let version = n_bit_unsigned_integer::decode(reader, 4)?;
    if preview || version != 0 {
        return Err(Error::UnsupportedVersion);
    }
    Ok(())
}
