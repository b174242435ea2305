//! Binary encoding (EXI 7.1.1) for `xs:hexBinary` and `xs:base64Binary`.
//!
//! A length-prefixed sequence of octets. The lexical helpers convert between
//! the two XML text forms and raw octets.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, unsigned_integer};

pub fn encode(writer: &mut BitWriter, value: &[u8]) {
    unsigned_integer::encode(writer, value.len() as u64);
    writer.write_octets(value);
}

/// Decodes a binary value. `max_len` bounds the accepted length.
pub fn decode(reader: &mut BitReader, max_len: Option<usize>) -> Result<Vec<u8>> {
    let len = unsigned_integer::decode_length(reader, 8)?;
    if let Some(max) = max_len
        && len > max
    {
        return Err(Error::ValueLengthExceeded { length: len as u64, max });
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::OutOfMemory(len))?;
    buf.resize(len, 0);
    reader.read_octets(&mut buf)?;
    Ok(buf)
}

/// Parses `xs:hexBinary` text (either letter case).
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return Err(Error::InvalidValue(format!("hexBinary '{text}' has an odd number of digits")));
    }
    text.as_bytes()
        .chunks_exact(2)
        .map(|pair| match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(Error::InvalidValue(format!("'{text}' is not hexBinary"))),
        })
        .collect()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Formats octets as `xs:hexBinary`.
pub fn to_hex(bytes: &[u8], upper: bool) -> String {
    const UPPER: &[u8; 16] = b"0123456789ABCDEF";
    const LOWER: &[u8; 16] = b"0123456789abcdef";
    let table = if upper { UPPER } else { LOWER };
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(table[(b >> 4) as usize] as char);
        out.push(table[(b & 0x0F) as usize] as char);
    }
    out
}

/// Parses `xs:base64Binary` text. Embedded whitespace is allowed.
pub fn parse_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::InvalidValue(format!("invalid base64Binary: {e}")))
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
