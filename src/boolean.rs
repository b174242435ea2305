//! Boolean encoding (EXI 7.1.2): a single bit, 0 = false, 1 = true.
//!
//! The same bit also carries presence flags, "more content" flags and the
//! nil flag of nillable elements.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

pub fn encode(writer: &mut BitWriter, value: bool) {
    writer.write_bit(value);
}

pub fn decode(reader: &mut BitReader) -> Result<bool> {
    reader.read_bit()
}

/// Parses the `xs:boolean` lexical space (`true`, `false`, `1`, `0`).
pub fn parse_lexical(text: &str) -> Result<bool> {
    match text.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::InvalidValue(format!("'{other}' is not a boolean"))),
    }
}

/// Canonical lexical form.
pub fn to_lexical(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
