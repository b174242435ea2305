//! Enumeration encoding (EXI 7.2).
//!
//! Enumerated values are encoded as n-bit Unsigned Integers where n = ⌈log₂(m)⌉
//! and m is the number of items in the enumerated type. The value is the
//! 0-based position of the item in schema order.

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, bit_width, n_bit_unsigned_integer};

/// Encodes `value` as its index in `values`.
pub fn encode(writer: &mut BitWriter, value: &str, values: &[String]) -> Result<()> {
    let value = value.trim();
    let Some(index) = values.iter().position(|v| v == value) else {
        return Err(Error::InvalidValue(format!(
            "'{value}' is not one of [{}]",
            values.join(", ")
        )));
    };
    n_bit_unsigned_integer::encode(writer, index as u64, bit_width::for_count(values.len()));
    Ok(())
}

/// Decodes an enumeration index and returns the value it refers to.
///
/// Fails with [`Error::InvalidEnumerationIndex`] when the index is out of
/// range (possible whenever `values.len()` is not a power of two).
pub fn decode<'v>(reader: &mut BitReader, values: &'v [String]) -> Result<&'v str> {
    let n = bit_width::for_count(values.len());
    let index = n_bit_unsigned_integer::decode(reader, n)? as usize;
    values
        .get(index)
        .map(String::as_str)
        .ok_or(Error::InvalidEnumerationIndex { index, enum_count: values.len() })
}
