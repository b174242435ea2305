//! Decimal encoding (EXI 7.1.3).
//!
//! A Boolean sign followed by two Unsigned Integers: the integral portion and
//! the fractional portion. The fractional digits are stored in reverse order
//! so that leading zeros survive ("1.05" stores fractional `50`).

use std::fmt;

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, boolean, unsigned_integer};

/// A decimal value as it travels in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    /// True if the value is negative (including minus zero).
    pub negative: bool,
    pub integral: u64,
    /// Fractional digits in reverse order.
    pub fractional: u64,
}

pub fn encode(writer: &mut BitWriter, value: Decimal) {
    boolean::encode(writer, value.negative);
    unsigned_integer::encode(writer, value.integral);
    unsigned_integer::encode(writer, value.fractional);
}

pub fn decode(reader: &mut BitReader) -> Result<Decimal> {
    let negative = boolean::decode(reader)?;
    let integral = unsigned_integer::decode(reader)?;
    let fractional = unsigned_integer::decode(reader)?;
    Ok(Decimal { negative, integral, fractional })
}

impl Decimal {
    /// Parses the `xs:decimal` lexical space (`-12.340`, `+.5`, `7`).
    ///
    /// Trailing fractional zeros carry no value and are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidValue(format!("'{text}' is not a decimal"));
        let trimmed = text.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let integral = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<u64>().map_err(|_| invalid())?
        };
        let frac_digits = frac_part.trim_end_matches('0');
        let reversed: String = frac_digits.chars().rev().collect();
        let fractional = if reversed.is_empty() {
            0
        } else {
            reversed.parse::<u64>().map_err(|_| invalid())?
        };
        Ok(Self { negative, integral, fractional })
    }
}

impl fmt::Display for Decimal {
    /// Canonical form: `-12.34`, `0`, `5`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zero = self.integral == 0 && self.fractional == 0;
        if self.negative && !zero {
            f.write_str("-")?;
        }
        write!(f, "{}", self.integral)?;
        if self.fractional != 0 {
            let digits: String = self.fractional.to_string().chars().rev().collect();
            write!(f, ".{digits}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_fraction() {
        let d = Decimal::parse("-12.340").unwrap();
        assert_eq!(d, Decimal { negative: true, integral: 12, fractional: 43 });
        assert_eq!(d.to_string(), "-12.34");
    }

    #[test]
    fn leading_fraction_zeros_survive() {
        let d = Decimal::parse("1.05").unwrap();
        assert_eq!(d.fractional, 50);
        assert_eq!(d.to_string(), "1.05");
    }

    #[test]
    fn short_forms() {
        assert_eq!(Decimal::parse(".5").unwrap().to_string(), "0.5");
        assert_eq!(Decimal::parse("+7").unwrap().to_string(), "7");
        assert_eq!(Decimal::parse("-0.0").unwrap().to_string(), "0");
        assert!(Decimal::parse(".").is_err());
        assert!(Decimal::parse("1e5").is_err());
        assert!(Decimal::parse("").is_err());
    }

    #[test]
    fn stream_round_trip() {
        let d = Decimal::parse("3.1415").unwrap();
        let mut w = BitWriter::new();
        encode(&mut w, d);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r).unwrap(), d);
    }
}
