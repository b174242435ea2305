//! Float encoding (EXI 7.1.4).
//!
//! Two consecutive Integers: a mantissa and a base-10 exponent. The mantissa
//! range is that of `i64`, the exponent range is -(2^14-1) to 2^14-1.
//!
//! The special exponent value -(2^14) encodes infinity, negative infinity and
//! NaN: mantissa 1 = INF, mantissa -1 = -INF, any other mantissa = NaN.

use std::fmt;

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, integer};

const EXPONENT_MIN: i64 = -(1 << 14) + 1;
const EXPONENT_MAX: i64 = (1 << 14) - 1;
const SPECIAL_EXPONENT: i64 = -(1 << 14);

/// Mehr Mantissen-Stellen passen nicht sicher in ein i64.
const MAX_MANTISSA_DIGITS: usize = 18;

/// A float value as it travels in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Float {
    /// A finite value: mantissa × 10^exponent.
    Value { mantissa: i64, exponent: i64 },
    Infinity,
    NegativeInfinity,
    NaN,
}

/// Encodes a float value. Fails if the exponent is out of range.
pub fn encode(writer: &mut BitWriter, value: Float) -> Result<()> {
    let (mantissa, exponent) = match value {
        Float::Value { mantissa, exponent } => {
            if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
                return Err(Error::InvalidValue(format!("float exponent {exponent} out of range")));
            }
            (mantissa, exponent)
        }
        Float::Infinity => (1, SPECIAL_EXPONENT),
        Float::NegativeInfinity => (-1, SPECIAL_EXPONENT),
        Float::NaN => (0, SPECIAL_EXPONENT),
    };
    integer::encode(writer, mantissa);
    integer::encode(writer, exponent);
    Ok(())
}

/// Decodes a float value.
pub fn decode(reader: &mut BitReader) -> Result<Float> {
    let mantissa = integer::decode(reader)?;
    let exponent = integer::decode(reader)?;

    if exponent == SPECIAL_EXPONENT {
        return Ok(match mantissa {
            1 => Float::Infinity,
            -1 => Float::NegativeInfinity,
            _ => Float::NaN,
        });
    }
    if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
        return Err(Error::FloatOutOfRange);
    }
    Ok(Float::Value { mantissa, exponent })
}

impl Float {
    /// Parses the `xs:float`/`xs:double` lexical space without going through
    /// binary floating point, so decimal digits are kept exactly.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidValue(format!("'{text}' is not a float"));
        let trimmed = text.trim();
        match trimmed {
            "INF" | "+INF" => return Ok(Self::Infinity),
            "-INF" => return Ok(Self::NegativeInfinity),
            "NaN" => return Ok(Self::NaN),
            _ => {}
        }
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (number, exp_part) = match body.find(['e', 'E']) {
            Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
            None => (body, None),
        };
        let mut exponent: i64 = match exp_part {
            Some(e) => e.parse().map_err(|_| invalid())?,
            None => 0,
        };
        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if (int_part.is_empty() && frac_part.is_empty())
            || !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        exponent -= frac_part.len() as i64;

        let digits: String = int_part.chars().chain(frac_part.chars()).collect();
        let mut digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Self::Value { mantissa: 0, exponent: 0 });
        }
        while let Some(rest) = digits.strip_suffix('0') {
            digits = rest;
            exponent += 1;
        }
        if digits.len() > MAX_MANTISSA_DIGITS {
            exponent += (digits.len() - MAX_MANTISSA_DIGITS) as i64;
            digits = &digits[..MAX_MANTISSA_DIGITS];
        }
        let magnitude: i64 = digits.parse().map_err(|_| invalid())?;
        if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
            return Err(Error::InvalidValue(format!("'{text}' exceeds the float exponent range")));
        }
        Ok(Self::Value {
            mantissa: if negative { -magnitude } else { magnitude },
            exponent,
        })
    }
}

impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { mantissa, exponent } => write!(f, "{mantissa}E{exponent}"),
            Self::Infinity => f.write_str("INF"),
            Self::NegativeInfinity => f.write_str("-INF"),
            Self::NaN => f.write_str("NaN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Float) -> Float {
        let mut w = BitWriter::new();
        encode(&mut w, value).unwrap();
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        decode(&mut r).unwrap()
    }

    #[test]
    fn specials() {
        for f in [Float::Infinity, Float::NegativeInfinity, Float::NaN] {
            assert_eq!(round_trip(f), f);
        }
        assert_eq!(Float::parse("-INF").unwrap(), Float::NegativeInfinity);
    }

    #[test]
    fn parse_keeps_decimal_digits() {
        assert_eq!(Float::parse("1.5").unwrap(), Float::Value { mantissa: 15, exponent: -1 });
        assert_eq!(Float::parse("-1.25E3").unwrap(), Float::Value { mantissa: -125, exponent: 1 });
        assert_eq!(Float::parse("0.000").unwrap(), Float::Value { mantissa: 0, exponent: 0 });
        assert_eq!(Float::parse("1200").unwrap(), Float::Value { mantissa: 12, exponent: 2 });
        assert!(Float::parse("1.2.3").is_err());
        assert!(Float::parse("E5").is_err());
    }

    #[test]
    fn canonical_text_parses_as_f64() {
        let f = Float::parse("0.1").unwrap();
        let text = round_trip(f).to_string();
        assert_eq!(text, "1E-1");
        assert_eq!(text.parse::<f64>().unwrap(), 0.1);
    }

    #[test]
    fn exponent_range_enforced() {
        let mut w = BitWriter::new();
        let err = encode(&mut w, Float::Value { mantissa: 1, exponent: EXPONENT_MAX + 1 });
        assert!(matches!(err, Err(Error::InvalidValue(_))));

        let mut w = BitWriter::new();
        integer::encode(&mut w, 1);
        integer::encode(&mut w, EXPONENT_MAX + 1);
        let data = w.into_vec();
        let mut r = BitReader::new(&data);
        assert_eq!(decode(&mut r), Err(Error::FloatOutOfRange));
    }
}
