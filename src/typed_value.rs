//! Typed Value Encoding/Decoding (EXI 7, Table 7-1).
//!
//! A [`ValueCodec`] is the representation chosen for one simple type: the
//! built-in base type and its facets decide how the lexical value travels in
//! the stream. Encoding takes lexical text (from XML or converted JSON),
//! decoding yields canonical lexical text.
//!
//! Only [`ValueCodec::String`] goes through the string table. All other
//! representations are self-contained bit patterns.

use std::sync::Arc;

use crate::bitstream::{BitReader, BitWriter};
use crate::decimal::Decimal;
use crate::float::Float;
use crate::options::CodecOptions;
use crate::qname::QName;
use crate::schema::Facets;
use crate::string_table::StringTable;
use crate::{
    Error, Result, binary, boolean, decimal, enumeration, float, integer, unsigned_integer,
};

// ============================================================================
// Codec Descriptors
// ============================================================================

/// Inclusive value bounds of an integer type; `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IntegerBounds {
    pub min: Option<i128>,
    pub max: Option<i128>,
}

impl IntegerBounds {
    const fn new(min: Option<i128>, max: Option<i128>) -> Self {
        Self { min, max }
    }

    fn check(&self, value: i128, text: &str) -> Result<()> {
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            return Err(Error::InvalidValue(format!("'{text}' is outside the allowed range")));
        }
        Ok(())
    }
}

/// `length`/`minLength`/`maxLength` facets, checked when encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LengthFacets {
    pub length: Option<u64>,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl LengthFacets {
    fn from_facets(facets: &Facets) -> Self {
        Self { length: facets.length, min: facets.min_length, max: facets.max_length }
    }

    fn check(&self, len: usize, what: &str) -> Result<()> {
        let len = len as u64;
        let ok = self.length.is_none_or(|l| len == l)
            && self.min.is_none_or(|m| len >= m)
            && self.max.is_none_or(|m| len <= m);
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidValue(format!("{what} of length {len} violates its length facets")))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryFormat {
    Hex,
    Base64,
}

/// Value Codec Descriptor: how one simple-typed value is represented.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueCodec {
    /// 1 bit.
    Boolean,
    /// Unsigned Integer (EXI 7.1.6), for types whose minimum is ≥ 0.
    Unsigned(IntegerBounds),
    /// n-bit offset from `min` for ranges of at most 4096 values.
    BoundedInteger { min: i64, max: i64 },
    /// Signed Integer (EXI 7.1.5).
    Integer(IntegerBounds),
    Decimal,
    Float,
    Binary(BinaryFormat, LengthFacets),
    /// n-bit index into the values in schema order.
    Enumeration(Arc<[String]>),
    /// String with string-table lookup.
    String(LengthFacets),
}

/// JSON representation of a decoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Bool,
    Integer,
    Number,
    String,
}

/// Built-in Typ-Familien (XSD Part 2 §3).
enum Family {
    Boolean,
    Integer(IntegerBounds),
    Decimal,
    Float,
    Binary(BinaryFormat),
    String,
}

const fn bounds(min: i128, max: i128) -> IntegerBounds {
    IntegerBounds::new(Some(min), Some(max))
}

fn builtin_family(local_name: &str) -> Option<Family> {
    let family = match local_name {
        "boolean" => Family::Boolean,
        "decimal" => Family::Decimal,
        "float" | "double" => Family::Float,
        "hexBinary" => Family::Binary(BinaryFormat::Hex),
        "base64Binary" => Family::Binary(BinaryFormat::Base64),
        "integer" => Family::Integer(IntegerBounds::default()),
        "long" => Family::Integer(bounds(i64::MIN as i128, i64::MAX as i128)),
        "int" => Family::Integer(bounds(i32::MIN as i128, i32::MAX as i128)),
        "short" => Family::Integer(bounds(i16::MIN as i128, i16::MAX as i128)),
        "byte" => Family::Integer(bounds(i8::MIN as i128, i8::MAX as i128)),
        "nonNegativeInteger" => Family::Integer(IntegerBounds::new(Some(0), None)),
        "positiveInteger" => Family::Integer(IntegerBounds::new(Some(1), None)),
        "nonPositiveInteger" => Family::Integer(IntegerBounds::new(None, Some(0))),
        "negativeInteger" => Family::Integer(IntegerBounds::new(None, Some(-1))),
        "unsignedLong" => Family::Integer(bounds(0, u64::MAX as i128)),
        "unsignedInt" => Family::Integer(bounds(0, u32::MAX as i128)),
        "unsignedShort" => Family::Integer(bounds(0, u16::MAX as i128)),
        "unsignedByte" => Family::Integer(bounds(0, u8::MAX as i128)),
        // Datum/Zeit, QName, Listen und alle String-Ableitungen: Zeichenketten
        "string" | "normalizedString" | "token" | "language" | "Name" | "NCName" | "NMTOKEN"
        | "NMTOKENS" | "ID" | "IDREF" | "IDREFS" | "ENTITY" | "ENTITIES" | "anyURI" | "QName"
        | "NOTATION" | "anySimpleType" | "duration" | "dateTime" | "time" | "date"
        | "gYearMonth" | "gYear" | "gMonthDay" | "gDay" | "gMonth" => Family::String,
        _ => return None,
    };
    Some(family)
}

fn parse_facet_integer(value: &str, facet: &str) -> Result<i128> {
    value.trim().parse::<i128>().map_err(|_| {
        Error::XsdParseError(format!("{facet} value '{value}' is not an integer"))
    })
}

fn narrow(mut b: IntegerBounds, facets: &Facets) -> Result<IntegerBounds> {
    let tighten_min = |current: Option<i128>, v: i128| Some(current.map_or(v, |c| c.max(v)));
    let tighten_max = |current: Option<i128>, v: i128| Some(current.map_or(v, |c| c.min(v)));
    if let Some(v) = &facets.min_inclusive {
        b.min = tighten_min(b.min, parse_facet_integer(v, "minInclusive")?);
    }
    if let Some(v) = &facets.min_exclusive {
        b.min = tighten_min(b.min, parse_facet_integer(v, "minExclusive")? + 1);
    }
    if let Some(v) = &facets.max_inclusive {
        b.max = tighten_max(b.max, parse_facet_integer(v, "maxInclusive")?);
    }
    if let Some(v) = &facets.max_exclusive {
        b.max = tighten_max(b.max, parse_facet_integer(v, "maxExclusive")? - 1);
    }
    if let (Some(min), Some(max)) = (b.min, b.max)
        && min > max
    {
        return Err(Error::XsdParseError(format!("empty value range [{min}, {max}]")));
    }
    Ok(b)
}

impl ValueCodec {
    /// Chooses the representation for a built-in type restricted by `facets`.
    ///
    /// Returns `None` if `local_name` is not a built-in simple type.
    /// Enumerations win over every other representation.
    pub fn for_builtin(local_name: &str, facets: &Facets) -> Result<Option<Self>> {
        let Some(family) = builtin_family(local_name) else {
            return Ok(None);
        };
        if !facets.enumeration.is_empty() {
            return Ok(Some(Self::Enumeration(facets.enumeration.iter().cloned().collect())));
        }
        let codec = match family {
            Family::Boolean => Self::Boolean,
            Family::Decimal => Self::Decimal,
            Family::Float => Self::Float,
            Family::Binary(format) => Self::Binary(format, LengthFacets::from_facets(facets)),
            Family::String => Self::String(LengthFacets::from_facets(facets)),
            Family::Integer(base) => {
                let b = narrow(base, facets)?;
                match (b.min, b.max) {
                    (Some(min), Some(max))
                        if max - min < integer::MAX_BOUNDED_RANGE
                            && i64::try_from(min).is_ok()
                            && i64::try_from(max).is_ok() =>
                    {
                        Self::BoundedInteger { min: min as i64, max: max as i64 }
                    }
                    (Some(min), _) if min >= 0 => Self::Unsigned(b),
                    _ => Self::Integer(b),
                }
            }
        };
        Ok(Some(codec))
    }

    /// Plain string codec for `xs:anySimpleType`, lists and unions.
    pub fn string() -> Self {
        Self::String(LengthFacets::default())
    }

    pub fn json_kind(&self) -> JsonKind {
        match self {
            Self::Boolean => JsonKind::Bool,
            Self::Unsigned(_) | Self::BoundedInteger { .. } | Self::Integer(_) => JsonKind::Integer,
            Self::Decimal | Self::Float => JsonKind::Number,
            Self::Binary(..) | Self::Enumeration(_) | Self::String(_) => JsonKind::String,
        }
    }

    // ========================================================================
    // Encode
    // ========================================================================

    /// Encodes the lexical value `text`. `qname` selects the local value
    /// partition of the string table.
    pub fn encode(
        &self,
        writer: &mut BitWriter,
        table: &mut StringTable,
        qname: &QName,
        text: &str,
    ) -> Result<()> {
        match self {
            Self::Boolean => boolean::encode(writer, boolean::parse_lexical(text)?),
            Self::Unsigned(b) => {
                let value = parse_integer(text)?;
                b.check(value, text)?;
                let value = u64::try_from(value).map_err(|_| {
                    Error::InvalidValue(format!("'{text}' does not fit an unsigned integer"))
                })?;
                unsigned_integer::encode(writer, value);
            }
            Self::BoundedInteger { min, max } => {
                let value = parse_integer(text)?;
                let value = i64::try_from(value)
                    .map_err(|_| Error::InvalidValue(format!("'{text}' is out of range")))?;
                integer::encode_bounded(writer, value, *min, *max)?;
            }
            Self::Integer(b) => {
                let value = parse_integer(text)?;
                b.check(value, text)?;
                let value = i64::try_from(value).map_err(|_| {
                    Error::InvalidValue(format!("'{text}' does not fit a 64-bit integer"))
                })?;
                integer::encode(writer, value);
            }
            Self::Decimal => decimal::encode(writer, Decimal::parse(text)?),
            Self::Float => float::encode(writer, Float::parse(text)?)?,
            Self::Binary(format, lengths) => {
                let bytes = match format {
                    BinaryFormat::Hex => binary::parse_hex(text)?,
                    BinaryFormat::Base64 => binary::parse_base64(text)?,
                };
                lengths.check(bytes.len(), "binary value")?;
                binary::encode(writer, &bytes);
            }
            Self::Enumeration(values) => enumeration::encode(writer, text, values)?,
            Self::String(lengths) => {
                lengths.check(text.chars().count(), "string")?;
                table.encode_value(writer, qname, text);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Decode
    // ========================================================================

    /// Decodes one value and returns its canonical lexical form.
    pub fn decode(
        &self,
        reader: &mut BitReader,
        table: &mut StringTable,
        qname: &QName,
        options: &CodecOptions,
    ) -> Result<String> {
        // Werte ausserhalb der Facetten sind Bitmuster, die kein Encoder erzeugt
        let out_of_type = |_: Error| Error::DecodedValueOutOfType(qname.to_string());
        let text = match self {
            Self::Boolean => boolean::to_lexical(boolean::decode(reader)?).to_string(),
            Self::Unsigned(b) => {
                let value = unsigned_integer::decode(reader)?;
                let text = value.to_string();
                b.check(i128::from(value), &text).map_err(out_of_type)?;
                text
            }
            Self::BoundedInteger { min, max } => {
                integer::decode_bounded(reader, *min, *max)?.to_string()
            }
            Self::Integer(b) => {
                let value = integer::decode(reader)?;
                let text = value.to_string();
                b.check(i128::from(value), &text).map_err(out_of_type)?;
                text
            }
            Self::Decimal => decimal::decode(reader)?.to_string(),
            Self::Float => float::decode(reader)?.to_string(),
            Self::Binary(format, lengths) => {
                let bytes = binary::decode(reader, options.max_value_length)?;
                lengths.check(bytes.len(), "binary value").map_err(out_of_type)?;
                match format {
                    BinaryFormat::Hex => binary::to_hex(&bytes, options.hex_upper()),
                    BinaryFormat::Base64 => binary::to_base64(&bytes),
                }
            }
            Self::Enumeration(values) => enumeration::decode(reader, values)?.to_string(),
            Self::String(lengths) => {
                let text = table.decode_value(reader, qname, options.max_value_length)?;
                lengths.check(text.chars().count(), "string").map_err(out_of_type)?;
                text
            }
        };
        Ok(text)
    }

    /// Canonical text of a decimal or float lexical value, `None` for other
    /// codecs and for text they reject.
    pub fn canonical_number(&self, text: &str) -> Option<String> {
        match self {
            Self::Decimal => Decimal::parse(text).ok().map(|d| d.to_string()),
            Self::Float => Float::parse(text).ok().map(|f| f.to_string()),
            _ => None,
        }
    }
}

fn parse_integer(text: &str) -> Result<i128> {
    text.trim()
        .parse::<i128>()
        .map_err(|_| Error::InvalidValue(format!("'{text}' is not an integer")))
}
