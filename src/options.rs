//! Runtime options.
//!
//! Options are a closed set of tagged variants. The string-keyed form used by
//! the boundary API (`set_option("pretty-xml", "true")`) is parsed into a
//! [`RuntimeOption`] first, so unknown names fail before anything changes.
//!
//! None of the options changes the EXI wire format: encoding the same input
//! with any option combination yields the same bytes.
//!
//! # Beispiel
//!
//! ```
//! use v2gcodec::options::{CodecOptions, HexCase, RuntimeOption};
//!
//! let mut opts = CodecOptions::default();
//! opts.apply(&RuntimeOption::parse("hex-case", "lower").unwrap());
//! opts.apply(&RuntimeOption::parse("max-value-length", "1024").unwrap());
//!
//! assert_eq!(opts.hex_case, HexCase::Lower);
//! assert_eq!(opts.max_value_length, Some(1024));
//! assert!(RuntimeOption::parse("compression", "true").is_err());
//! ```

use std::str::FromStr;

use log::LevelFilter;

use crate::{Error, Result, boolean};

/// Letter case of decoded `xs:hexBinary` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HexCase {
    /// Canonical `xs:hexBinary` form.
    #[default]
    Upper,
    Lower,
}

/// Settings consulted while encoding and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecOptions {
    /// Indent `decode_exi` output.
    pub pretty_xml: bool,
    /// Prepend `<?xml version="1.0" encoding="UTF-8"?>` to `decode_exi` output.
    pub xml_declaration: bool,
    /// Longest string or binary value (in characters/bytes) accepted when
    /// decoding. `None` is unbounded.
    pub max_value_length: Option<usize>,
    pub hex_case: HexCase,
}

impl CodecOptions {
    pub fn apply(&mut self, option: &RuntimeOption) {
        match *option {
            RuntimeOption::LogLevel(_) => {}
            RuntimeOption::PrettyXml(v) => self.pretty_xml = v,
            RuntimeOption::XmlDeclaration(v) => self.xml_declaration = v,
            RuntimeOption::MaxValueLength(v) => self.max_value_length = v,
            RuntimeOption::HexCase(v) => self.hex_case = v,
        }
    }

    pub fn with_pretty_xml(mut self, pretty: bool) -> Self {
        self.pretty_xml = pretty;
        self
    }

    pub fn with_xml_declaration(mut self, declaration: bool) -> Self {
        self.xml_declaration = declaration;
        self
    }

    pub fn with_max_value_length(mut self, max: usize) -> Self {
        self.max_value_length = Some(max);
        self
    }

    pub fn with_hex_case(mut self, case: HexCase) -> Self {
        self.hex_case = case;
        self
    }

    pub fn hex_upper(&self) -> bool {
        self.hex_case == HexCase::Upper
    }
}

/// One option setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeOption {
    /// `log-level`: maximum level passed to the `log` facade.
    LogLevel(LevelFilter),
    /// `pretty-xml`
    PrettyXml(bool),
    /// `xml-declaration`
    XmlDeclaration(bool),
    /// `max-value-length`: a number or `unbounded`.
    MaxValueLength(Option<usize>),
    /// `hex-case`: `upper` or `lower`.
    HexCase(HexCase),
}

impl RuntimeOption {
    /// All option names accepted by [`parse`](Self::parse).
    pub const NAMES: [&'static str; 5] =
        ["log-level", "pretty-xml", "xml-declaration", "max-value-length", "hex-case"];

    /// Parses a string-keyed option. Names are matched exactly, values
    /// case-insensitively.
    pub fn parse(name: &str, value: &str) -> Result<Self> {
        let invalid = || Error::InvalidOptionValue { name: name.to_string(), value: value.to_string() };
        let v = value.trim();
        match name {
            "log-level" => LevelFilter::from_str(v).map(Self::LogLevel).map_err(|_| invalid()),
            "pretty-xml" => parse_flag(v).map(Self::PrettyXml).ok_or_else(invalid),
            "xml-declaration" => parse_flag(v).map(Self::XmlDeclaration).ok_or_else(invalid),
            "max-value-length" => {
                if v.eq_ignore_ascii_case("unbounded") {
                    Ok(Self::MaxValueLength(None))
                } else {
                    v.parse().map(|n| Self::MaxValueLength(Some(n))).map_err(|_| invalid())
                }
            }
            "hex-case" => match v.to_ascii_lowercase().as_str() {
                "upper" => Ok(Self::HexCase(HexCase::Upper)),
                "lower" => Ok(Self::HexCase(HexCase::Lower)),
                _ => Err(invalid()),
            },
            _ => Err(Error::UnknownOption(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LogLevel(_) => "log-level",
            Self::PrettyXml(_) => "pretty-xml",
            Self::XmlDeclaration(_) => "xml-declaration",
            Self::MaxValueLength(_) => "max-value-length",
            Self::HexCase(_) => "hex-case",
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    boolean::parse_lexical(&value.to_ascii_lowercase()).ok()
}
