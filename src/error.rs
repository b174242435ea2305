//! Central error type.
//!
//! Every variant belongs to exactly one [`ErrorKind`]. The kind decides the
//! numeric status reported by the [`crate::api`] facade, and lets callers tell
//! corrupt input ([`ErrorKind::Decode`]) apart from library bugs
//! ([`ErrorKind::Internal`]).

use core::fmt;
use std::borrow::Cow;

/// Error classes visible at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Initialization,
    /// Reserved status; `shutdown` is idempotent and never reports it.
    Shutdown,
    InvalidArgument,
    Encode,
    Decode,
    Schema,
    OutOfMemory,
    Internal,
}

impl ErrorKind {
    /// Status code of the boundary API (`0` is success).
    pub fn status_code(self) -> i32 {
        match self {
            Self::Initialization => 1,
            Self::Shutdown => 2,
            Self::InvalidArgument => 3,
            Self::Encode => 4,
            Self::Decode => 5,
            Self::Schema => 6,
            Self::OutOfMemory => 7,
            Self::Internal => 254,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialization => "initialization",
            Self::Shutdown => "shutdown",
            Self::InvalidArgument => "invalid argument",
            Self::Encode => "encode",
            Self::Decode => "decode",
            Self::Schema => "schema",
            Self::OutOfMemory => "out of memory",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // --- Lifecycle ---
    /// An operation was called before `initialize`.
    NotInitialized,

    // --- Arguments and options ---
    /// The integer is not a known message type.
    UnknownMessageType(i32),
    /// The message type is known but no registered schema declares its element.
    MessageTypeNotRegistered(&'static str),
    UnknownOption(String),
    InvalidOptionValue { name: String, value: String },
    InvalidArgument(String),

    // --- Schema ---
    /// A schema path is missing, unreadable or not an `.xsd` file.
    SchemaPath { path: String, reason: String },
    XsdParseError(String),
    /// A type, element, group or attribute reference has no definition.
    UndefinedReference { kind: &'static str, name: String },
    /// A content model cannot be decided with one name of lookahead.
    AmbiguousContentModel(String),
    /// Encode or decode was requested before any schema was registered.
    NoSchemaRegistered,

    // --- Encode ---
    XmlParseError(String),
    JsonParseError(String),
    /// The document root is not a global element of the registered schemas.
    UnknownRootElement(String),
    UnexpectedElement { expected: String, found: String },
    MissingContent { element: String, expected: String },
    UnexpectedAttribute { element: String, attribute: String },
    MissingAttribute { element: String, attribute: String },
    /// Character data where the content model allows only elements.
    UnexpectedText { element: String },
    /// `xsi:nil` or JSON `null` on an element that is not nillable.
    NotNillable(String),
    /// A lexical value does not fit its datatype.
    InvalidValue(String),
    /// The input tree does not have the shape its schema type requires.
    SchemaViolation(String),
    NestingTooDeep(usize),

    // --- Decode ---
    MalformedHeader(Cow<'static, str>),
    /// The EXI distinguishing bits are not `10`.
    InvalidDistinguishingBits(u8),
    UnsupportedVersion,
    /// The stream ended before a complete structure was decoded.
    PrematureEndOfStream,
    /// A decoded code does not select any alternative of the grammar.
    InvalidEventCode { code: u64, context: Cow<'static, str> },
    InvalidEnumerationIndex { index: usize, enum_count: usize },
    /// A string-table reference points to no entry.
    InvalidCompactId(usize),
    /// Surrogate (U+D800..U+DFFF) or a value above U+10FFFF.
    InvalidCodePoint(u64),
    IntegerOverflow,
    FloatOutOfRange,
    ValueLengthExceeded { length: u64, max: usize },
    /// The stream's root element is not the one the caller asked for.
    RootMismatch { expected: String, found: String },
    /// Non-zero bits after the end of the document.
    TrailingData,
    StreamTooDeep(usize),
    /// A decoded value lies outside the facets of its type.
    DecodedValueOutOfType(String),
    /// The stream expands to more elements than its size permits.
    ElementLimitExceeded(usize),

    // --- Resources ---
    OutOfMemory(usize),
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized => ErrorKind::Initialization,
            Self::UnknownMessageType(_)
            | Self::MessageTypeNotRegistered(_)
            | Self::UnknownOption(_)
            | Self::InvalidOptionValue { .. }
            | Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::SchemaPath { .. }
            | Self::XsdParseError(_)
            | Self::UndefinedReference { .. }
            | Self::AmbiguousContentModel(_)
            | Self::NoSchemaRegistered => ErrorKind::Schema,
            Self::XmlParseError(_)
            | Self::JsonParseError(_)
            | Self::UnknownRootElement(_)
            | Self::UnexpectedElement { .. }
            | Self::MissingContent { .. }
            | Self::UnexpectedAttribute { .. }
            | Self::MissingAttribute { .. }
            | Self::UnexpectedText { .. }
            | Self::NotNillable(_)
            | Self::InvalidValue(_)
            | Self::SchemaViolation(_)
            | Self::NestingTooDeep(_) => ErrorKind::Encode,
            Self::MalformedHeader(_)
            | Self::InvalidDistinguishingBits(_)
            | Self::UnsupportedVersion
            | Self::PrematureEndOfStream
            | Self::InvalidEventCode { .. }
            | Self::InvalidEnumerationIndex { .. }
            | Self::InvalidCompactId(_)
            | Self::InvalidCodePoint(_)
            | Self::IntegerOverflow
            | Self::FloatOutOfRange
            | Self::ValueLengthExceeded { .. }
            | Self::RootMismatch { .. }
            | Self::TrailingData
            | Self::StreamTooDeep(_)
            | Self::DecodedValueOutOfType(_)
            | Self::ElementLimitExceeded(_) => ErrorKind::Decode,
            Self::OutOfMemory(_) => ErrorKind::OutOfMemory,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn invalid_event_code(code: u64, context: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidEventCode { code, context: context.into() }
    }

    pub fn unexpected_element(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedElement { expected: expected.into(), found: found.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "runtime not initialized"),
            Self::UnknownMessageType(id) => write!(f, "unknown message type {id}"),
            Self::MessageTypeNotRegistered(name) => {
                write!(f, "no registered schema declares message element '{name}'")
            }
            Self::UnknownOption(name) => write!(f, "unknown option '{name}'"),
            Self::InvalidOptionValue { name, value } => {
                write!(f, "invalid value '{value}' for option '{name}'")
            }
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::SchemaPath { path, reason } => write!(f, "schema path '{path}': {reason}"),
            Self::XsdParseError(msg) => write!(f, "XSD parse error: {msg}"),
            Self::UndefinedReference { kind, name } => write!(f, "undefined {kind} '{name}'"),
            Self::AmbiguousContentModel(msg) => write!(f, "ambiguous content model: {msg}"),
            Self::NoSchemaRegistered => write!(f, "no schema registered"),
            Self::XmlParseError(msg) => write!(f, "XML parse error: {msg}"),
            Self::JsonParseError(msg) => write!(f, "JSON parse error: {msg}"),
            Self::UnknownRootElement(name) => {
                write!(f, "'{name}' is not a global element of the registered schemas")
            }
            Self::UnexpectedElement { expected, found } => {
                write!(f, "schema mismatch: expected {expected}, found '{found}'")
            }
            Self::MissingContent { element, expected } => {
                write!(f, "missing required content in '{element}': expected {expected}")
            }
            Self::UnexpectedAttribute { element, attribute } => {
                write!(f, "attribute '{attribute}' is not allowed on '{element}'")
            }
            Self::MissingAttribute { element, attribute } => {
                write!(f, "required attribute '{attribute}' missing on '{element}'")
            }
            Self::UnexpectedText { element } => {
                write!(f, "character data not allowed in element-only content of '{element}'")
            }
            Self::NotNillable(name) => write!(f, "element '{name}' is not nillable"),
            Self::InvalidValue(msg) => write!(f, "invalid typed value: {msg}"),
            Self::SchemaViolation(msg) => write!(f, "schema violation: {msg}"),
            Self::NestingTooDeep(limit) => write!(f, "input nesting exceeds {limit} levels"),
            Self::MalformedHeader(msg) => write!(f, "malformed EXI header: {msg}"),
            Self::InvalidDistinguishingBits(bits) => {
                write!(f, "invalid distinguishing bits {bits:02b}, expected 10")
            }
            Self::UnsupportedVersion => write!(f, "unsupported EXI version"),
            Self::PrematureEndOfStream => write!(f, "premature end of EXI stream"),
            Self::InvalidEventCode { code, context } => {
                write!(f, "invalid event code {code} in {context}")
            }
            Self::InvalidEnumerationIndex { index, enum_count } => {
                write!(f, "enumeration index {index} exceeds valid range 0..{enum_count}")
            }
            Self::InvalidCompactId(id) => write!(f, "invalid string table compact identifier {id}"),
            Self::InvalidCodePoint(cp) => write!(f, "invalid Unicode code point U+{cp:X}"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::FloatOutOfRange => write!(f, "float exponent out of range"),
            Self::ValueLengthExceeded { length, max } => {
                write!(f, "value length {length} exceeds maximum {max}")
            }
            Self::RootMismatch { expected, found } => {
                write!(f, "stream root is '{found}', expected '{expected}'")
            }
            Self::TrailingData => write!(f, "unexpected data after end of document"),
            Self::StreamTooDeep(limit) => write!(f, "stream nesting exceeds {limit} levels"),
            Self::DecodedValueOutOfType(name) => {
                write!(f, "decoded value of '{name}' lies outside its type")
            }
            Self::ElementLimitExceeded(limit) => {
                write!(f, "stream expands to more than {limit} elements")
            }
            Self::OutOfMemory(bytes) => write!(f, "allocation of {bytes} bytes failed"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_decode_class() {
        assert_eq!(Error::PrematureEndOfStream.kind(), ErrorKind::Decode);
        assert_eq!(Error::invalid_event_code(7, "choice").kind(), ErrorKind::Decode);
        assert_eq!(Error::TrailingData.kind().status_code(), 5);
    }

    #[test]
    fn status_codes() {
        let table = [
            (Error::NotInitialized, 1),
            (Error::UnknownOption("x".into()), 3),
            (Error::XmlParseError("x".into()), 4),
            (Error::IntegerOverflow, 5),
            (Error::NoSchemaRegistered, 6),
            (Error::OutOfMemory(16), 7),
            (Error::Internal("x".into()), 254),
        ];
        for (err, code) in table {
            assert_eq!(err.kind().status_code(), code, "{err}");
        }
    }

    #[test]
    fn display_names_context() {
        let e = Error::unexpected_element("'Header'", "Body");
        assert_eq!(e.to_string(), "schema mismatch: expected 'Header', found 'Body'");
        let e = Error::UnknownMessageType(6);
        assert!(e.to_string().contains('6'));
        assert_eq!(ErrorKind::OutOfMemory.to_string(), "out of memory");
    }
}
