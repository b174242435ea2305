//! v2gcodec – schema-informed EXI codec for ISO 15118-20 CommonMessages
//!
//! Converts XML documents, or JSON objects for a fixed set of message types,
//! into EXI streams and back. Grammars are compiled from the registered XSD
//! files at registration and cached per schema fingerprint.
//!
//! # Beispiel
//!
//! ```no_run
//! use v2gcodec::{MessageType, Runtime};
//!
//! let runtime = Runtime::new();
//! runtime.initialize()?;
//! runtime.register_schemas(&["schemas/V2G_CI_CommonMessages.xsd"])?;
//!
//! let json = br#"{"EVCCID":"1122334455","Timestamp":12345}"#;
//! let exi = runtime.encode_struct(MessageType::SessionSetupReq, json)?;
//! let back = runtime.decode_struct(MessageType::SessionSetupReq, &exi)?;
//! assert_eq!(back, json);
//! # Ok::<(), v2gcodec::Error>(())
//! ```

pub mod api;
pub mod binary;
pub mod bit_width;
pub mod bitstream;
pub mod boolean;
pub mod bridge;
pub mod decimal;
pub mod decoder;
pub mod encoder;
pub mod enumeration;
pub mod error;
pub mod event;
pub mod float;
pub mod grammar;
pub mod header;
pub mod infoset;
pub mod integer;
pub mod message;
pub mod n_bit_unsigned_integer;
pub mod options;
pub mod qname;
pub mod runtime;
pub mod schema;
pub mod string;
pub mod string_table;
pub mod typed_value;
pub mod unsigned_integer;
pub mod xml;
pub mod xml_serializer;
pub mod xsd;

pub use error::{Error, ErrorKind, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent — für interne Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// HashSet mit ahash.
pub(crate) type FastHashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

// Public API: Runtime
pub use options::{CodecOptions, HexCase, RuntimeOption};
pub use runtime::{Runtime, version};

// Public API: Messages
pub use message::{COMMON_MESSAGES_NS, MessageType};

// Public API: Types
pub use event::Event;
pub use grammar::GrammarSet;
pub use infoset::{Attribute, Element, Node};
pub use qname::QName;
pub use schema::SchemaModel;

// Public API: Encoder/Decoder
pub use decoder::decode;
pub use encoder::encode;

// Public API: XSD/XML
pub use xml::parse_document;
pub use xml_serializer::to_xml;
pub use xsd::{load_schema_paths, parse_xsd};
