//! Structural events of a document.
//!
//! The decoder produces them while walking the grammar and feeds them into a
//! [`TreeBuilder`](crate::infoset::TreeBuilder); the encoder logs them at
//! trace level. Events are transient and never stored.

use std::fmt;

use crate::qname::QName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StartDocument,
    EndDocument,
    StartElement(QName),
    EndElement,
    Attribute(QName, String),
    Characters(String),
    /// `xsi:nil="true"` on the current element.
    Nil,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartDocument => f.write_str("SD"),
            Self::EndDocument => f.write_str("ED"),
            Self::StartElement(name) => write!(f, "SE({name})"),
            Self::EndElement => f.write_str("EE"),
            Self::Attribute(name, value) => write!(f, "AT({name}={value:?})"),
            Self::Characters(text) => write!(f, "CH({text:?})"),
            Self::Nil => f.write_str("AT(xsi:nil=true)"),
        }
    }
}
