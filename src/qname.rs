//! Qualified names (namespace URI + local name).
//!
//! Prefixes are not part of the identity and are not preserved: the XML
//! serializer assigns its own. Ordering is by local name first, then URI,
//! which is the order EXI uses for sorted productions (EXI 8.5.4.1.3).

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// XML namespace (`xml:` prefix).
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
/// XML Schema instance namespace (`xsi:nil`, `xsi:type`).
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// XML Schema namespace.
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";
/// Namespace declarations.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub uri: Arc<str>,
    pub local_name: Arc<str>,
}

impl QName {
    pub fn new(uri: impl Into<Arc<str>>, local_name: impl Into<Arc<str>>) -> Self {
        Self { uri: uri.into(), local_name: local_name.into() }
    }

    /// Parses Clark notation: `{uri}local` or a bare `local`.
    pub fn from_clark(text: &str) -> Option<Self> {
        match text.strip_prefix('{') {
            Some(rest) => {
                let (uri, local) = rest.split_once('}')?;
                (!local.is_empty()).then(|| Self::new(uri, local))
            }
            None => (!text.is_empty()).then(|| Self::new("", text)),
        }
    }

    /// Clark notation, or the bare local name when the URI is empty.
    pub fn to_clark(&self) -> String {
        self.to_string()
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.local_name
            .cmp(&other.local_name)
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uri.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.uri, self.local_name)
        }
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QName({self})")
    }
}
