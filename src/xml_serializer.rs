//! [`Element`] tree → XML text.
//!
//! Element namespaces are written as default-namespace declarations where the
//! namespace changes, so unprefixed names are the common case. Namespaced
//! attributes get generated prefixes (`xsi` for the schema-instance
//! namespace, `ns1`, `ns2`, ... otherwise) declared on the element itself.

use crate::infoset::{Element, Node};
use crate::options::CodecOptions;
use crate::qname::{XML_NS, XSI_NS};

const INDENT: &str = "  ";

/// Serializes `root` as a document.
pub fn to_xml(root: &Element, options: &CodecOptions) -> String {
    let mut out = String::with_capacity(256);
    if options.xml_declaration {
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        if options.pretty_xml {
            out.push('\n');
        }
    }
    let mut ser = Serializer { out, pretty: options.pretty_xml };
    ser.element(root, "", 0);
    if ser.pretty {
        ser.out.push('\n');
    }
    ser.out
}

struct Serializer {
    out: String,
    pretty: bool,
}

impl Serializer {
    fn element(&mut self, e: &Element, default_ns: &str, depth: usize) {
        self.out.push('<');
        self.out.push_str(&e.name.local_name);
        if &*e.name.uri != default_ns {
            self.out.push_str(" xmlns=\"");
            write_escaped_attr(&mut self.out, &e.name.uri);
            self.out.push('"');
        }

        let mut prefixes: Vec<(&str, String)> = Vec::new();
        let needs_xsi = e.nil || e.attributes.iter().any(|a| &*a.name.uri == XSI_NS);
        if needs_xsi {
            prefixes.push((XSI_NS, "xsi".to_string()));
            self.out.push_str(" xmlns:xsi=\"");
            self.out.push_str(XSI_NS);
            self.out.push('"');
        }
        for attr in &e.attributes {
            let uri = &*attr.name.uri;
            if uri.is_empty() || uri == XML_NS || prefixes.iter().any(|(u, _)| *u == uri) {
                continue;
            }
            let prefix = format!("ns{}", prefixes.len() + 1);
            self.out.push_str(" xmlns:");
            self.out.push_str(&prefix);
            self.out.push_str("=\"");
            write_escaped_attr(&mut self.out, uri);
            self.out.push('"');
            prefixes.push((uri, prefix));
        }
        for attr in &e.attributes {
            self.out.push(' ');
            let uri = &*attr.name.uri;
            if uri == XML_NS {
                self.out.push_str("xml:");
            } else if let Some((_, prefix)) = prefixes.iter().find(|(u, _)| *u == uri) {
                self.out.push_str(prefix);
                self.out.push(':');
            }
            self.out.push_str(&attr.name.local_name);
            self.out.push_str("=\"");
            write_escaped_attr(&mut self.out, &attr.value);
            self.out.push('"');
        }
        if e.nil {
            self.out.push_str(" xsi:nil=\"true\"");
        }

        if e.children.is_empty() {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');

        let has_text = e.children.iter().any(|c| matches!(c, Node::Text(_)));
        let indent_children = self.pretty && !has_text;
        for child in &e.children {
            match child {
                Node::Text(text) => write_escaped_text(&mut self.out, text),
                Node::Element(c) => {
                    if indent_children {
                        self.newline(depth + 1);
                    }
                    self.element(c, &e.name.uri, depth + 1);
                }
            }
        }
        if indent_children {
            self.newline(depth);
        }
        self.out.push_str("</");
        self.out.push_str(&e.name.local_name);
        self.out.push('>');
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
    }
}

/// Ersetzt drei Zeichen per memchr3; Bloecke ohne Escape-Zeichen am Stueck.
fn write_escaped(out: &mut String, s: &str, needle: [u8; 3], replacement: [&str; 3]) {
    let bytes = s.as_bytes();
    let mut start = 0;
    while let Some(offset) = memchr::memchr3(needle[0], needle[1], needle[2], &bytes[start..]) {
        let pos = start + offset;
        out.push_str(&s[start..pos]);
        let idx = if bytes[pos] == needle[0] {
            0
        } else if bytes[pos] == needle[1] {
            1
        } else {
            2
        };
        out.push_str(replacement[idx]);
        start = pos + 1;
    }
    out.push_str(&s[start..]);
}

/// `& < >` in text content.
fn write_escaped_text(out: &mut String, s: &str) {
    write_escaped(out, s, [b'&', b'<', b'>'], ["&amp;", "&lt;", "&gt;"]);
}

/// `& < "` in attribute values; line breaks and tabs as character
/// references so they survive attribute value normalization.
fn write_escaped_attr(out: &mut String, s: &str) {
    if !s.bytes().any(|b| matches!(b, b'\n' | b'\r' | b'\t')) {
        write_escaped(out, s, [b'&', b'<', b'"'], ["&amp;", "&lt;", "&quot;"]);
        return;
    }
    let mut escaped = String::with_capacity(s.len() + 8);
    write_escaped(&mut escaped, s, [b'&', b'<', b'"'], ["&amp;", "&lt;", "&quot;"]);
    out.push_str(
        &escaped
            .replace('\n', "&#10;")
            .replace('\r', "&#13;")
            .replace('\t', "&#9;"),
    );
}
