//! XML text → [`Element`] tree.
//!
//! Uses quick-xml's `NsReader` for namespace resolution. Namespace
//! declarations and `xsi:schemaLocation` hints are consumed here and never
//! reach the encoder; `xsi:nil` becomes [`Element::nil`]. Comments,
//! processing instructions and the DOCTYPE are dropped. Whitespace-only text
//! next to child elements is insignificant and removed.

use std::borrow::Cow;

use memchr::memchr;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::name::{QName as XmlQName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::event::Event;
use crate::infoset::{Element, TreeBuilder};
use crate::qname::{QName, XSI_NS};
use crate::{Error, Result};

/// Parses a complete XML document.
pub fn parse_document(text: &str) -> Result<Element> {
    let mut reader = NsReader::from_reader(text.as_bytes());
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut builder = TreeBuilder::new();
    let mut pending_text: Option<String> = None;
    let mut depth = 0usize;
    let mut seen_root = false;

    builder.push(Event::StartDocument)?;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) => {
                flush_text(&mut pending_text, &mut builder)?;
                check_single_root(depth, seen_root)?;
                start_element(&reader, &e, &mut builder)?;
                depth += 1;
                seen_root = true;
            }
            Ok(XmlEvent::Empty(e)) => {
                flush_text(&mut pending_text, &mut builder)?;
                check_single_root(depth, seen_root)?;
                start_element(&reader, &e, &mut builder)?;
                builder.push(Event::EndElement)?;
                seen_root = true;
            }
            Ok(XmlEvent::End(_)) => {
                flush_text(&mut pending_text, &mut builder)?;
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::XmlParseError("end tag without start tag".into()))?;
                builder.push(Event::EndElement)?;
            }
            Ok(XmlEvent::Text(e)) => {
                let raw = utf8(&e)?;
                let value = quick_xml::escape::unescape(raw)
                    .map_err(|er| Error::XmlParseError(er.to_string()))?;
                add_text(&mut pending_text, &normalize_line_endings(&value), depth)?;
            }
            Ok(XmlEvent::CData(e)) => {
                let raw = utf8(&e)?;
                add_text(&mut pending_text, &normalize_line_endings(raw), depth)?;
            }
            Ok(XmlEvent::GeneralRef(e)) => {
                let name = utf8(&e)?;
                let resolved = resolve_reference(name).ok_or_else(|| {
                    Error::XmlParseError(format!("undefined entity reference '&{name};'"))
                })?;
                add_text(&mut pending_text, &resolved, depth)?;
            }
            Ok(XmlEvent::Comment(_) | XmlEvent::PI(_) | XmlEvent::DocType(_) | XmlEvent::Decl(_)) => {}
            Ok(XmlEvent::Eof) => break,
            Err(e) => {
                return Err(Error::XmlParseError(format!(
                    "at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(Error::XmlParseError(format!("{depth} element(s) not closed at end of input")));
    }
    if !seen_root {
        return Err(Error::XmlParseError("no document element".into()));
    }
    builder.push(Event::EndDocument)?;
    let mut root = builder.finish()?;
    root.strip_insignificant_whitespace();
    Ok(root)
}

fn check_single_root(depth: usize, seen_root: bool) -> Result<()> {
    if depth == 0 && seen_root {
        return Err(Error::XmlParseError("more than one document element".into()));
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::XmlParseError(e.to_string()))
}

fn add_text(pending: &mut Option<String>, value: &str, depth: usize) -> Result<()> {
    if depth == 0 {
        if !value.trim().is_empty() {
            return Err(Error::XmlParseError("character data outside the document element".into()));
        }
        return Ok(());
    }
    match pending {
        Some(existing) => existing.push_str(value),
        None => *pending = Some(value.to_string()),
    }
    Ok(())
}

fn flush_text(pending: &mut Option<String>, builder: &mut TreeBuilder) -> Result<()> {
    if let Some(text) = pending.take() {
        builder.push(Event::Characters(text))?;
    }
    Ok(())
}

fn start_element(
    reader: &NsReader<&[u8]>,
    e: &BytesStart<'_>,
    builder: &mut TreeBuilder,
) -> Result<()> {
    let (ns, local) = reader.resolver().resolve_element(e.name());
    let name = QName::new(resolve_uri(ns, e.name())?, utf8(local.as_ref())?);
    builder.push(Event::StartElement(name))?;

    let mut attributes = Vec::new();
    let mut nil = false;
    for attr in e.attributes() {
        let attr = attr.map_err(|er| Error::XmlParseError(er.to_string()))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (ns, local) = reader.resolver().resolve_attribute(attr.key);
        let qname = QName::new(resolve_uri(ns, attr.key)?, utf8(local.as_ref())?);
        let raw = utf8(attr.value.as_ref())?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|er| Error::XmlParseError(er.to_string()))?;
        let value = normalize_line_endings(&value).into_owned();

        if &*qname.uri == XSI_NS {
            match &*qname.local_name {
                "nil" => {
                    nil = matches!(value.trim(), "true" | "1");
                    continue;
                }
                "schemaLocation" | "noNamespaceSchemaLocation" => continue,
                _ => {}
            }
        }
        attributes.push((qname, value));
    }

    // Reihenfolge wie in der Grammatik: (local name, URI)
    attributes.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (qname, value) in attributes {
        builder.push(Event::Attribute(qname, value))?;
    }
    if nil {
        builder.push(Event::Nil)?;
    }
    Ok(())
}

fn resolve_uri(ns: ResolveResult<'_>, name: XmlQName<'_>) -> Result<String> {
    match ns {
        ResolveResult::Bound(uri) => Ok(utf8(uri.as_ref())?.to_string()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(prefix) => Err(Error::XmlParseError(format!(
            "unbound namespace prefix '{}' in '{}'",
            String::from_utf8_lossy(&prefix),
            String::from_utf8_lossy(name.as_ref())
        ))),
    }
}

/// Predefined entity or character reference (`amp`, `#10`, `#x41`).
fn resolve_reference(name: &str) -> Option<Cow<'static, str>> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(|c| Cow::Owned(c.to_string()));
    }
    resolve_predefined_entity(name).map(Cow::Borrowed)
}

/// XML 1.0 Sec. 2.11: \r\n -> \n, alleinstehende \r -> \n
fn normalize_line_endings(s: &str) -> Cow<'_, str> {
    if memchr(b'\r', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace("\r\n", "\n").replace('\r', "\n"))
}
