//! Schema-informed encoder: [`Element`] tree → EXI stream.
//!
//! Walks the tree depth-first against the compiled grammar. Every decision
//! (presence bit, "more" bit, count prefix, choice index) is taken from the
//! name of the next child element, so the encoder never backtracks. A child,
//! attribute or text that the grammar has no place for fails with an
//! Encode-class error and no output.
//!
//! # Beispiel
//!
//! ```
//! use v2gcodec::{Element, QName, encode, grammar, parse_xsd};
//!
//! let model = parse_xsd(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!     <xs:element name="Ping" type="xs:boolean"/></xs:schema>"#).unwrap();
//! let grammars = grammar::compile(&model).unwrap();
//!
//! let ping = Element::new(QName::new("", "Ping")).with_text("true");
//! // Header 0x80, 0-bit root code, one bit for the boolean
//! assert_eq!(encode(&grammars, &ping).unwrap(), vec![0x80, 0x80]);
//! ```

use crate::bitstream::BitWriter;
use crate::event::Event;
use crate::grammar::{Content, ElementGrammar, GrammarSet, Occurs, Rule, RuleKind, TypeGrammar};
use crate::infoset::{Element, Node, is_xml_whitespace};
use crate::qname::QName;
use crate::string_table::StringTable;
use crate::{Error, Result, bit_width, header, n_bit_unsigned_integer, unsigned_integer};

/// Deepest element nesting accepted on either side.
pub const MAX_DEPTH: usize = 256;

/// Item codes of the self-describing wildcard encoding.
pub(crate) const GENERIC_END: u64 = 0;
pub(crate) const GENERIC_ELEMENT: u64 = 1;
pub(crate) const GENERIC_TEXT: u64 = 2;
pub(crate) const GENERIC_CODE_BITS: u8 = 2;

/// Encodes `root` as a complete EXI stream.
pub fn encode(grammars: &GrammarSet, root: &Element) -> Result<Vec<u8>> {
    let index = grammars
        .root_index(&root.name)
        .ok_or_else(|| Error::UnknownRootElement(root.name.to_string()))?;
    let grammar = &grammars.roots()[index];

    let mut encoder = Encoder::new(grammars);
    encoder.trace(|| Event::StartDocument);
    header::write(&mut encoder.writer);
    n_bit_unsigned_integer::encode(&mut encoder.writer, index as u64, grammars.root_bits());
    encoder.element(grammar, root, 0)?;
    encoder.trace(|| Event::EndDocument);

    let bytes = encoder.writer.into_vec();
    log::debug!("encoded '{}' into {} bytes", root.name, bytes.len());
    Ok(bytes)
}

struct Encoder<'g> {
    grammars: &'g GrammarSet,
    writer: BitWriter,
    table: StringTable,
    trace: bool,
}

impl<'g> Encoder<'g> {
    fn new(grammars: &'g GrammarSet) -> Self {
        Self {
            grammars,
            writer: BitWriter::with_capacity(64),
            table: StringTable::new(),
            trace: log::log_enabled!(log::Level::Trace),
        }
    }

    #[inline]
    fn trace(&self, event: impl FnOnce() -> Event) {
        if self.trace {
            log::trace!("encode {} at bit {}", event(), self.writer.bit_position());
        }
    }

    // ========================================================================
    // Elements
    // ========================================================================

    fn element(&mut self, grammar: &ElementGrammar, e: &Element, depth: usize) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(Error::NestingTooDeep(depth));
        }
        self.trace(|| Event::StartElement(e.name.clone()));
        let ty: &'g TypeGrammar = self.grammars.type_grammar(grammar.type_id);

        if grammar.nillable {
            self.writer.write_bit(e.nil);
        } else if e.nil {
            return Err(Error::NotNillable(e.name.to_string()));
        }

        if let Content::Any = ty.content {
            self.generic_content(e, depth)?;
            self.trace(|| Event::EndElement);
            return Ok(());
        }

        self.attributes(ty, e)?;

        if e.nil {
            if !e.children.is_empty() {
                return Err(Error::SchemaViolation(format!("nil element '{}' has content", e.name)));
            }
            self.trace(|| Event::Nil);
            self.trace(|| Event::EndElement);
            return Ok(());
        }

        match &ty.content {
            Content::Empty => {
                if let Some(child) = e.child_elements().next() {
                    return Err(Error::unexpected_element(
                        format!("end of '{}'", e.name),
                        child.name.to_string(),
                    ));
                }
                check_no_text(e)?;
            }
            Content::Simple(codec) => {
                if let Some(child) = e.child_elements().next() {
                    return Err(Error::unexpected_element(
                        format!("text content of '{}'", e.name),
                        child.name.to_string(),
                    ));
                }
                let text = e.text();
                self.trace(|| Event::Characters(text.clone()));
                codec
                    .encode(&mut self.writer, &mut self.table, &e.name, &text)
                    .map_err(|err| with_context(err, &e.name))?;
            }
            Content::Elements(rule) => {
                check_no_text(e)?;
                let children: Vec<&Element> = e.child_elements().collect();
                let mut pos = 0;
                self.rule(rule, &children, &mut pos, &e.name, depth)?;
                if let Some(extra) = children.get(pos) {
                    return Err(Error::unexpected_element(
                        format!("end of '{}'", e.name),
                        extra.name.to_string(),
                    ));
                }
            }
            Content::Any => {}
        }
        self.trace(|| Event::EndElement);
        Ok(())
    }

    fn attributes(&mut self, ty: &TypeGrammar, e: &Element) -> Result<()> {
        if let Some(extra) = e.attributes.iter().find(|a| ty.attribute(&a.name).is_none()) {
            return Err(Error::UnexpectedAttribute {
                element: e.name.to_string(),
                attribute: extra.name.to_string(),
            });
        }
        for decl in &ty.attributes {
            let value = e.attribute(&decl.name);
            if !decl.required {
                self.writer.write_bit(value.is_some());
            } else if value.is_none() {
                return Err(Error::MissingAttribute {
                    element: e.name.to_string(),
                    attribute: decl.name.to_string(),
                });
            }
            if let Some(value) = value {
                self.trace(|| Event::Attribute(decl.name.clone(), value.to_string()));
                decl.codec
                    .encode(&mut self.writer, &mut self.table, &decl.name, value)
                    .map_err(|err| with_context(err, &decl.name))?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Content rules
    // ========================================================================

    fn rule(
        &mut self,
        rule: &Rule,
        children: &[&Element],
        pos: &mut usize,
        parent: &QName,
        depth: usize,
    ) -> Result<()> {
        let starts = |pos: usize| children.get(pos).is_some_and(|c| rule.starts_with(&c.name));
        match rule.occurs {
            Occurs::Once => self.term(rule, children, pos, parent, depth),
            Occurs::Optional => {
                let present = starts(*pos);
                self.writer.write_bit(present);
                if present {
                    self.term(rule, children, pos, parent, depth)?;
                }
                Ok(())
            }
            Occurs::Unbounded { min } => {
                for _ in 0..min {
                    self.term(rule, children, pos, parent, depth)?;
                }
                loop {
                    let more = starts(*pos);
                    self.writer.write_bit(more);
                    if !more {
                        return Ok(());
                    }
                    let before = *pos;
                    self.term(rule, children, pos, parent, depth)?;
                    if *pos == before {
                        return Err(Error::SchemaViolation(format!(
                            "repeated content of '{parent}' consumed no element"
                        )));
                    }
                }
            }
            Occurs::Counted { min, max } => {
                // Anzahl steht vor den Items: Items erst in einen Scratch-Writer
                let saved = std::mem::replace(&mut self.writer, BitWriter::new());
                let counted = self.counted_items(rule, children, pos, parent, depth, min, max);
                let items = std::mem::replace(&mut self.writer, saved);
                let count = counted?;
                n_bit_unsigned_integer::encode(
                    &mut self.writer,
                    u64::from(count - min),
                    bit_width::for_range(min, max),
                );
                self.writer.append(items);
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn counted_items(
        &mut self,
        rule: &Rule,
        children: &[&Element],
        pos: &mut usize,
        parent: &QName,
        depth: usize,
        min: u32,
        max: u32,
    ) -> Result<u32> {
        let mut count = 0;
        while count < max {
            let starts = children.get(*pos).is_some_and(|c| rule.starts_with(&c.name));
            if count >= min && !starts {
                break;
            }
            let before = *pos;
            self.term(rule, children, pos, parent, depth)?;
            count += 1;
            if count >= min && *pos == before {
                break;
            }
        }
        Ok(count)
    }

    /// One occurrence of `rule`'s term.
    fn term(
        &mut self,
        rule: &Rule,
        children: &[&Element],
        pos: &mut usize,
        parent: &QName,
        depth: usize,
    ) -> Result<()> {
        match &rule.kind {
            RuleKind::Element(grammar) => match children.get(*pos) {
                Some(child) if child.name == grammar.name => {
                    *pos += 1;
                    self.element(grammar, child, depth + 1)
                }
                Some(child) => Err(Error::unexpected_element(
                    format!("'{}'", grammar.name),
                    child.name.to_string(),
                )),
                None => Err(Error::MissingContent {
                    element: parent.to_string(),
                    expected: format!("'{}'", grammar.name),
                }),
            },
            RuleKind::Wildcard(namespaces) => match children.get(*pos) {
                Some(child) if namespaces.matches(&child.name.uri) => {
                    *pos += 1;
                    self.generic_element(child, depth + 1)
                }
                Some(child) => Err(Error::unexpected_element("any element", child.name.to_string())),
                None => Err(Error::MissingContent {
                    element: parent.to_string(),
                    expected: "any element".into(),
                }),
            },
            RuleKind::Sequence(items) => {
                for item in items {
                    self.rule(item, children, pos, parent, depth)?;
                }
                Ok(())
            }
            RuleKind::Choice(branches) => {
                let next = children.get(*pos).map(|c| &c.name);
                let index = select_branch(rule, branches, next).ok_or_else(|| match next {
                    Some(name) => Error::unexpected_element(rule.first().describe(), name.to_string()),
                    None => Error::MissingContent {
                        element: parent.to_string(),
                        expected: rule.first().describe(),
                    },
                })?;
                n_bit_unsigned_integer::encode(
                    &mut self.writer,
                    index as u64,
                    bit_width::for_count(branches.len()),
                );
                self.rule(&branches[index], children, pos, parent, depth)
            }
        }
    }

    // ========================================================================
    // Generic (wildcard) encoding
    // ========================================================================

    fn generic_element(&mut self, e: &Element, depth: usize) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(Error::NestingTooDeep(depth));
        }
        self.trace(|| Event::StartElement(e.name.clone()));
        self.table.encode_qname(&mut self.writer, &e.name);
        self.writer.write_bit(e.nil);
        self.generic_content(e, depth)?;
        self.trace(|| Event::EndElement);
        Ok(())
    }

    /// Attribute count, name/value pairs, then item codes unless nil.
    fn generic_content(&mut self, e: &Element, depth: usize) -> Result<()> {
        unsigned_integer::encode(&mut self.writer, e.attributes.len() as u64);
        for attr in &e.attributes {
            self.trace(|| Event::Attribute(attr.name.clone(), attr.value.clone()));
            self.table.encode_qname(&mut self.writer, &attr.name);
            self.table.encode_value(&mut self.writer, &attr.name, &attr.value);
        }
        if e.nil {
            if !e.children.is_empty() {
                return Err(Error::SchemaViolation(format!("nil element '{}' has content", e.name)));
            }
            self.trace(|| Event::Nil);
            return Ok(());
        }
        for child in &e.children {
            match child {
                Node::Element(c) => {
                    n_bit_unsigned_integer::encode(&mut self.writer, GENERIC_ELEMENT, GENERIC_CODE_BITS);
                    self.generic_element(c, depth + 1)?;
                }
                Node::Text(text) => {
                    self.trace(|| Event::Characters(text.clone()));
                    n_bit_unsigned_integer::encode(&mut self.writer, GENERIC_TEXT, GENERIC_CODE_BITS);
                    self.table.encode_value(&mut self.writer, &e.name, text);
                }
            }
        }
        n_bit_unsigned_integer::encode(&mut self.writer, GENERIC_END, GENERIC_CODE_BITS);
        Ok(())
    }
}

/// Picks the choice branch for the next child `next` (`None` at the end of
/// the parent). Explicit names win over wildcards; a nullable branch takes
/// whatever no other branch claims.
fn select_branch(choice: &Rule, branches: &[Rule], next: Option<&QName>) -> Option<usize> {
    if let Some(name) = next {
        if let Some(i) = branches.iter().position(|b| b.first().contains_name(name)) {
            return Some(i);
        }
        if !choice.follow().contains_name(name)
            && let Some(i) = branches.iter().position(|b| b.first().wildcard_matches(name))
        {
            return Some(i);
        }
    }
    branches.iter().position(Rule::is_nullable)
}

fn check_no_text(e: &Element) -> Result<()> {
    let stray = e.children.iter().any(|c| matches!(c, Node::Text(t) if !is_xml_whitespace(t)));
    if stray {
        return Err(Error::UnexpectedText { element: e.name.to_string() });
    }
    Ok(())
}

fn with_context(err: Error, name: &QName) -> Error {
    match err {
        Error::InvalidValue(msg) => Error::InvalidValue(format!("{name}: {msg}")),
        other => other,
    }
}
