//! In-memory document tree.
//!
//! Every front end converges on [`Element`]: the XML parser builds it from
//! text, the JSON bridge builds it from a value tree, and the decoder builds
//! it from events through [`TreeBuilder`]. The encoder consumes it.

use crate::event::Event;
use crate::qname::QName;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    /// `xsi:nil="true"`
    pub nil: bool,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self { name, attributes: Vec::new(), children: Vec::new(), nil: false }
    }

    pub fn with_attribute(mut self, name: QName, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute { name, value: value.into() });
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(&text.into());
        self
    }

    pub fn with_nil(mut self) -> Self {
        self.nil = true;
        self
    }

    /// Appends text, merging with a directly preceding text node.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(Node::Text(existing)) => existing.push_str(text),
            _ => self.children.push(Node::Text(text.to_string())),
        }
    }

    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes.iter().find(|a| a.name == *name).map(|a| a.value.as_str())
    }

    /// Concatenated text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let Node::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn has_element_children(&self) -> bool {
        self.children.iter().any(|c| matches!(c, Node::Element(_)))
    }

    /// Drops whitespace-only text nodes from elements that also contain
    /// child elements, recursively.
    pub fn strip_insignificant_whitespace(&mut self) {
        if self.has_element_children() {
            self.children.retain(|c| match c {
                Node::Text(t) => !is_xml_whitespace(t),
                Node::Element(_) => true,
            });
        }
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.strip_insignificant_whitespace();
            }
        }
    }
}

pub(crate) fn is_xml_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Assembles events into an [`Element`] tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stack: Vec<Element>,
    root: Option<Element>,
    finished: bool,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self, event: Event) -> Result<()> {
        match event {
            Event::StartDocument => {}
            Event::StartElement(name) => {
                if self.stack.is_empty() && self.root.is_some() {
                    return Err(Error::Internal("second document element".into()));
                }
                self.stack.push(Element::new(name));
            }
            Event::EndElement => {
                let element = self
                    .stack
                    .pop()
                    .ok_or_else(|| Error::Internal("end element without open element".into()))?;
                match self.stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => self.root = Some(element),
                }
            }
            Event::Attribute(name, value) => {
                self.current("attribute")?.attributes.push(Attribute { name, value });
            }
            Event::Characters(text) => self.current("characters")?.push_text(&text),
            Event::Nil => self.current("nil")?.nil = true,
            Event::EndDocument => {
                if !self.stack.is_empty() {
                    return Err(Error::Internal("end document inside an element".into()));
                }
                self.finished = true;
            }
        }
        Ok(())
    }

    fn current(&mut self, what: &str) -> Result<&mut Element> {
        self.stack
            .last_mut()
            .ok_or_else(|| Error::Internal(format!("{what} event outside an element")))
    }

    /// The completed document element.
    pub fn finish(self) -> Result<Element> {
        match (self.finished, self.root) {
            (true, Some(root)) => Ok(root),
            _ => Err(Error::Internal("incomplete event sequence".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(local: &str) -> QName {
        QName::new("urn:t", local)
    }

    #[test]
    fn builder_assembles_tree() {
        let mut builder = TreeBuilder::new();
        for event in [
            Event::StartDocument,
            Event::StartElement(q("Root")),
            Event::Attribute(q("Id"), "a1".into()),
            Event::StartElement(q("Child")),
            Event::Characters("12".into()),
            Event::Characters("34".into()),
            Event::EndElement,
            Event::StartElement(q("Empty")),
            Event::Nil,
            Event::EndElement,
            Event::EndElement,
            Event::EndDocument,
        ] {
            builder.push(event).unwrap();
        }
        let root = builder.finish().unwrap();
        let expected = Element::new(q("Root"))
            .with_attribute(q("Id"), "a1")
            .with_child(Element::new(q("Child")).with_text("1234"))
            .with_child(Element::new(q("Empty")).with_nil());
        assert_eq!(root, expected);
        assert_eq!(root.attribute(&q("Id")), Some("a1"));
    }

    #[test]
    fn unbalanced_events_fail() {
        let mut builder = TreeBuilder::new();
        assert!(builder.push(Event::EndElement).is_err());
        assert!(builder.push(Event::Characters("x".into())).is_err());
        builder.push(Event::StartElement(q("A"))).unwrap();
        assert!(builder.push(Event::EndDocument).is_err());
        assert!(TreeBuilder::new().finish().is_err());
    }

    #[test]
    fn whitespace_stripped_only_next_to_elements() {
        let mut root = Element::new(q("R"))
            .with_text("\n  ")
            .with_child(Element::new(q("A")).with_text("  "))
            .with_text("\n");
        root.strip_insignificant_whitespace();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.child_elements().next().unwrap().text(), "  ");
    }
}
