//! Structure bridge: JSON message content ↔ [`Element`] tree.
//!
//! Lets callers hand over a message as a JSON object plus a
//! [`MessageType`](crate::MessageType) instead of XML text. The JSON is
//! turned into the same [`Element`] tree the XML parser would build, so both
//! paths meet in the same encoder and produce identical bytes.
//!
//! # Naming convention
//!
//! - The top-level object holds the *content* of the message element; it is
//!   not wrapped in the element name.
//! - A child element is keyed by its local name. If two children of one type
//!   share a local name in different namespaces, both use Clark notation
//!   (`{uri}local`).
//! - A child that may occur more than once (its own `maxOccurs` or that of
//!   an enclosing group) is always an array, even with one item.
//! - Simple-typed children are scalars: booleans, numbers for integer types
//!   and for decimal or float values a JSON number carries exactly, strings
//!   otherwise. Encoding also accepts any scalar whose text form is a valid
//!   lexical value.
//! - An attribute is keyed by its local name, or by `@` + its name if that
//!   collides with a child element or the attribute is namespaced.
//! - Text of an element with simple content and attributes is `$value`.
//! - `null` is a nil element (nillable elements only).
//! - Children matched by a wildcard are keyed by their Clark name. Their
//!   content is untyped: text becomes a string, attributes `@name`, mixed
//!   text `$value`.
//!
//! Two children of a repeated group (`(A, B)*`) are flattened into separate
//! `A` and `B` arrays, so the interleaving `A B A B` cannot be expressed.
//!
//! # Beispiel
//!
//! ```
//! use v2gcodec::{bridge, grammar, parse_xsd, CodecOptions};
//!
//! let model = parse_xsd(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!   <xs:element name="Msg"><xs:complexType><xs:sequence>
//!     <xs:element name="Count" type="xs:unsignedInt"/>
//!     <xs:element name="Tag" type="xs:string" maxOccurs="3"/>
//!   </xs:sequence></xs:complexType></xs:element></xs:schema>"#).unwrap();
//! let grammars = grammar::compile(&model).unwrap();
//!
//! let json = br#"{"Count":7,"Tag":["a","b"]}"#;
//! let exi = bridge::encode_struct(&grammars, 0, json).unwrap();
//! let back = bridge::decode_struct(&grammars, 0, &exi, &CodecOptions::default()).unwrap();
//! assert_eq!(back, json);
//! ```

use serde_json::{Map, Value};

use crate::grammar::{AttributeGrammar, Content, ElementGrammar, GrammarSet, RuleKind, TypeGrammar};
use crate::infoset::{Attribute, Element};
use crate::options::CodecOptions;
use crate::qname::QName;
use crate::schema::NamespaceConstraint;
use crate::typed_value::{JsonKind, ValueCodec};
use crate::{Error, Result, decoder, encoder};

/// Key of the text of an element that also has attributes.
pub const VALUE_KEY: &str = "$value";
/// Prefix of attribute keys that would collide otherwise.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Parses `json` as the content of root element `root` and encodes it.
pub fn encode_struct(grammars: &GrammarSet, root: usize, json: &[u8]) -> Result<Vec<u8>> {
    let value: Value =
        serde_json::from_slice(json).map_err(|e| Error::JsonParseError(e.to_string()))?;
    let element = to_element(grammars, root, &value)?;
    encoder::encode(grammars, &element)
}

/// Decodes a stream whose root must be `root` and renders its content as
/// compact JSON.
pub fn decode_struct(
    grammars: &GrammarSet,
    root: usize,
    exi: &[u8],
    options: &CodecOptions,
) -> Result<Vec<u8>> {
    let element = decoder::decode_expecting(grammars, exi, options, root)?;
    let value = from_element(grammars, root, &element)?;
    serde_json::to_vec(&value).map_err(|e| Error::Internal(format!("JSON serialization: {e}")))
}

/// Builds the tree for root element `root` from its JSON content.
pub fn to_element(grammars: &GrammarSet, root: usize, value: &Value) -> Result<Element> {
    let grammar = root_grammar(grammars, root)?;
    Bridge { grammars }.typed_element(grammar, value)
}

/// Renders the content of `element` (a tree of root `root`) as JSON.
pub fn from_element(grammars: &GrammarSet, root: usize, element: &Element) -> Result<Value> {
    let grammar = root_grammar(grammars, root)?;
    if grammar.name != element.name {
        return Err(Error::RootMismatch {
            expected: grammar.name.to_string(),
            found: element.name.to_string(),
        });
    }
    Bridge { grammars }.typed_json(grammar, element)
}

fn root_grammar(grammars: &GrammarSet, root: usize) -> Result<&ElementGrammar> {
    grammars
        .root(root)
        .ok_or_else(|| Error::InvalidArgument(format!("no root element with index {root}")))
}

// ============================================================================
// Key layout per type
// ============================================================================

struct Slot<'g> {
    key: String,
    grammar: &'g ElementGrammar,
    repeated: bool,
}

/// JSON keys of one complex type, in schema order.
struct Layout<'g> {
    attributes: Vec<(String, &'g AttributeGrammar)>,
    elements: Vec<Slot<'g>>,
    wildcard: Option<&'g NamespaceConstraint>,
    /// Index into `elements` before which wildcard children go.
    wildcard_pos: usize,
}

impl<'g> Layout<'g> {
    fn new(ty: &'g TypeGrammar) -> Self {
        let mut elements: Vec<Slot<'g>> = Vec::new();
        let mut wildcard = None;
        let mut wildcard_pos = 0;
        if let Content::Elements(rule) = &ty.content {
            rule.visit_leaves(&mut |kind, repeated| match kind {
                RuleKind::Element(g) => {
                    match elements.iter_mut().find(|s| s.grammar.name == g.name) {
                        Some(slot) => slot.repeated |= repeated,
                        None => elements.push(Slot { key: String::new(), grammar: g, repeated }),
                    }
                }
                RuleKind::Wildcard(ns) if wildcard.is_none() => {
                    wildcard = Some(ns);
                    wildcard_pos = elements.len();
                }
                _ => {}
            });
        }

        let keys: Vec<String> = elements
            .iter()
            .map(|slot| {
                let name = &slot.grammar.name;
                let clash = elements.iter().any(|o| {
                    o.grammar.name.local_name == name.local_name && o.grammar.name.uri != name.uri
                });
                if clash { name.to_clark() } else { name.local_name.to_string() }
            })
            .collect();
        for (slot, key) in elements.iter_mut().zip(keys) {
            slot.key = key;
        }

        let attributes = ty
            .attributes
            .iter()
            .map(|decl| {
                let local = &*decl.name.local_name;
                let clash = elements.iter().any(|s| s.key == local) || local == VALUE_KEY;
                let key = if decl.name.uri.is_empty() && !clash {
                    local.to_string()
                } else {
                    format!("{ATTRIBUTE_PREFIX}{}", decl.name)
                };
                (key, decl)
            })
            .collect();

        Self { attributes, elements, wildcard, wildcard_pos }
    }

    fn slot(&self, name: &QName) -> Option<&Slot<'g>> {
        self.elements.iter().find(|s| s.grammar.name == *name)
    }

    fn claims(&self, key: &str) -> bool {
        self.attributes.iter().any(|(k, _)| k == key) || self.elements.iter().any(|s| s.key == key)
    }
}

struct Bridge<'g> {
    grammars: &'g GrammarSet,
}

impl<'g> Bridge<'g> {
    // ========================================================================
    // JSON → Element
    // ========================================================================

    fn typed_element(&self, grammar: &ElementGrammar, value: &Value) -> Result<Element> {
        let mut e = Element::new(grammar.name.clone());
        if value.is_null() {
            if !grammar.nillable {
                return Err(Error::NotNillable(grammar.name.to_string()));
            }
            e.nil = true;
            return Ok(e);
        }

        let ty = self.grammars.type_grammar(grammar.type_id);
        match &ty.content {
            Content::Any => {
                generic_fill(&mut e, value)?;
                return Ok(e);
            }
            Content::Simple(_) if !value.is_object() => {
                e.push_text(&lexical(value, &e.name)?);
                return Ok(e);
            }
            _ => {}
        }
        let Value::Object(map) = value else {
            return Err(Error::SchemaViolation(format!(
                "'{}' expects a JSON object, found {}",
                e.name,
                json_type(value)
            )));
        };

        let layout = Layout::new(ty);
        for (key, decl) in &layout.attributes {
            if let Some(v) = map.get(key) {
                e.attributes.push(Attribute { name: decl.name.clone(), value: lexical(v, &decl.name)? });
            }
        }

        let simple = matches!(ty.content, Content::Simple(_));
        let mut extra = Vec::new();
        for (key, v) in map {
            if layout.claims(key) || (simple && key == VALUE_KEY) {
                continue;
            }
            if key == VALUE_KEY {
                return Err(Error::UnexpectedText { element: e.name.to_string() });
            }
            let name = match layout.wildcard {
                Some(ns) => QName::from_clark(key).filter(|n| ns.matches(&n.uri)),
                None => None,
            };
            let name = name.ok_or_else(|| {
                Error::unexpected_element(format!("a child of '{}'", e.name), key.clone())
            })?;
            extra.push((name, v));
        }

        if simple {
            if let Some(v) = map.get(VALUE_KEY) {
                e.push_text(&lexical(v, &e.name)?);
            }
            return Ok(e);
        }

        for (i, slot) in layout.elements.iter().enumerate() {
            if i == layout.wildcard_pos {
                push_generic(&mut e, &extra)?;
            }
            if let Some(v) = map.get(&slot.key) {
                self.push_slot(&mut e, slot, v)?;
            }
        }
        if layout.wildcard_pos >= layout.elements.len() {
            push_generic(&mut e, &extra)?;
        }
        Ok(e)
    }

    fn push_slot(&self, parent: &mut Element, slot: &Slot<'_>, value: &Value) -> Result<()> {
        match value {
            Value::Array(items) if slot.repeated => {
                for item in items {
                    let child = self.typed_element(slot.grammar, item)?;
                    parent.children.push(child.into());
                }
            }
            Value::Array(_) => {
                return Err(Error::SchemaViolation(format!(
                    "'{}' occurs at most once, found an array",
                    slot.grammar.name
                )));
            }
            single => {
                let child = self.typed_element(slot.grammar, single)?;
                parent.children.push(child.into());
            }
        }
        Ok(())
    }

    // ========================================================================
    // Element → JSON
    // ========================================================================

    fn typed_json(&self, grammar: &ElementGrammar, e: &Element) -> Result<Value> {
        if e.nil {
            return Ok(Value::Null);
        }
        let ty = self.grammars.type_grammar(grammar.type_id);
        let codec = match &ty.content {
            Content::Any => return Ok(generic_json(e)),
            Content::Simple(codec) if e.attributes.is_empty() => {
                return Ok(typed_scalar(codec, &e.text()));
            }
            Content::Simple(codec) => Some(codec),
            Content::Empty | Content::Elements(_) => None,
        };

        let layout = Layout::new(ty);
        let mut map = Map::new();
        for (key, decl) in &layout.attributes {
            if let Some(value) = e.attribute(&decl.name) {
                map.insert(key.clone(), typed_scalar(&decl.codec, value));
            }
        }
        if let Some(codec) = codec {
            map.insert(VALUE_KEY.to_string(), typed_scalar(codec, &e.text()));
            return Ok(Value::Object(map));
        }

        for child in e.child_elements() {
            match layout.slot(&child.name) {
                Some(slot) => {
                    let value = self.typed_json(slot.grammar, child)?;
                    insert(&mut map, &slot.key, value, slot.repeated);
                }
                None => insert(&mut map, &child.name.to_clark(), generic_json(child), false),
            }
        }
        Ok(Value::Object(map))
    }
}

/// Adds `value` under `key`; repeated keys always hold arrays, a second
/// value for a single key turns it into one.
fn insert(map: &mut Map<String, Value>, key: &str, value: Value, repeated: bool) {
    match map.get_mut(key) {
        Some(Value::Array(items)) if repeated => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = match first {
                Value::Array(mut items) => {
                    items.push(value);
                    Value::Array(items)
                }
                first => Value::Array(vec![first, value]),
            };
        }
        None if repeated => {
            map.insert(key.to_string(), Value::Array(vec![value]));
        }
        None => {
            map.insert(key.to_string(), value);
        }
    }
}

fn typed_scalar(codec: &ValueCodec, text: &str) -> Value {
    match codec.json_kind() {
        JsonKind::Bool => Value::Bool(text == "true"),
        JsonKind::Integer => text
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| text.parse::<u64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(text.to_string())),
        JsonKind::Number => json_number(codec, text),
        JsonKind::String => Value::String(text.to_string()),
    }
}

/// A JSON number only if it reads back as the same canonical value,
/// otherwise the canonical text as a string.
fn json_number(codec: &ValueCodec, text: &str) -> Value {
    let number = match text.parse::<i64>() {
        Ok(n) => Some(serde_json::Number::from(n)),
        Err(_) => text.parse::<f64>().ok().and_then(serde_json::Number::from_f64),
    };
    match number {
        Some(n) if codec.canonical_number(&n.to_string()).as_deref() == Some(text) => {
            Value::Number(n)
        }
        _ => Value::String(text.to_string()),
    }
}

// --- Untyped content ---

fn push_generic(parent: &mut Element, extra: &[(QName, &Value)]) -> Result<()> {
    for (name, value) in extra {
        match value {
            Value::Array(items) => {
                for item in items {
                    parent.children.push(generic_element(name.clone(), item)?.into());
                }
            }
            single => parent.children.push(generic_element(name.clone(), single)?.into()),
        }
    }
    Ok(())
}

fn generic_element(name: QName, value: &Value) -> Result<Element> {
    let mut e = Element::new(name);
    generic_fill(&mut e, value)?;
    Ok(e)
}

fn generic_fill(e: &mut Element, value: &Value) -> Result<()> {
    match value {
        Value::Null => e.nil = true,
        Value::Object(map) => {
            for (key, v) in map {
                if key == VALUE_KEY {
                    e.push_text(&lexical(v, &e.name)?);
                } else if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
                    let name = parse_key(attr)?;
                    let value = lexical(v, &name)?;
                    e.attributes.push(Attribute { name, value });
                } else {
                    let name = parse_key(key)?;
                    match v {
                        Value::Array(items) => {
                            for item in items {
                                e.children.push(generic_element(name.clone(), item)?.into());
                            }
                        }
                        single => e.children.push(generic_element(name, single)?.into()),
                    }
                }
            }
            // Gleiche Reihenfolge wie der XML-Parser
            e.attributes.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Value::Array(_) => {
            return Err(Error::SchemaViolation(format!("nested array inside '{}'", e.name)));
        }
        scalar => e.push_text(&lexical(scalar, &e.name)?),
    }
    Ok(())
}

fn generic_json(e: &Element) -> Value {
    if e.nil {
        return Value::Null;
    }
    if e.attributes.is_empty() && !e.has_element_children() {
        return Value::String(e.text());
    }
    let mut map = Map::new();
    for attr in &e.attributes {
        map.insert(format!("{ATTRIBUTE_PREFIX}{}", attr.name), Value::String(attr.value.clone()));
    }
    let text = e.text();
    if !text.is_empty() {
        map.insert(VALUE_KEY.to_string(), Value::String(text));
    }
    for child in e.child_elements() {
        insert(&mut map, &child.name.to_clark(), generic_json(child), false);
    }
    Value::Object(map)
}

fn parse_key(key: &str) -> Result<QName> {
    QName::from_clark(key)
        .ok_or_else(|| Error::JsonParseError(format!("'{key}' is not an element or attribute name")))
}

/// Lexical text of a JSON scalar.
fn lexical(value: &Value, name: &QName) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::InvalidValue(format!(
            "{name}: expected a scalar, found {}",
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::compile;
    use crate::xml::parse_document;
    use crate::xsd::parse_xsd;
    use crate::ErrorKind;

    const SCHEMA: &str = r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            targetNamespace="urn:m" xmlns="urn:m" elementFormDefault="qualified">
        <xs:element name="Msg">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="Id" type="xs:string"/>
              <xs:element name="Amount" type="Amount"/>
              <xs:element name="Flag" type="xs:boolean" minOccurs="0"/>
              <xs:element name="Entry" minOccurs="0" maxOccurs="unbounded">
                <xs:complexType><xs:sequence>
                  <xs:element name="Start" type="xs:unsignedInt"/>
                  <xs:element name="Note" type="xs:string" nillable="true"/>
                </xs:sequence></xs:complexType>
              </xs:element>
              <xs:any namespace="##other" processContents="lax" minOccurs="0"/>
            </xs:sequence>
            <xs:attribute name="Id" type="xs:string"/>
          </xs:complexType>
        </xs:element>
        <xs:complexType name="Amount">
          <xs:simpleContent><xs:extension base="xs:decimal">
            <xs:attribute name="unit" type="xs:string"/>
          </xs:extension></xs:simpleContent>
        </xs:complexType>
    </xs:schema>"###;

    fn grammars() -> GrammarSet {
        compile(&parse_xsd(SCHEMA).unwrap()).unwrap()
    }

    fn json_roundtrip(g: &GrammarSet, json: &str) -> String {
        let exi = encode_struct(g, 0, json.as_bytes()).unwrap();
        let back = decode_struct(g, 0, &exi, &CodecOptions::default()).unwrap();
        String::from_utf8(back).unwrap()
    }

    #[test]
    fn content_roundtrips_to_identical_json() {
        let g = grammars();
        let json = concat!(
            r#"{"@Id":"m-1","Id":"abc","Amount":{"unit":"kWh","$value":12.5},"Flag":true,"#,
            r#""Entry":[{"Start":0,"Note":"first"},{"Start":300,"Note":null}]}"#
        );
        assert_eq!(json_roundtrip(&g, json), json);

        let minimal = r#"{"Id":"x","Amount":2.25}"#;
        assert_eq!(json_roundtrip(&g, minimal), minimal);
    }

    #[test]
    fn decimals_keep_their_exact_value() {
        let g = grammars();
        let integral = r#"{"Id":"a","Amount":100}"#;
        assert_eq!(json_roundtrip(&g, integral), integral);

        // Mehr Stellen als ein f64 hält: bleibt Text
        let long = r#"{"Id":"a","Amount":"1.23456789012345678"}"#;
        assert_eq!(json_roundtrip(&g, long), long);
        let exi = encode_struct(&g, 0, long.as_bytes()).unwrap();
        let back = decode_struct(&g, 0, &exi, &CodecOptions::default()).unwrap();
        assert_eq!(encode_struct(&g, 0, &back).unwrap(), exi);

        let tiny = r#"{"Id":"a","Amount":"0.0000001"}"#;
        assert_eq!(json_roundtrip(&g, tiny), tiny);
    }

    #[test]
    fn json_and_xml_build_the_same_tree() {
        let g = grammars();
        let json: Value = serde_json::from_str(
            r#"{"Id":"abc","Entry":[{"Note":"n","Start":"7"}],"Amount":"3.5","@Id":"x"}"#,
        )
        .unwrap();
        let from_json = to_element(&g, 0, &json).unwrap();
        let from_xml = parse_document(
            r#"<Msg xmlns="urn:m" Id="x"><Id>abc</Id><Amount>3.5</Amount>
                 <Entry><Start>7</Start><Note>n</Note></Entry></Msg>"#,
        )
        .unwrap();
        assert_eq!(from_json, from_xml);
        assert_eq!(
            encoder::encode(&g, &from_json).unwrap(),
            encoder::encode(&g, &from_xml).unwrap()
        );
    }

    #[test]
    fn wildcard_children_use_clark_keys() {
        let g = grammars();
        let json = r#"{"Id":"a","Amount":1.5,"{urn:v}Ext":{"@code":"7","{urn:v}Item":["x","y"]}}"#;
        assert_eq!(json_roundtrip(&g, json), json);
    }

    #[test]
    fn shape_errors_are_encode_errors() {
        let g = grammars();
        let cases = [
            r#"{"Id":"a"}"#,
            r#"{"Id":"a","Amount":1,"Bogus":1}"#,
            r#"{"Id":"a","Amount":1,"Flag":[true]}"#,
            r#"{"Id":"a","Amount":1,"Flag":"perhaps"}"#,
            r#"{"Id":{"x":1},"Amount":1}"#,
            r#"{"Id":"a","Amount":1,"Entry":[{"Start":1,"Note":"n"}],"$value":"t"}"#,
            r#"{"Id":null,"Amount":1}"#,
            r#"[1,2]"#,
            r#"{"Id":"a","#,
        ];
        for json in cases {
            let err = encode_struct(&g, 0, json.as_bytes()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Encode, "{json}: {err}");
        }
    }

    #[test]
    fn attribute_keys_avoid_element_names() {
        let g = grammars();
        let ty = g.type_grammar(g.roots()[0].type_id);
        let layout = Layout::new(ty);
        let keys: Vec<&str> = layout.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["@Id"]);
        assert!(layout.wildcard.is_some());
        assert_eq!(layout.wildcard_pos, 4);
        assert!(layout.slot(&QName::new("urn:m", "Entry")).unwrap().repeated);
    }
}
