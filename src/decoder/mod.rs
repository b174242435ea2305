//! EXI Stream Decoder – Gegenstück zu [`crate::encoder`]
//!
//! Reads a stream produced against the same [`GrammarSet`] and rebuilds the
//! [`Element`] tree. Unlike the encoder the decoder never looks ahead: every
//! presence bit, count and choice index is in the stream, so decoding is a
//! straight walk over the rule tree. Values are returned in canonical
//! lexical form.
//!
//! Corrupt input always ends in a Decode-class error: codes that select no
//! alternative, truncated data, values over the configured length limit,
//! nesting over [`MAX_DEPTH`], more elements than the input size allows and
//! non-zero bits after the document.

use crate::bitstream::BitReader;
use crate::encoder::{GENERIC_CODE_BITS, GENERIC_ELEMENT, GENERIC_END, GENERIC_TEXT, MAX_DEPTH};
use crate::event::Event;
use crate::grammar::{Content, ElementGrammar, GrammarSet, Occurs, Rule, RuleKind};
use crate::infoset::{Element, TreeBuilder};
use crate::options::CodecOptions;
use crate::qname::QName;
use crate::string_table::StringTable;
use crate::{Error, Result, bit_width, header, n_bit_unsigned_integer, unsigned_integer};

/// Elements a stream may expand to: a fixed base plus this many per input
/// byte. Empty elements cost no bits of their own, so a count prefix alone
/// could otherwise ask for millions of them.
const ELEMENTS_PER_BYTE: usize = 64;
const ELEMENT_BASE: usize = 4096;

/// Decodes a complete stream whose root may be any global element.
pub fn decode(grammars: &GrammarSet, data: &[u8], options: &CodecOptions) -> Result<Element> {
    decode_document(grammars, data, options, None)
}

/// Decodes a stream that must carry the root at `expected` (an index into
/// [`GrammarSet::roots`]); any other root fails with [`Error::RootMismatch`].
pub fn decode_expecting(
    grammars: &GrammarSet,
    data: &[u8],
    options: &CodecOptions,
    expected: usize,
) -> Result<Element> {
    decode_document(grammars, data, options, Some(expected))
}

fn decode_document(
    grammars: &GrammarSet,
    data: &[u8],
    options: &CodecOptions,
    expected: Option<usize>,
) -> Result<Element> {
    let mut decoder = Decoder::new(grammars, data, options);
    header::read(&mut decoder.reader, data)?;

    let roots = grammars.roots();
    let index = n_bit_unsigned_integer::decode_index(&mut decoder.reader, roots.len(), "root element")?;
    if let Some(expected) = expected
        && expected != index
    {
        let expected = grammars.root(expected).map(|g| g.name.to_string()).unwrap_or_default();
        return Err(Error::RootMismatch { expected, found: roots[index].name.to_string() });
    }

    decoder.emit(Event::StartDocument)?;
    decoder.element(&roots[index], 0)?;
    decoder.emit(Event::EndDocument)?;

    if !decoder.reader.only_padding_left() {
        return Err(Error::TrailingData);
    }
    log::debug!(
        "decoded '{}' from {} bytes",
        roots[index].name,
        data.len()
    );
    decoder.builder.finish()
}

struct Decoder<'g, 'a> {
    grammars: &'g GrammarSet,
    reader: BitReader<'a>,
    table: StringTable,
    options: &'a CodecOptions,
    builder: TreeBuilder,
    elements: usize,
    element_limit: usize,
    trace: bool,
}

impl<'g, 'a> Decoder<'g, 'a> {
    fn new(grammars: &'g GrammarSet, data: &'a [u8], options: &'a CodecOptions) -> Self {
        Self {
            grammars,
            reader: BitReader::new(data),
            table: StringTable::new(),
            options,
            builder: TreeBuilder::new(),
            elements: 0,
            element_limit: data.len().saturating_mul(ELEMENTS_PER_BYTE).saturating_add(ELEMENT_BASE),
            trace: log::log_enabled!(log::Level::Trace),
        }
    }

    fn emit(&mut self, event: Event) -> Result<()> {
        if self.trace {
            log::trace!("decode {event} at bit {}", self.reader.bit_position());
        }
        self.builder.push(event)
    }

    fn count_element(&mut self) -> Result<()> {
        if self.elements == self.element_limit {
            return Err(Error::ElementLimitExceeded(self.element_limit));
        }
        self.elements += 1;
        Ok(())
    }

    // ========================================================================
    // Elements
    // ========================================================================

    fn element(&mut self, grammar: &ElementGrammar, depth: usize) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(Error::StreamTooDeep(depth));
        }
        self.count_element()?;
        self.emit(Event::StartElement(grammar.name.clone()))?;
        let ty = self.grammars.type_grammar(grammar.type_id);
        let nil = grammar.nillable && self.reader.read_bit()?;

        if let Content::Any = ty.content {
            self.generic_content(&grammar.name, nil, depth)?;
            return self.emit(Event::EndElement);
        }

        for decl in &ty.attributes {
            if decl.required || self.reader.read_bit()? {
                let value =
                    decl.codec.decode(&mut self.reader, &mut self.table, &decl.name, self.options)?;
                self.emit(Event::Attribute(decl.name.clone(), value))?;
            }
        }

        if nil {
            self.emit(Event::Nil)?;
            return self.emit(Event::EndElement);
        }

        match &ty.content {
            Content::Empty | Content::Any => {}
            Content::Simple(codec) => {
                let text = codec.decode(&mut self.reader, &mut self.table, &grammar.name, self.options)?;
                if !text.is_empty() {
                    self.emit(Event::Characters(text))?;
                }
            }
            Content::Elements(rule) => self.rule(rule, depth)?,
        }
        self.emit(Event::EndElement)
    }

    // ========================================================================
    // Content rules
    // ========================================================================

    fn rule(&mut self, rule: &Rule, depth: usize) -> Result<()> {
        match rule.occurs {
            Occurs::Once => self.term(rule, depth),
            Occurs::Optional => {
                if self.reader.read_bit()? {
                    self.term(rule, depth)?;
                }
                Ok(())
            }
            Occurs::Unbounded { min } => {
                for _ in 0..min {
                    self.term(rule, depth)?;
                }
                while self.reader.read_bit()? {
                    self.term(rule, depth)?;
                }
                Ok(())
            }
            Occurs::Counted { min, max } => {
                let extra =
                    n_bit_unsigned_integer::decode(&mut self.reader, bit_width::for_range(min, max))?;
                if extra > u64::from(max - min) {
                    return Err(Error::invalid_event_code(extra, "occurrence count"));
                }
                for _ in 0..u64::from(min) + extra {
                    self.term(rule, depth)?;
                }
                Ok(())
            }
        }
    }

    fn term(&mut self, rule: &Rule, depth: usize) -> Result<()> {
        match &rule.kind {
            RuleKind::Element(grammar) => self.element(grammar, depth + 1),
            RuleKind::Wildcard(_) => self.generic_element(depth + 1),
            RuleKind::Sequence(items) => {
                for item in items {
                    self.rule(item, depth)?;
                }
                Ok(())
            }
            RuleKind::Choice(branches) => {
                let index =
                    n_bit_unsigned_integer::decode_index(&mut self.reader, branches.len(), "choice")?;
                self.rule(&branches[index], depth)
            }
        }
    }

    // ========================================================================
    // Generic (wildcard) content
    // ========================================================================

    fn generic_element(&mut self, depth: usize) -> Result<()> {
        if depth >= MAX_DEPTH {
            return Err(Error::StreamTooDeep(depth));
        }
        self.count_element()?;
        let name = self.table.decode_qname(&mut self.reader, self.options.max_value_length)?;
        self.emit(Event::StartElement(name.clone()))?;
        let nil = self.reader.read_bit()?;
        self.generic_content(&name, nil, depth)?;
        self.emit(Event::EndElement)
    }

    fn generic_content(&mut self, name: &QName, nil: bool, depth: usize) -> Result<()> {
        let max_len = self.options.max_value_length;
        let count = unsigned_integer::decode(&mut self.reader)?;
        for _ in 0..count {
            let attr = self.table.decode_qname(&mut self.reader, max_len)?;
            let value = self.table.decode_value(&mut self.reader, &attr, max_len)?;
            self.emit(Event::Attribute(attr, value))?;
        }
        if nil {
            return self.emit(Event::Nil);
        }
        loop {
            match n_bit_unsigned_integer::decode(&mut self.reader, GENERIC_CODE_BITS)? {
                GENERIC_END => return Ok(()),
                GENERIC_ELEMENT => self.generic_element(depth + 1)?,
                GENERIC_TEXT => {
                    let text = self.table.decode_value(&mut self.reader, name, max_len)?;
                    self.emit(Event::Characters(text))?;
                }
                code => return Err(Error::invalid_event_code(code, "generic content item")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode;
    use crate::grammar::compile;
    use crate::xml::parse_document;
    use crate::xsd::parse_xsd;
    use crate::ErrorKind;

    const SCHEMA: &str = r###"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns="urn:t" targetNamespace="urn:t" elementFormDefault="qualified">
        <xs:element name="Req">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="Id" type="xs:hexBinary"/>
              <xs:choice>
                <xs:element name="X" type="xs:int"/>
                <xs:element name="Y" type="xs:string"/>
                <xs:element name="Z" type="xs:boolean"/>
              </xs:choice>
              <xs:element name="Item" type="xs:unsignedShort" minOccurs="0" maxOccurs="4"/>
              <xs:element name="Ext" minOccurs="0">
                <xs:complexType><xs:sequence>
                  <xs:any namespace="##other" processContents="lax" minOccurs="0" maxOccurs="unbounded"/>
                </xs:sequence></xs:complexType>
              </xs:element>
            </xs:sequence>
            <xs:attribute name="Id" type="xs:ID"/>
          </xs:complexType>
        </xs:element>
        <xs:element name="Res" type="xs:boolean"/>
    </xs:schema>"###;

    fn grammars() -> GrammarSet {
        compile(&parse_xsd(SCHEMA).unwrap()).unwrap()
    }

    fn roundtrip(g: &GrammarSet, xml: &str) -> Element {
        let doc = parse_document(xml).unwrap();
        let bytes = encode(g, &doc).unwrap();
        let back = decode(g, &bytes, &CodecOptions::default()).unwrap();
        assert_eq!(back, doc, "{xml}");
        back
    }

    #[test]
    fn schema_content_roundtrips() {
        let g = grammars();
        roundtrip(&g, r#"<Req xmlns="urn:t" Id="m1"><Id>0A0B</Id><Y>hello</Y><Item>1</Item><Item>65535</Item></Req>"#);
        roundtrip(&g, r#"<Req xmlns="urn:t"><Id></Id><X>-5</X></Req>"#);
        roundtrip(&g, r#"<Res xmlns="urn:t">true</Res>"#);
    }

    #[test]
    fn wildcard_content_roundtrips() {
        let g = grammars();
        roundtrip(
            &g,
            r#"<Req xmlns="urn:t"><Id>FF</Id><Z>false</Z><Ext>
                 <v:Vendor xmlns:v="urn:vendor" v:a="1" b="two"><v:Inner>text</v:Inner><v:Inner>text</v:Inner></v:Vendor>
                 <v:Other xmlns:v="urn:vendor" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/>
               </Ext></Req>"#,
        );
    }

    #[test]
    fn values_come_back_canonical() {
        let g = grammars();
        let doc = parse_document(r#"<Req xmlns="urn:t"><Id>0a0b</Id><Z>1</Z><Item>007</Item></Req>"#).unwrap();
        let bytes = encode(&g, &doc).unwrap();
        let back = decode(&g, &bytes, &CodecOptions::default()).unwrap();
        let texts: Vec<String> = back.child_elements().map(Element::text).collect();
        assert_eq!(texts, ["0A0B", "true", "7"]);
    }

    #[test]
    fn expected_root_is_checked() {
        let g = grammars();
        let bytes = encode(&g, &parse_document(r#"<Res xmlns="urn:t">false</Res>"#).unwrap()).unwrap();
        let req = g.root_index(&QName::new("urn:t", "Req")).unwrap();
        let res = g.root_index(&QName::new("urn:t", "Res")).unwrap();
        assert!(decode_expecting(&g, &bytes, &CodecOptions::default(), res).is_ok());
        let err = decode_expecting(&g, &bytes, &CodecOptions::default(), req).unwrap_err();
        assert!(matches!(err, Error::RootMismatch { .. }), "{err}");
    }

    #[test]
    fn corrupt_streams_are_decode_errors() {
        let g = grammars();
        let opts = CodecOptions::default();
        let doc = parse_document(r#"<Req xmlns="urn:t"><Id>0A0B</Id><Y>some text</Y></Req>"#).unwrap();
        let bytes = encode(&g, &doc).unwrap();

        // Truncated
        for len in 0..bytes.len() {
            let err = decode(&g, &bytes[..len], &opts).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decode, "len {len}: {err}");
        }

        // Extra byte after the document
        let mut extended = bytes.clone();
        extended.push(0x01);
        assert_eq!(decode(&g, &extended, &opts), Err(Error::TrailingData));

        // Distinguishing bits 00
        let mut bad = bytes.clone();
        bad[0] = 0x00;
        assert!(matches!(decode(&g, &bad, &opts), Err(Error::InvalidDistinguishingBits(0))));
    }

    #[test]
    fn value_length_limit() {
        let g = grammars();
        let doc = parse_document(r#"<Req xmlns="urn:t"><Id>00</Id><Y>0123456789</Y></Req>"#).unwrap();
        let bytes = encode(&g, &doc).unwrap();
        let opts = CodecOptions::default().with_max_value_length(4);
        assert!(matches!(
            decode(&g, &bytes, &opts),
            Err(Error::ValueLengthExceeded { .. })
        ));
    }

    #[test]
    fn count_prefix_cannot_inflate_empty_elements() {
        let g = compile(
            &parse_xsd(
                r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                     <xs:element name="Flood"><xs:complexType><xs:sequence>
                       <xs:element name="E" maxOccurs="16777215"><xs:complexType/></xs:element>
                     </xs:sequence></xs:complexType></xs:element></xs:schema>"#,
            )
            .unwrap(),
        )
        .unwrap();
        let opts = CodecOptions::default();
        // 24-bit count 0xFFFFFF, no bits per element
        let err = decode(&g, &[0x80, 0xFF, 0xFF, 0xFF], &opts).unwrap_err();
        assert!(matches!(err, Error::ElementLimitExceeded(4352)), "{err}");
        assert_eq!(err.kind(), ErrorKind::Decode);

        let few = parse_document("<Flood><E/><E/><E/></Flood>").unwrap();
        let bytes = encode(&g, &few).unwrap();
        assert_eq!(decode(&g, &bytes, &opts).unwrap(), few);
    }

    #[test]
    fn invalid_choice_index() {
        // Choice of 3 uses 2 bits, pattern 11 selects nothing
        let g = grammars();
        let doc = parse_document(r#"<Req xmlns="urn:t"><Id></Id><Z>true</Z></Req>"#).unwrap();
        let mut bytes = encode(&g, &doc).unwrap();
        // 0x80 | root 0 | Id attr absent | Id length 0 (8 bits) | choice 10 | Z 1 | count 000 | Ext absent
        assert_eq!(bytes, vec![0x80, 0x00, 0b0010_1000, 0x00]);
        bytes[2] |= 0b0001_0000;
        let err = decode(&g, &bytes, &CodecOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidEventCode { .. }), "{err}");
    }
}
