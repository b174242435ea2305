#![no_main]
use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use v2gcodec::{CodecOptions, GrammarSet};

const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="Msg">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="Count" type="xs:unsignedInt" minOccurs="0"/>
        <xs:element name="Item" maxOccurs="8">
          <xs:complexType>
            <xs:simpleContent>
              <xs:extension base="xs:string">
                <xs:attribute name="Id" type="xs:ID"/>
              </xs:extension>
            </xs:simpleContent>
          </xs:complexType>
        </xs:element>
        <xs:any processContents="skip" minOccurs="0" maxOccurs="unbounded"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

static GRAMMARS: LazyLock<Option<GrammarSet>> = LazyLock::new(|| {
    let model = v2gcodec::parse_xsd(SCHEMA).ok()?;
    v2gcodec::grammar::compile(&model).ok()
});

fuzz_target!(|data: &[u8]| {
    let Some(grammars) = GRAMMARS.as_ref() else { return };
    let Ok(xml) = std::str::from_utf8(data) else { return };
    let Ok(root) = v2gcodec::parse_document(xml) else { return };
    if let Ok(exi) = v2gcodec::encode(grammars, &root) {
        let options = CodecOptions::default();
        let decoded = v2gcodec::decode(grammars, &exi, &options).expect("own stream must decode");
        let text = v2gcodec::to_xml(&decoded, &options);
        let reparsed = v2gcodec::parse_document(&text).expect("decoded XML must parse");
        assert_eq!(v2gcodec::encode(grammars, &reparsed).expect("must re-encode"), exi);
    }
});
