#![no_main]
use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use v2gcodec::{CodecOptions, GrammarSet};

const SCHEMA: &str = r##"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns="urn:fuzz" targetNamespace="urn:fuzz" elementFormDefault="qualified">
  <xs:element name="Req">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="Id" type="xs:hexBinary"/>
        <xs:element name="Mode" minOccurs="0">
          <xs:simpleType><xs:restriction base="xs:string">
            <xs:enumeration value="A"/><xs:enumeration value="B"/><xs:enumeration value="C"/>
          </xs:restriction></xs:simpleType>
        </xs:element>
        <xs:choice>
          <xs:element name="Value" type="xs:decimal"/>
          <xs:element name="Ratio" type="xs:double"/>
        </xs:choice>
        <xs:element name="Tag" type="xs:string" maxOccurs="unbounded"/>
        <xs:any namespace="##other" processContents="lax" minOccurs="0"/>
      </xs:sequence>
      <xs:attribute name="Seq" type="xs:short"/>
    </xs:complexType>
  </xs:element>
  <xs:element name="Res" type="xs:long" nillable="true"/>
</xs:schema>"##;

static GRAMMARS: LazyLock<Option<GrammarSet>> = LazyLock::new(|| {
    let model = v2gcodec::parse_xsd(SCHEMA).ok()?;
    v2gcodec::grammar::compile(&model).ok()
});

// Beliebige Bytes dürfen nur Fehler liefern, nie paniken.
fuzz_target!(|data: &[u8]| {
    let Some(grammars) = GRAMMARS.as_ref() else { return };
    let options = CodecOptions::default().with_max_value_length(1 << 16);
    if let Ok(root) = v2gcodec::decode(grammars, data, &options) {
        let exi = v2gcodec::encode(grammars, &root).expect("decoded tree must re-encode");
        let again = v2gcodec::decode(grammars, &exi, &options).expect("re-encoded stream must decode");
        assert_eq!(root, again);
    }
});
