#![no_main]
use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use v2gcodec::{CodecOptions, GrammarSet, bridge};

const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="Msg">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="Flag" type="xs:boolean"/>
        <xs:element name="Level" type="xs:byte" minOccurs="0"/>
        <xs:element name="Name" type="xs:string" maxOccurs="4"/>
        <xs:element name="Data" type="xs:base64Binary" minOccurs="0" nillable="true"/>
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
    if let Ok(exi) = bridge::encode_struct(grammars, 0, data) {
        let options = CodecOptions::default();
        let json = bridge::decode_struct(grammars, 0, &exi, &options).expect("own stream must decode");
        assert_eq!(bridge::encode_struct(grammars, 0, &json).expect("must re-encode"), exi);
    }
});
