#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xsd) = std::str::from_utf8(data) {
        if let Ok(model) = v2gcodec::parse_xsd(xsd) {
            let _ = v2gcodec::grammar::compile(&model);
        }
    }
});
