#![no_main]
use csv2json::{Delimiter, Options, csv_to_json};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&sep, body)) = data.split_first() else {
        return;
    };
    let delimiter = match sep % 4 {
        0 => Delimiter::Comma,
        1 => Delimiter::Pipe,
        2 => Delimiter::Semicolon,
        _ => Delimiter::Tilde,
    };
    let options = Options { delimiter, pretty: false };
    if let Ok(json) = csv_to_json(body, &options) {
        let v: serde_json::Value = serde_json::from_str(&json)
            .unwrap_or_else(|e| panic!("converter produced invalid JSON: {e}\n{json}"));
        assert!(v.is_array(), "converter output is not an array: {json}");
    }
});
