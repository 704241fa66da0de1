#![no_main]
use arbitrary::Arbitrary;
use csv2json::mapper::map_rows;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

// Arbitrary headers and rows must map or fail cleanly, never panic.
fuzz_target!(|table: Table| {
    let width = table.header.len();
    let mut rows = vec![table.header];
    rows.extend(table.rows.into_iter().take(16).map(|mut r| {
        r.resize(width, String::new());
        r
    }));
    if let Ok(docs) = map_rows(&rows) {
        assert_eq!(docs.len(), rows.len() - 1);
        let json = serde_json::to_string(&docs).unwrap();
        let _: serde_json::Value = serde_json::from_str(&json).unwrap();
    }
});
