use csv2json::{DocumentStore, Error, filter_json, ingest};
use serde_json::json;

const PEOPLE: &str = "name,address.city,tags[0]\nann,oslo,a\nbo,rome,b\ncy,oslo,c\n";

#[test]
fn upload_list_get_and_filter() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let store = DocumentStore::open(dir.path().join("files.db"))?;

    let id = ingest(&store, "people.csv", PEOPLE.as_bytes(), ",")?;

    let all = store.get_all()?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
    assert_eq!(all[0].name, "people");
    assert!(all[0].size.ends_with(" B"));

    let doc = store.get_file("people")?;
    let filtered: serde_json::Value = serde_json::from_str(&filter_json(&doc, "address.city", "oslo")?)?;
    assert_eq!(
        filtered,
        json!([
            {"name": "ann", "address": {"city": "oslo"}, "tags": ["a"]},
            {"name": "cy", "address": {"city": "oslo"}, "tags": ["c"]}
        ])
    );
    assert_eq!(filter_json(&doc, "", "")?, doc);
    assert_eq!(filter_json(&doc, "name", "nobody")?, "[]");
    Ok(())
}

#[test]
fn reupload_replaces_document() -> Result<(), Box<dyn std::error::Error>> {
    let store = DocumentStore::open_in_memory()?;
    let first = ingest(&store, "people.csv", PEOPLE.as_bytes(), ",")?;
    let before = store.get_all()?.remove(0);
    let second = ingest(&store, "people.csv", "name\nzed\n".as_bytes(), ",")?;
    let after = store.get_all()?.remove(0);

    assert_eq!(first, second);
    assert!(after.time > before.time);
    assert_eq!(store.get_file("people")?, r#"[{"name":"zed"}]"#);
    Ok(())
}

#[test]
fn failures_are_typed() {
    let store = DocumentStore::open_in_memory().unwrap();
    assert!(matches!(store.get_file("ghost"), Err(Error::NotFound(_))));
    assert!(matches!(
        ingest(&store, "people.json", PEOPLE.as_bytes(), ","),
        Err(Error::UnsupportedMediaType(_))
    ));
    assert!(matches!(
        ingest(&store, "broken.csv", "a,b\n\"x,1\n".as_bytes(), ","),
        Err(Error::Parse { .. })
    ));
    assert!(matches!(
        ingest(&store, "collide.csv", "a,a.b\n1,2\n".as_bytes(), ","),
        Err(Error::Mapping(_))
    ));
}
