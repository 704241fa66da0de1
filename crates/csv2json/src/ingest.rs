//! Upload pipeline: validate the file name, read, map, save.

use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::options::{Delimiter, Options};
use crate::store::DocumentStore;

/// Document name for an uploaded file: its stem, provided the extension is
/// exactly `csv`.
pub fn upload_name(filename: &str) -> Result<String> {
    let path = Path::new(filename);
    let is_csv = path.extension().and_then(|e| e.to_str()) == Some("csv");
    let stem = path.file_stem().and_then(|s| s.to_str()).filter(|s| !s.is_empty());
    match (is_csv, stem) {
        (true, Some(stem)) => Ok(stem.to_string()),
        _ => Err(Error::UnsupportedMediaType(filename.to_string())),
    }
}

/// Read CSV from `reader` and return the JSON array of its rows.
pub fn convert<R: Read>(reader: R, delimiter: Delimiter) -> Result<String> {
    convert_with_options(reader, &Options { delimiter, ..Options::default() })
}

pub fn convert_with_options<R: Read>(reader: R, options: &Options) -> Result<String> {
    let rows = crate::reader::read_rows(reader, options.delimiter)?;
    if options.pretty {
        let nodes = crate::mapper::map_rows(&rows)?;
        Ok(serde_json::to_string_pretty(&nodes)?)
    } else {
        crate::mapper::to_json_string(&rows)
    }
}

/// Convert an uploaded CSV file and store it under its stem.
///
/// `separator` is the raw token supplied by the client; see
/// [`Delimiter::resolve`].
pub fn ingest<R: Read>(store: &DocumentStore, filename: &str, reader: R, separator: &str) -> Result<i64> {
    let name = upload_name(filename)?;
    let delimiter = Delimiter::resolve(separator);
    let json = convert(reader, delimiter)?;
    let id = store.save_file(&name, &json)?;
    tracing::info!(id, %name, filename, %delimiter, "ingested upload");
    Ok(id)
}
