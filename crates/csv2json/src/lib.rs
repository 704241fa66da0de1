#![doc = include_str!("../README.md")]

pub mod error;
pub mod options;
pub mod value;
pub mod path;
pub mod reader;
pub mod mapper;
pub mod filter;
pub mod store;
pub mod ingest;

pub use crate::error::{Error, Result};
pub use crate::filter::filter_json;
pub use crate::ingest::{convert, ingest, upload_name};
pub use crate::options::{Delimiter, Options};
pub use crate::store::{DocumentStore, FileRecord};
pub use crate::value::Node;

use std::io::Read;

/// Convert CSV read from `reader` to a JSON array, one object per data row.
pub fn csv_to_json<R: Read>(reader: R, options: &Options) -> Result<String> {
    crate::ingest::convert_with_options(reader, options)
}

/// Convert CSV text to a JSON array.
pub fn csv_str_to_json(s: &str, options: &Options) -> Result<String> {
    csv_to_json(s.as_bytes(), options)
}
