//! Structural mapper: builds one nested document per data row.
//!
//! Each header cell is an [`AttributePath`]. Walking a path creates the
//! objects and arrays it names, so `address.tags[0]` with value `x` yields
//! `{"address": {"tags": ["x"]}}`.
//!
//! Rules:
//! - A final indexed segment always appends; its index only marks the key as
//!   an array. `tags[5], tags[0]` with `x, y` produces `["x", "y"]`.
//! - A non-final indexed segment appends an empty object when the index is at
//!   or past the end, then descends into the element at that index. An index
//!   that is still out of range after the append is an error.
//! - A key that already holds a different kind of node than the path needs
//!   (object vs array vs scalar) is an error. Scalars overwrite scalars.
//! - Rows are mapped independently and strictly in input order.

use crate::error::{Error, Result};
use crate::path::{AttributePath, Segment};
use crate::reader::Row;
use crate::value::Node;

type Entries = Vec<(String, Node)>;

/// Header-derived mapping plan, reused for every data row.
#[derive(Debug, Clone)]
pub struct Mapper {
    paths: Vec<AttributePath>,
}

impl Mapper {
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self> {
        let paths = header
            .iter()
            .map(|cell| AttributePath::parse(cell.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { paths })
    }

    /// Map one data row. `row_no` is 1-based and only used in error messages.
    pub fn map_row<S: AsRef<str>>(&self, row_no: usize, row: &[S]) -> Result<Node> {
        if row.len() != self.paths.len() {
            return Err(Error::Mapping(format!(
                "row {} has {} fields, header has {}",
                row_no,
                row.len(),
                self.paths.len()
            )));
        }
        let mut root = Entries::new();
        for (path, cell) in self.paths.iter().zip(row) {
            insert(&mut root, path, cell.as_ref()).map_err(|why| {
                Error::Mapping(format!("row {}, column '{}': {}", row_no, path.as_str(), why))
            })?;
        }
        Ok(Node::Object(root))
    }
}

/// Map every data row of `rows`; the first row is the header.
pub fn map_rows(rows: &[Row]) -> Result<Vec<Node>> {
    let Some((header, data)) = rows.split_first() else {
        return Err(Error::Mapping("input is empty: a header row is required".to_string()));
    };
    let mapper = Mapper::from_header(header)?;
    let nodes = data
        .iter()
        .enumerate()
        .map(|(i, row)| mapper.map_row(i + 1, row))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(columns = header.len(), documents = nodes.len(), "mapped csv rows");
    Ok(nodes)
}

/// Map `rows` and serialize the documents as a compact JSON array.
pub fn to_json_string(rows: &[Row]) -> Result<String> {
    let nodes = map_rows(rows)?;
    Ok(serde_json::to_string(&nodes)?)
}

fn insert(root: &mut Entries, path: &AttributePath, value: &str) -> core::result::Result<(), String> {
    let segments = path.segments();
    let last = segments.len().saturating_sub(1);
    let mut current = root;
    for (pos, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Key(key) if pos == last => return set_scalar(current, key, value),
            Segment::Key(key) => match entry_or_insert(current, key, Node::object) {
                Node::Object(entries) => current = entries,
                other => return Err(format!("'{}' is {}, expected object", key, article(other))),
            },
            Segment::Indexed { key, index } => {
                let Node::Array(items) = entry_or_insert(current, key, || Node::Array(Vec::new()))
                else {
                    return Err(format!("'{}' already holds a non-array value", key));
                };
                if pos == last {
                    items.push(Node::Scalar(value.to_string()));
                    return Ok(());
                }
                if *index >= items.len() {
                    items.push(Node::object());
                }
                let len = items.len();
                match items.get_mut(*index) {
                    Some(Node::Object(entries)) => current = entries,
                    Some(other) => {
                        return Err(format!("'{}[{}]' is {}, expected object", key, index, article(other)));
                    }
                    None => {
                        return Err(format!(
                            "index {} of '{}' skips past the next slot ({})",
                            index, key, len - 1
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

fn set_scalar(entries: &mut Entries, key: &str, value: &str) -> core::result::Result<(), String> {
    match entries.iter_mut().find(|(k, _)| k == key) {
        Some((_, Node::Scalar(existing))) => {
            *existing = value.to_string();
            Ok(())
        }
        Some((_, other)) => Err(format!("'{}' is {}, expected scalar", key, article(other))),
        None => {
            entries.push((key.to_string(), Node::Scalar(value.to_string())));
            Ok(())
        }
    }
}

fn entry_or_insert<'a>(entries: &'a mut Entries, key: &str, default: impl FnOnce() -> Node) -> &'a mut Node {
    let pos = match entries.iter().position(|(k, _)| k == key) {
        Some(pos) => pos,
        None => {
            entries.push((key.to_string(), default()));
            entries.len() - 1
        }
    };
    &mut entries[pos].1
}

fn article(node: &Node) -> &'static str {
    match node {
        Node::Scalar(_) => "a scalar",
        Node::Object(_) => "an object",
        Node::Array(_) => "an array",
    }
}
