//! Attribute paths: header cells such as `address.tags[0]` read as a route
//! into a nested document.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object key
    Key(String),
    /// Array key; the index only drives descent for non-final segments
    Indexed { key: String, index: usize },
}

impl Segment {
    pub fn key(&self) -> &str {
        match self {
            Segment::Key(key) | Segment::Indexed { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    raw: String,
    segments: Vec<Segment>,
}

impl AttributePath {
    pub fn parse(raw: &str) -> Result<Self> {
        let segments = raw
            .split('.')
            .map(|seg| parse_segment(seg).map_err(|why| invalid(raw, why)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

fn invalid(raw: &str, why: &str) -> Error {
    Error::Mapping(format!("invalid attribute path '{}': {}", raw, why))
}

fn parse_segment(seg: &str) -> core::result::Result<Segment, &'static str> {
    let Some(open) = seg.find('[') else {
        if seg.contains(']') {
            return Err("unbalanced ']'");
        }
        return Ok(Segment::Key(seg.to_string()));
    };
    let key = &seg[..open];
    if key.is_empty() {
        return Err("array segment has no key");
    }
    let rest = &seg[open + 1..];
    let Some(close) = rest.find(']') else {
        return Err("missing ']'");
    };
    if close + 1 != rest.len() {
        return Err("unexpected characters after ']'");
    }
    let digits = &rest[..close];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err("array index must be a non-negative integer");
    }
    let index = digits
        .parse::<usize>()
        .map_err(|_| "array index out of range")?;
    Ok(Segment::Indexed {
        key: key.to_string(),
        index,
    })
}
