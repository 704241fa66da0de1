use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", parse_message(.line, .message))]
    Parse { line: Option<u64>, message: String },

    #[error("mapping error: {0}")]
    Mapping(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("unsupported media type: {0} is not a csv file")]
    UnsupportedMediaType(String),

    #[error("filter error: {0}")]
    Filter(String),

    #[error("serde_json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn parse_message(line: &Option<u64>, message: &str) -> String {
    match line {
        Some(line) => format!("failed to parse csv at line {}: {}", line, message),
        None => format!("failed to parse csv: {}", message),
    }
}

impl Error {
    pub(crate) fn parse_at(line: u64, message: impl Into<String>) -> Self {
        Error::Parse { line: Some(line), message: message.into() }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
