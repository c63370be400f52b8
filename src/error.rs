//! Error types for the export pipeline.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("activity {id} not found in {path}")]
    NotFound { id: i64, path: PathBuf },

    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("XML error: {0}")]
    Xml(String),
}

impl ExportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short label of the pipeline stage that failed, for diagnostics.
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input validation",
            Self::Io { .. } => "file access",
            Self::Database(_) => "database query",
            Self::NotFound { .. } => "activity lookup",
            Self::MalformedData(_) => "malformed data",
            Self::Xml(_) => "TCX serialization",
        }
    }
}

impl From<quick_xml::Error> for ExportError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
