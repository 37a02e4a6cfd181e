//! Export entities
//!
//! Everything needed to move a pipeline between its declarative on-the-wire
//! form and the internal model:
//! - `format`: JSON/YAML detection and (de)serialization
//! - `pipeline`: the declarative pipeline schema and its domain conversion
//! - `opener`: local file and remote URL sources

pub mod format;
pub mod opener;
pub mod pipeline;

pub use format::Format;
pub use opener::Opener;
pub use pipeline::{ConversionError, PipelineV1};

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors raised by the codec and the source opener
#[derive(Debug, Error)]
pub enum ExportError {
    /// Unknown format tag, suffix, or content-type
    #[error("unsupported format")]
    UnsupportedFormat,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Strict decoding met a field absent from the destination schema
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unable to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ExportError {
    /// True when a remote read hit its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExportError::Http { source, .. } if source.is_timeout())
    }
}
