//! Error types returned by the extraction pipeline.

/// Error type for Readability operations.
#[derive(Debug, thiserror::Error)]
pub enum ReadabilityError {
    /// The document URL is not an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The document has more elements than the configured ceiling.
    #[error("Aborting parsing document; {found} elements found (limit {limit})")]
    TooManyElements { found: usize, limit: usize },

    /// A structured-data block could not be decoded.
    #[error("Malformed JSON-LD: {0}")]
    JsonLd(#[from] serde_json::Error),
}

/// Result type alias for Readability operations.
pub type Result<T> = std::result::Result<T, ReadabilityError>;
