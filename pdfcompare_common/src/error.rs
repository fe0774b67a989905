use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfCompareError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to extract text from {}: {fallback} (primary strategy: {primary})", path.display())]
    Extraction {
        path: PathBuf,
        primary: BackendError,
        fallback: BackendError,
    },

    #[error("Comparison error: {0}")]
    Comparison(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("A comparison is already running")]
    Busy,
}

pub type Result<T> = std::result::Result<T, PdfCompareError>;

/// Failure of a single extraction strategy
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot open document: {0}")]
    Open(String),

    #[error("Page {index} could not be extracted: {reason}")]
    Page { index: usize, reason: String },

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Backend panicked: {0}")]
    Panicked(String),
}
