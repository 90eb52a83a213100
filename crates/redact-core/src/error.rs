use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedactError {
    #[error("Input document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Detector '{detector}' failed: {message}")]
    Detector {
        detector: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("Failed to save document to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RedactError {
    /// True for failures that happen before any page is touched
    pub fn is_open_error(&self) -> bool {
        matches!(self, RedactError::NotFound(_) | RedactError::Parse(_))
    }
}

impl From<lopdf::Error> for RedactError {
    fn from(err: lopdf::Error) -> Self {
        RedactError::Pdf(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RedactError>;
