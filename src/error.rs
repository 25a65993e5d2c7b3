use thiserror::Error;

/// Main error type for stixrel
#[derive(Error, Debug)]
pub enum StixrelError {
    /// File system I/O errors (cache file, output file, registry file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Output serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parse errors (selectors, registry patterns)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using StixrelError
pub type Result<T> = std::result::Result<T, StixrelError>;
