use thiserror::Error;

/// Errors surfaced by the engine and its ambient plumbing.
///
/// Sparse or unrecognisable text is never an error: extractors degrade to
/// empty lists and default scores instead.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Input too short: {len} characters (minimum {min}), provide more text")]
    InputTooShort { len: usize, min: usize },

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),
}

/// Failures of the optional refinement pass. Always swallowed by the engine.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("Refinement disabled: {0}")]
    Disabled(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Refiner API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse refiner response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed refiner response: {0}")]
    Malformed(String),

    #[error("Refiner timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;
