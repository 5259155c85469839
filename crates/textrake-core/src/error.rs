use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextrakeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("invalid pattern for field '{field}': {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, TextrakeError>;
