use thiserror::Error;

/// Failures that stop a decoder call. Bad rows never end up here; they are
/// skipped.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid shot record JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
