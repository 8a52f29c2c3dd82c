use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("store rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("batch exceeds the limit of {max} writes")]
    BatchTooLarge { max: usize },
    #[error("invalid document id '{0}'")]
    InvalidDocumentId(String),
    #[error("could not decode store response: {0}")]
    Decode(String),
}

impl StoreError {
    pub(crate) fn transport(err: impl fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub(crate) fn decode(err: impl fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}
