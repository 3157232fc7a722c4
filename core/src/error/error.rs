use thiserror::Error;

use super::decode::DecodeError;

pub type Result<T, E = PageStateError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum PageStateError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("cannot encode '{key}': {reason}")]
    Encode { key: String, reason: String },

    #[error("page state class '{0}' is not registered")]
    UnknownClass(String),

    #[error("'{class}' object has no attribute '{field}'")]
    UnknownField { class: String, field: String },

    #[error("field '{field}' is not defined in the page state '{class}'")]
    InvalidBindTarget { class: String, field: String },

    #[error("invalid schema for '{class}': {reason}")]
    InvalidSchema { class: String, reason: String },

    #[error("config error: {0}")]
    Config(String),
}

impl PageStateError {
    /// Programmer errors (unknown names, bad schemas) as opposed to data errors.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownClass(_)
                | Self::UnknownField { .. }
                | Self::InvalidBindTarget { .. }
                | Self::InvalidSchema { .. }
        )
    }
}
