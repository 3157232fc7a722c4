use thiserror::Error;

/// Raised when an external parameter cannot be converted to its declared type.
///
/// Carries enough context to log a useful diagnostic before falling back to the
/// field's default.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to parse query param '{key}={raw}' as {target}: {cause}")]
pub struct DecodeError {
    pub key: String,
    pub raw: String,
    pub target: String,
    pub cause: String,
}

impl DecodeError {
    pub fn new(
        key: impl Into<String>,
        raw: impl Into<String>,
        target: impl ToString,
        cause: impl ToString,
    ) -> Self {
        Self {
            key: key.into(),
            raw: raw.into(),
            target: target.to_string(),
            cause: cause.to_string(),
        }
    }
}
