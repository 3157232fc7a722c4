#[allow(clippy::module_inception)]
pub mod error;
pub mod decode;

pub use decode::DecodeError;
pub use error::{PageStateError, Result};
