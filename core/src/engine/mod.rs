//! The synchronisation engine.
//!
//! Every read and write of a declared field goes through [`PageSession`]: it
//! lazily initialises values from the URL or the declared default, mirrors
//! writes into the query parameters and enforces URL ownership between
//! classes. All operations run to completion synchronously.

mod ops;
mod session;
mod sync;

pub use ops::Binding;
pub use session::{PageSession, IDENTITY_MARKER_KEY, SESSION_STATE_KEY};
