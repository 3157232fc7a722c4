//! Optional persistence of class namespaces to a remote key-value store.
//!
//! Keys are namespaced as `<prefix>:<session identity>:<ClassName>`; values
//! are JSON with a type-tagged envelope for non-primitive values.

pub mod backend;
pub mod envelope;
pub mod store;

pub use backend::{PersistenceBackend, SessionIdentity, DEFAULT_SESSION_ID};
pub use envelope::{deserialize_state, parse_value, render_value, serialize_state};
pub use store::{MemoryStore, RemoteStore};
