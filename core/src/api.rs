//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `page_state_core::api` instead of reaching into internal modules.

pub use crate::codec::{decode, encode, SEPARATOR};
pub use crate::config::{
    load_default, load_from_path, AppConfig, ClassConfig, LoggingConfig, PersistenceConfig, Ttl,
};
pub use crate::engine::{Binding, PageSession, IDENTITY_MARKER_KEY, SESSION_STATE_KEY};
pub use crate::error::{DecodeError, PageStateError, Result};
pub use crate::hooks::{NoHooks, StateHooks};
pub use crate::host::{HostNamespace, ParamStore, QueryParams, SessionState};
pub use crate::persistence::{
    deserialize_state, parse_value, render_value, serialize_state, MemoryStore, PersistenceBackend, RemoteStore,
    SessionIdentity, DEFAULT_SESSION_ID,
};
pub use crate::registry::{lookup, registered_names, PageStateBuilder, PageStateDef};
pub use crate::schema::{FieldMeta, ScalarKind, StateVar, TypeDescriptor, ValueMap};
pub use crate::value::Value;
