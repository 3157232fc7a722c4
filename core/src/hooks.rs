//! Optional lifecycle callbacks a page-state class may provide.

use crate::engine::PageSession;
use crate::value::Value;

/// Lifecycle hooks, all no-ops unless overridden.
///
/// Hooks receive the session so they can read or write other fields; writes
/// made from a hook go through the normal write path.
pub trait StateHooks: Send + Sync {
    /// Called once, when the class namespace is first created in a session.
    fn on_init(&self, _session: &mut PageSession) {}

    /// Called before every write to any field of the class.
    fn before_set(&self, _session: &mut PageSession) {}

    /// Called after a write replaced a truthy value with a different one.
    fn on_change(&self, _session: &mut PageSession, _field: &str, _old: &Value, _new: &Value) {}
}

/// Hooks of a class that declares none.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl StateHooks for NoHooks {}
