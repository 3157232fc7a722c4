use std::collections::{BTreeMap, HashSet};

use crate::host::{HostNamespace, ParamStore, QueryParams, SessionState};
use crate::registry::PageStateDef;
use crate::value::Value;

/// Host-namespace key holding every class namespace.
pub const SESSION_STATE_KEY: &str = "_st_page_state";

/// Host-namespace key holding the identity of the last persistence pass.
pub const IDENTITY_MARKER_KEY: &str = "_st_page_state_sid";

/// One user session: the URL parameters, the session namespace and the
/// per-class restore guards.
pub struct PageSession {
    pub(super) params: Box<dyn ParamStore>,
    pub(super) host: Box<dyn HostNamespace>,
    runtime_id: Option<String>,
    pub(super) restoring: HashSet<String>,
}

impl Default for PageSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSession {
    pub fn new() -> Self {
        Self::with_stores(QueryParams::new(), SessionState::new())
    }

    /// A session whose URL already carries `params`.
    pub fn with_params(params: QueryParams) -> Self {
        Self::with_stores(params, SessionState::new())
    }

    pub fn with_stores(
        params: impl ParamStore + 'static,
        host: impl HostNamespace + 'static,
    ) -> Self {
        Self {
            params: Box::new(params),
            host: Box::new(host),
            runtime_id: None,
            restoring: HashSet::new(),
        }
    }

    /// Session id assigned by the host runtime, if any.
    pub fn with_runtime_id(mut self, id: impl Into<String>) -> Self {
        self.runtime_id = Some(id.into());
        self
    }

    pub fn runtime_id(&self) -> Option<&str> {
        self.runtime_id.as_deref()
    }

    pub fn params(&self) -> &dyn ParamStore {
        self.params.as_ref()
    }

    /// Direct access for edits made outside the engine, e.g. a user typing a URL.
    pub fn params_mut(&mut self) -> &mut dyn ParamStore {
        self.params.as_mut()
    }

    pub fn param(&self, key: &str) -> Option<String> {
        self.params.get(key)
    }

    /// Current query parameters in URL order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .keys()
            .into_iter()
            .filter_map(|k| self.params.get(&k).map(|v| (k, v)))
            .collect()
    }

    pub fn host(&self) -> &dyn HostNamespace {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn HostNamespace {
        self.host.as_mut()
    }

    pub(crate) fn class_namespace(&self, class: &str) -> Option<&BTreeMap<String, Value>> {
        self.host
            .get(SESSION_STATE_KEY)?
            .as_map()?
            .get(class)?
            .as_map()
    }

    pub(crate) fn stored_value(&self, class: &str, field: &str) -> Option<&Value> {
        self.class_namespace(class)?.get(field)
    }

    /// Runs `f` on the namespace root, creating it when absent.
    pub(crate) fn with_root<R>(&mut self, f: impl FnOnce(&mut BTreeMap<String, Value>) -> R) -> R {
        let mut root = match self.host.remove(SESSION_STATE_KEY) {
            Some(Value::Map(m)) => m,
            _ => BTreeMap::new(),
        };
        let out = f(&mut root);
        self.host.insert(SESSION_STATE_KEY.to_string(), Value::Map(root));
        out
    }

    /// Creates the class namespace if needed, firing `on_init` exactly once.
    pub(crate) fn ensure_namespace(&mut self, def: &PageStateDef) {
        let created = self.with_root(|root| {
            if matches!(root.get(def.name()), Some(Value::Map(_))) {
                false
            } else {
                root.insert(def.name().to_string(), Value::Map(BTreeMap::new()));
                true
            }
        });
        if created {
            tracing::debug!(target: "page_state.engine", stage = "namespace.init", class = %def.name());
            def.hooks().on_init(self);
        }
    }

    /// Stores a field value and returns the previous one.
    pub(crate) fn store_value(&mut self, class: &str, field: &str, value: Value) -> Option<Value> {
        self.with_root(|root| {
            let ns = root
                .entry(class.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if !matches!(ns, Value::Map(_)) {
                *ns = Value::Map(BTreeMap::new());
            }
            ns.as_map_mut()
                .and_then(|m| m.insert(field.to_string(), value))
        })
    }

    /// Copy of every class namespace, skipping empty ones.
    pub(crate) fn snapshot_namespaces(&self) -> BTreeMap<String, BTreeMap<String, Value>> {
        let Some(root) = self.host.get(SESSION_STATE_KEY).and_then(Value::as_map) else {
            return BTreeMap::new();
        };
        root.iter()
            .filter_map(|(class, ns)| {
                ns.as_map()
                    .filter(|m| !m.is_empty())
                    .map(|m| (class.clone(), m.clone()))
            })
            .collect()
    }

    /// Merges persisted fields into a class namespace without firing hooks.
    pub(crate) fn merge_namespace(&mut self, class: &str, fields: BTreeMap<String, Value>) {
        self.with_root(|root| {
            let ns = root
                .entry(class.to_string())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            match ns {
                Value::Map(m) => m.extend(fields),
                other => *other = Value::Map(fields),
            }
        });
    }

    /// Drops every class namespace.
    pub(crate) fn clear_namespaces(&mut self) {
        self.host.remove(SESSION_STATE_KEY);
    }
}
