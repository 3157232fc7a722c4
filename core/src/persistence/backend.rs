use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::config::PersistenceConfig;
use crate::engine::{PageSession, IDENTITY_MARKER_KEY};
use crate::registry;
use crate::value::Value;

use super::envelope::{deserialize_state, serialize_state};
use super::store::RemoteStore;

/// Identity used when neither a fixed id nor a runtime id is available.
pub const DEFAULT_SESSION_ID: &str = "default";

const SCAN_PAGE_SIZE: usize = 100;

type ClassFields = BTreeMap<String, Value>;

/// How the identity that namespaces stored state is resolved on each pass.
#[derive(Clone, Default)]
pub enum SessionIdentity {
    /// The host runtime's session id, or `"default"` outside a runtime.
    #[default]
    Runtime,
    Fixed(String),
    /// Called on every pass, e.g. to follow a logged-in user.
    Resolver(Arc<dyn Fn() -> String + Send + Sync>),
}

impl SessionIdentity {
    pub fn resolver(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        SessionIdentity::Resolver(Arc::new(f))
    }
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionIdentity::Runtime => f.write_str("Runtime"),
            SessionIdentity::Fixed(id) => f.debug_tuple("Fixed").field(id).finish(),
            SessionIdentity::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Loads class namespaces at the start of a page pass and saves them, in the
/// background, at the end.
pub struct PersistenceBackend {
    store: Arc<dyn RemoteStore>,
    key_prefix: String,
    default_ttl: Option<u64>,
    identity: SessionIdentity,
    last_save: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceBackend {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::from_config(store, &PersistenceConfig::default())
    }

    pub fn from_config(store: Arc<dyn RemoteStore>, cfg: &PersistenceConfig) -> Self {
        let identity = match &cfg.session_id {
            Some(id) => SessionIdentity::Fixed(id.clone()),
            None => SessionIdentity::Runtime,
        };
        Self {
            store,
            key_prefix: cfg.key_prefix.clone(),
            default_ttl: cfg.default_ttl,
            identity,
            last_save: Mutex::new(None),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Option<u64>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_identity(mut self, identity: SessionIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn default_ttl(&self) -> Option<u64> {
        self.default_ttl
    }

    pub fn key(&self, class: &str, session_id: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, session_id, class)
    }

    /// Class `ttl` override, else the backend default, else no expiry.
    pub fn resolve_ttl(&self, class: &str) -> Option<u64> {
        match registry::lookup(class).and_then(|def| def.config().ttl) {
            Some(ttl) => ttl.as_secs(),
            None => self.default_ttl,
        }
    }

    pub fn resolve_identity(&self, session: &PageSession) -> String {
        match &self.identity {
            SessionIdentity::Fixed(id) => id.clone(),
            SessionIdentity::Resolver(f) => f(),
            SessionIdentity::Runtime => session
                .runtime_id()
                .unwrap_or(DEFAULT_SESSION_ID)
                .to_string(),
        }
    }

    pub async fn load(&self, class: &str, session_id: &str) -> Option<ClassFields> {
        let key = self.key(class, session_id);
        let loaded = match self.store.get(&key).await {
            Ok(Some(raw)) => deserialize_state(&raw).map(Some),
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };
        loaded.unwrap_or_else(|err| {
            tracing::warn!(target: "page_state.persistence", stage = "load.failed", key = %key, error = %err);
            None
        })
    }

    /// Every class namespace stored for `session_id`, found by key scan.
    pub async fn load_all(&self, session_id: &str) -> BTreeMap<String, ClassFields> {
        let key_head = self.key("", session_id);
        let pattern = format!("{}*", glob::Pattern::escape(&key_head));
        let mut result = BTreeMap::new();
        let mut cursor = 0;
        loop {
            let (next, keys) = match self.store.scan(cursor, &pattern, SCAN_PAGE_SIZE).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(
                        target: "page_state.persistence",
                        stage = "scan.failed",
                        pattern = %pattern,
                        error = %err
                    );
                    break;
                }
            };
            for key in keys {
                let Some(class) = key.strip_prefix(&key_head) else {
                    continue;
                };
                if let Some(data) = self.load(class, session_id).await {
                    if !data.is_empty() {
                        result.insert(class.to_string(), data);
                    }
                }
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        result
    }

    pub async fn save(&self, class: &str, session_id: &str, data: &ClassFields, ttl: Option<u64>) {
        save_entry(self.store.as_ref(), &self.key(class, session_id), data, ttl).await;
    }

    pub async fn delete(&self, class: &str, session_id: &str) {
        let key = self.key(class, session_id);
        if let Err(err) = self.store.delete(&key).await {
            tracing::warn!(target: "page_state.persistence", stage = "delete.failed", key = %key, error = %err);
        }
    }

    pub async fn ping(&self) -> bool {
        self.store.ping().await.unwrap_or(false)
    }

    /// Start of a page pass: handles identity changes, then loads stored state.
    ///
    /// Classes whose namespace is already populated are skipped, as are fields
    /// whose URL parameter is present, so a shared link wins over stored state.
    pub async fn begin_pass(&self, session: &mut PageSession) -> String {
        let sid = self.resolve_identity(session);

        let previous = session
            .host()
            .get(IDENTITY_MARKER_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(previous) = previous.filter(|p| *p != sid) {
            session.clear_namespaces();
            tracing::debug!(
                target: "page_state.persistence",
                stage = "identity.changed",
                from = %previous,
                to = %sid,
                "session state cleared"
            );
        }
        session
            .host_mut()
            .insert(IDENTITY_MARKER_KEY.to_string(), Value::Str(sid.clone()));

        let present: HashSet<String> = session.params().keys().into_iter().collect();
        for (class, fields) in self.load_all(&sid).await {
            if session.class_namespace(&class).is_some_and(|ns| !ns.is_empty()) {
                continue;
            }

            let fields = drop_url_overridden(&class, fields, &present);
            if fields.is_empty() {
                continue;
            }

            tracing::debug!(
                target: "page_state.persistence",
                stage = "load.restored",
                class = %class,
                fields = fields.len(),
                session = %sid
            );
            session.merge_namespace(&class, fields);
        }
        sid
    }

    /// End of a page pass: snapshots every namespace and saves it on a
    /// detached task. Later passes never wait for it.
    pub fn end_pass(&self, session: &PageSession, session_id: &str) {
        let payloads: Vec<(String, ClassFields, Option<u64>)> = session
            .snapshot_namespaces()
            .into_iter()
            .map(|(class, data)| {
                let ttl = self.resolve_ttl(&class);
                (self.key(&class, session_id), data, ttl)
            })
            .collect();
        if payloads.is_empty() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                target: "page_state.persistence",
                stage = "save.dropped",
                reason = "no async runtime"
            );
            return;
        };

        let store = Arc::clone(&self.store);
        let session_id = session_id.to_string();
        let handle = runtime.spawn(async move {
            let saves = payloads
                .iter()
                .map(|(key, data, ttl)| save_entry(store.as_ref(), key, data, *ttl));
            futures::future::join_all(saves).await;
            tracing::debug!(
                target: "page_state.persistence",
                stage = "save.done",
                classes = payloads.len(),
                session = %session_id
            );
        });
        *self.last_save.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Runs one page pass between `begin_pass` and `end_pass`.
    pub async fn run_pass<F, R>(&self, session: &mut PageSession, f: F) -> R
    where
        F: FnOnce(&mut PageSession) -> R,
    {
        let sid = self.begin_pass(session).await;
        let out = f(session);
        self.end_pass(session, &sid);
        out
    }

    /// Waits for the most recent background save to settle.
    pub async fn wait_for_save(&self) {
        let handle = self
            .last_save
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!(target: "page_state.persistence", stage = "save.join", error = %err);
            }
        }
    }
}

async fn save_entry(store: &dyn RemoteStore, key: &str, data: &ClassFields, ttl: Option<u64>) {
    let payload = match serialize_state(data) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(target: "page_state.persistence", stage = "save.failed", key = %key, error = %err);
            return;
        }
    };
    let written = match ttl {
        Some(secs) if secs > 0 => store.set_ex(key, secs, payload).await,
        _ => store.set(key, payload).await,
    };
    match written {
        Ok(()) => tracing::debug!(
            target: "page_state.persistence",
            stage = "save.written",
            key = %key,
            fields = data.len(),
            ttl = ?ttl
        ),
        Err(err) => {
            tracing::warn!(target: "page_state.persistence", stage = "save.failed", key = %key, error = %err)
        }
    }
}

/// Removes fields whose URL parameter is currently present.
fn drop_url_overridden(class: &str, fields: ClassFields, present: &HashSet<String>) -> ClassFields {
    let Some(def) = registry::lookup(class) else {
        return fields;
    };
    let prefix = &def.config().url_prefix;
    fields
        .into_iter()
        .filter(|(name, _)| {
            let overridden = def
                .field(name)
                .and_then(|meta| meta.prefixed_key(prefix))
                .is_some_and(|key| present.contains(&key));
            if overridden {
                tracing::debug!(
                    target: "page_state.persistence",
                    stage = "load.skip_field",
                    class = %class,
                    field = %name,
                    "URL parameter takes precedence"
                );
            }
            !overridden
        })
        .collect()
}
