//! Narrow contracts of the host runtime: the URL query-parameter store and the
//! per-user session namespace, plus in-memory implementations of both.

use std::collections::HashMap;

use crate::value::Value;

/// The URL query string as an ordered string-to-string mapping.
pub trait ParamStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str) -> Option<String>;
    fn keys(&self) -> Vec<String>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Session-scoped storage that survives across page evaluations.
pub trait HostNamespace: Send {
    fn get(&self, key: &str) -> Option<&Value>;
    fn insert(&mut self, key: String, value: Value) -> Option<Value>;
    fn remove(&mut self, key: &str) -> Option<Value>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Insertion-ordered query parameters. Overwriting a key keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `k=v&k2=v2`, without percent-encoding.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.set(&k.into(), v.into());
        }
        params
    }
}

impl ParamStore for QueryParams {
    fn get(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn set(&mut self, key: &str, value: String) {
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.pairs.iter().position(|(k, _)| k == key)?;
        Some(self.pairs.remove(idx).1)
    }

    fn keys(&self) -> Vec<String> {
        self.pairs.iter().map(|(k, _)| k.clone()).collect()
    }
}

/// In-memory session namespace.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    entries: HashMap<String, Value>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl HostNamespace for SessionState {
    fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }
}
