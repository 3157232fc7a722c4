use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Minimal key-value contract the persistence adapter needs.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    fn name(&self) -> &str;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;
    async fn set_ex(&self, key: &str, ttl_secs: u64, value: String) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    /// One page of keys matching a glob `pattern`; a returned cursor of 0 ends the scan.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> anyhow::Result<(u64, Vec<String>)>;
    async fn ping(&self) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl_secs: Option<u64>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    offline: bool,
}

/// In-process store with expiring keys and glob scans.
///
/// Clones share the same data. `set_offline(true)` makes every call fail,
/// which is how connectivity loss is exercised.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// TTL recorded by the last `set_ex` on `key`; `None` for plain `set` or missing keys.
    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.lock().entries.get(key).and_then(|e| e.ttl_secs)
    }

    /// Live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .lock()
            .entries
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn online(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Inner>> {
        let guard = self.lock();
        if guard.offline {
            anyhow::bail!("connection refused");
        }
        Ok(guard)
    }

    fn write(&self, key: &str, value: String, ttl_secs: Option<u64>) -> anyhow::Result<()> {
        let expires_at = ttl_secs.map(|s| Instant::now() + Duration::from_secs(s));
        self.online()?.entries.insert(
            key.to_string(),
            Entry {
                value,
                ttl_secs,
                expires_at,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let now = Instant::now();
        Ok(self
            .online()?
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.write(key, value, None)
    }

    async fn set_ex(&self, key: &str, ttl_secs: u64, value: String) -> anyhow::Result<()> {
        self.write(key, value, Some(ttl_secs))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.online()?.entries.remove(key);
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> anyhow::Result<(u64, Vec<String>)> {
        let pattern = glob::Pattern::new(pattern)?;
        let now = Instant::now();
        let mut matched: Vec<String> = self
            .online()?
            .entries
            .iter()
            .filter(|(k, e)| e.is_live(now) && pattern.matches(k))
            .map(|(k, _)| k.clone())
            .collect();
        matched.sort();

        let start = cursor as usize;
        let end = start.saturating_add(count.max(1)).min(matched.len());
        let page = matched.get(start..end).map(<[String]>::to_vec).unwrap_or_default();
        let next = if end >= matched.len() { 0 } else { end as u64 };
        Ok((next, page))
    }

    async fn ping(&self) -> anyhow::Result<bool> {
        drop(self.online()?);
        Ok(true)
    }
}
