//! URL-side rules: mirroring writes, selfish cleanup and restore-on-touch.

use crate::codec;
use crate::error::Result;
use crate::registry::{self, PageStateDef};
use crate::schema::FieldMeta;
use crate::value::Value;

use super::session::PageSession;

/// Effect of one field write on the query parameters.
pub(super) enum UrlWrite {
    /// The field has no URL key.
    Skip,
    Remove(String),
    Set(String, String),
}

impl PageSession {
    /// Resolves what a write of `value` does to the URL, encoding up front so
    /// an unencodable value is rejected before any state changes.
    pub(super) fn plan_url_write(&self, def: &PageStateDef, meta: &FieldMeta, value: &Value) -> Result<UrlWrite> {
        let Some(key) = meta.prefixed_key(&def.config().url_prefix) else {
            return Ok(UrlWrite::Skip);
        };

        let empty = Value::Str(String::new());
        let value = if value.is_null() {
            if def.config().ignore_none_url {
                return Ok(UrlWrite::Remove(key));
            }
            &empty
        } else {
            value
        };

        let encoded = codec::encode(&key, value, meta.value_map.as_ref())?;
        Ok(UrlWrite::Set(key, encoded))
    }

    /// Mirrors a freshly written value into the query parameters.
    pub(super) fn sync_url(&mut self, def: &PageStateDef, write: UrlWrite) {
        if matches!(write, UrlWrite::Skip) {
            return;
        }

        if def.config().url_selfish {
            self.remove_foreign_params(def);
        }

        match write {
            UrlWrite::Set(key, encoded) => {
                tracing::trace!(target: "page_state.engine", stage = "url.write", key = %key, value = %encoded);
                self.params.set(&key, encoded);
            }
            UrlWrite::Remove(key) => {
                self.params.remove(&key);
            }
            UrlWrite::Skip => {}
        }
    }

    /// Deletes every parameter that neither this class nor a class it shares
    /// with owns. Returns the removed keys.
    pub(super) fn remove_foreign_params(&mut self, def: &PageStateDef) -> Vec<String> {
        let allowed = def.allowed_url_keys();
        let removed: Vec<String> = self
            .params
            .keys()
            .into_iter()
            .filter(|k| !allowed.contains(k))
            .collect();
        for key in &removed {
            self.params.remove(key);
        }
        if !removed.is_empty() {
            tracing::debug!(
                target: "page_state.engine",
                stage = "url.cleanup",
                class = %def.name(),
                removed = ?removed
            );
        }
        removed
    }

    /// Writes back owned parameters that are missing from the URL.
    ///
    /// Present parameters are never overwritten. Re-entrant calls for the same
    /// class while a restore is running are ignored.
    pub fn restore_url(&mut self, class: &str) -> Result<()> {
        let def = registry::require(class)?;
        self.restore_url_for(&def)
    }

    pub(super) fn restore_url_for(&mut self, def: &PageStateDef) -> Result<()> {
        if !self.restoring.insert(def.name().to_string()) {
            return Ok(());
        }
        let result = self.restore_missing_params(def);
        self.restoring.remove(def.name());
        result
    }

    fn restore_missing_params(&mut self, def: &PageStateDef) -> Result<()> {
        for meta in def.schema() {
            let Some(key) = meta.prefixed_key(&def.config().url_prefix) else {
                continue;
            };

            let mut value = self.read_field(def, meta)?;
            if value.is_null() {
                if def.config().ignore_none_url {
                    continue;
                }
                value = Value::Str(String::new());
            }

            if !self.params.contains(&key) {
                let encoded = match codec::encode(&key, &value, meta.value_map.as_ref()) {
                    Ok(encoded) => encoded,
                    Err(err) => {
                        tracing::warn!(
                            target: "page_state.engine",
                            stage = "url.restore_skip",
                            class = %def.name(),
                            key = %key,
                            error = %err
                        );
                        continue;
                    }
                };
                tracing::debug!(
                    target: "page_state.engine",
                    stage = "url.restore",
                    class = %def.name(),
                    key = %key
                );
                self.params.set(&key, encoded);
            }
        }
        Ok(())
    }

    /// Claims the URL for `class`: one selfish cleanup pass regardless of the
    /// class's `url_selfish` setting, still honouring `share_url_with`.
    pub fn focus(&mut self, class: &str) -> Result<Vec<String>> {
        let def = registry::require(class)?;
        Ok(self.remove_foreign_params(&def))
    }
}
