//! Field reads and writes plus the class-level operations built on them.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codec;
use crate::error::{PageStateError, Result};
use crate::registry::{self, PageStateDef};
use crate::schema::FieldMeta;
use crate::value::Value;

use super::session::PageSession;

impl PageSession {
    /// Reads a field, initialising it from the URL or its default on first access.
    pub fn get(&mut self, class: &str, field: &str) -> Result<Value> {
        let def = registry::require(class)?;
        let meta = def.require_field(field)?;
        self.read_field(&def, meta)
    }

    /// Writes a field and mirrors it into the URL.
    pub fn set(&mut self, class: &str, field: &str, value: impl Into<Value>) -> Result<()> {
        let def = registry::require(class)?;
        let meta = def.require_field(field)?;
        self.write_field(&def, meta, value.into())
    }

    pub(super) fn read_field(&mut self, def: &PageStateDef, meta: &FieldMeta) -> Result<Value> {
        self.ensure_namespace(def);

        if let Some(value) = self.stored_value(def.name(), &meta.name).cloned() {
            if def.config().restore_url_on_touch {
                self.restore_url_for(def)?;
            }
            return Ok(value);
        }

        let value = self.initial_value(def, meta);
        self.write_field(def, meta, value.clone())?;
        Ok(value)
    }

    pub(super) fn write_field(&mut self, def: &PageStateDef, meta: &FieldMeta, value: Value) -> Result<()> {
        let url_write = self.plan_url_write(def, meta, &value)?;
        self.ensure_namespace(def);

        let hooks = def.hooks();
        hooks.before_set(self);

        let old = self.store_value(def.name(), &meta.name, value.clone());
        self.sync_url(def, url_write);

        if def.config().restore_url_on_touch {
            self.restore_url_for(def)?;
        }

        if let Some(old) = old {
            if old.is_truthy() && old != value {
                hooks.on_change(self, &meta.name, &old, &value);
            }
        }
        Ok(())
    }

    /// URL value if present and decodable, otherwise a copy of the default.
    /// Never writes.
    fn initial_value(&self, def: &PageStateDef, meta: &FieldMeta) -> Value {
        if let Some(key) = meta.prefixed_key(&def.config().url_prefix) {
            if let Some(raw) = self.params.get(&key) {
                match codec::decode(&key, &raw, &meta.declared_type, meta.value_map.as_ref()) {
                    Ok(Value::Null) => {}
                    Ok(value) => return value,
                    Err(err) => tracing::error!(
                        target: "page_state.engine",
                        stage = "url.decode",
                        class = %def.name(),
                        field = %meta.name,
                        key = %err.key,
                        raw = %err.raw,
                        target_type = %err.target,
                        cause = %err.cause,
                        "falling back to default value '{}'",
                        meta.default
                    ),
                }
            }
        }
        meta.default.clone()
    }

    /// Writes defaults back through the normal write path, for one field or all.
    pub fn reset(&mut self, class: &str, field: Option<&str>) -> Result<()> {
        let def = registry::require(class)?;
        if let Some(field) = field {
            let meta = def.require_field(field)?;
            return self.write_field(&def, meta, meta.default.clone());
        }
        for meta in def.schema() {
            self.write_field(&def, meta, meta.default.clone())?;
        }
        Ok(())
    }

    /// Shallow copy of the class's current values; empty if never touched.
    pub fn dump(&self, class: &str) -> Result<BTreeMap<String, Value>> {
        registry::require(class)?;
        Ok(self.class_namespace(class).cloned().unwrap_or_default())
    }

    /// Field metadata of a registered class.
    pub fn schema(&self, class: &str) -> Result<Vec<FieldMeta>> {
        Ok(registry::require(class)?.schema().to_vec())
    }

    /// Prepares a widget binding for `field`.
    ///
    /// The widget key is seeded only when absent, with `value` or else the
    /// field's current value. Binding itself never writes to the class.
    pub fn bind(&mut self, class: &str, field: &str, value: Option<Value>) -> Result<Binding> {
        let def = registry::require(class)?;
        let meta = def
            .field(field)
            .ok_or_else(|| PageStateError::InvalidBindTarget {
                class: class.to_string(),
                field: field.to_string(),
            })?;

        let key = format!("{}_{}_widget", def.name(), meta.name);
        if !self.host.contains(&key) {
            let initial = match value {
                Some(v) => v,
                None => match self.stored_value(def.name(), &meta.name) {
                    Some(v) => v.clone(),
                    None => self.initial_value(&def, meta),
                },
            };
            self.host.insert(key.clone(), initial);
        }

        Ok(Binding {
            def: Arc::clone(&def),
            field: meta.name.clone(),
            key,
        })
    }

    /// Value currently held by a widget key.
    pub fn widget_value(&self, key: &str) -> Option<&Value> {
        self.host.get(key)
    }

    /// Simulates the widget updating its own key, as the host does on user input.
    pub fn set_widget_value(&mut self, key: &str, value: impl Into<Value>) {
        self.host.insert(key.to_string(), value.into());
    }
}

/// A widget bound to one field.
#[derive(Debug, Clone)]
pub struct Binding {
    def: Arc<PageStateDef>,
    field: String,
    key: String,
}

impl Binding {
    /// Host key the widget reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Change callback: writes whatever the widget key holds now.
    pub fn on_change(&self, session: &mut PageSession) -> Result<()> {
        let value = session.host.get(&self.key).cloned().unwrap_or(Value::Null);
        let meta = self.def.require_field(&self.field)?;
        session.write_field(&self.def, meta, value)
    }
}
