//! Process-wide table of page-state class definitions.
//!
//! Classes are registered once at startup and looked up by name, both to
//! resolve `share_url_with` references and to find field metadata when
//! restoring persisted state.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::config::ClassConfig;
use crate::error::{PageStateError, Result};
use crate::hooks::{NoHooks, StateHooks};
use crate::schema::{FieldMeta, StateVar};
use crate::value::Value;

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, Arc<PageStateDef>>> = RwLock::new(HashMap::new());
}

/// A registered page-state class: its policy, its fields and its hooks.
pub struct PageStateDef {
    name: String,
    config: ClassConfig,
    fields: Vec<FieldMeta>,
    hooks: Arc<dyn StateHooks>,
}

impl std::fmt::Debug for PageStateDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStateDef")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl PageStateDef {
    pub fn builder(name: impl Into<String>) -> PageStateBuilder {
        PageStateBuilder {
            name: name.into(),
            config: ClassConfig::default(),
            fields: Vec::new(),
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ClassConfig {
        &self.config
    }

    /// Field metadata in declaration order.
    pub fn schema(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn require_field(&self, name: &str) -> Result<&FieldMeta> {
        self.field(name).ok_or_else(|| PageStateError::UnknownField {
            class: self.name.clone(),
            field: name.to_string(),
        })
    }

    pub(crate) fn hooks(&self) -> Arc<dyn StateHooks> {
        Arc::clone(&self.hooks)
    }

    /// Prefixed external keys owned by this class.
    pub fn url_keys(&self) -> HashSet<String> {
        self.fields
            .iter()
            .filter_map(|f| f.prefixed_key(&self.config.url_prefix))
            .collect()
    }

    /// Field owning a prefixed external key.
    pub fn field_for_url_key(&self, key: &str) -> Option<&FieldMeta> {
        self.fields
            .iter()
            .find(|f| f.prefixed_key(&self.config.url_prefix).as_deref() == Some(key))
    }

    /// Keys that survive this class's selfish cleanup: its own plus those of
    /// every class it shares with. Resolved against the registry on each call.
    pub fn allowed_url_keys(&self) -> HashSet<String> {
        let mut allowed = self.url_keys();
        for shared in &self.config.share_url_with {
            match lookup(shared) {
                Some(def) => allowed.extend(def.url_keys()),
                None => tracing::debug!(
                    target: "page_state.registry",
                    stage = "share.unresolved",
                    class = %self.name,
                    shared = %shared
                ),
            }
        }
        allowed
    }
}

pub struct PageStateBuilder {
    name: String,
    config: ClassConfig,
    fields: Vec<(String, StateVar)>,
    hooks: Arc<dyn StateHooks>,
}

impl PageStateBuilder {
    pub fn config(mut self, config: ClassConfig) -> Self {
        self.config = config;
        self
    }

    pub fn field(mut self, name: impl Into<String>, var: StateVar) -> Self {
        self.fields.push((name.into(), var));
        self
    }

    pub fn hooks(mut self, hooks: impl StateHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Validates the declaration and resolves field types.
    pub fn build(self) -> Result<PageStateDef> {
        let invalid = |reason: String| PageStateError::InvalidSchema {
            class: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("class name is empty".to_string()));
        }

        let mut names = HashSet::new();
        let mut url_keys = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, var) in &self.fields {
            if !names.insert(name.as_str()) {
                return Err(invalid(format!("field '{name}' is declared twice")));
            }
            let meta = var.clone().into_meta(name);
            if let Some(key) = meta.prefixed_key(&self.config.url_prefix) {
                if matches!(meta.default, Value::Map(_)) {
                    return Err(invalid(format!(
                        "field '{name}' has a map default, which has no URL form for key '{key}'"
                    )));
                }
                if !url_keys.insert(key.clone()) {
                    return Err(invalid(format!("URL key '{key}' is used by more than one field")));
                }
            }
            if let Some(conflict) = meta.value_map.as_ref().and_then(|m| m.first_conflict()) {
                return Err(invalid(format!("value map of '{name}': {conflict}")));
            }
            fields.push(meta);
        }

        Ok(PageStateDef {
            name: self.name,
            config: self.config,
            fields,
            hooks: self.hooks,
        })
    }

    /// Builds and registers the class, replacing any earlier class of the same name.
    pub fn register(self) -> Result<Arc<PageStateDef>> {
        let def = Arc::new(self.build()?);
        let previous = REGISTRY
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(def.name.clone(), Arc::clone(&def));
        tracing::debug!(
            target: "page_state.registry",
            stage = "register",
            class = %def.name,
            fields = def.fields.len(),
            replaced = previous.is_some()
        );
        Ok(def)
    }
}

pub fn lookup(name: &str) -> Option<Arc<PageStateDef>> {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(name)
        .cloned()
}

pub(crate) fn require(name: &str) -> Result<Arc<PageStateDef>> {
    lookup(name).ok_or_else(|| PageStateError::UnknownClass(name.to_string()))
}

pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeDescriptor;

    #[test]
    fn builds_metadata_in_declaration_order() {
        let def = PageStateDef::builder("RegistryOrder")
            .field("b", StateVar::new(1).url_key("b"))
            .field("a", StateVar::new("x"))
            .build()
            .unwrap();
        let names: Vec<_> = def.schema().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(def.field("b").unwrap().declared_type, TypeDescriptor::INT);
        assert_eq!(def.url_keys(), HashSet::from(["b".to_string()]));
    }

    #[test]
    fn rejects_duplicate_prefixed_keys() {
        let err = PageStateDef::builder("RegistryDupKey")
            .field("a", StateVar::new(1).url_key("k"))
            .field("b", StateVar::new(2).url_key("k"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PageStateError::InvalidSchema { .. }));
    }

    #[test]
    fn rejects_url_key_on_map_default() {
        let err = PageStateDef::builder("RegistryMapUrl")
            .field("meta", StateVar::new(Value::Map(Default::default())).url_key("m"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PageStateError::InvalidSchema { .. }));

        assert!(PageStateDef::builder("RegistryMapLocal")
            .field("meta", StateVar::new(Value::Map(Default::default())))
            .build()
            .is_ok());
    }

    #[test]
    fn rejects_non_bijective_value_maps() {
        let err = PageStateDef::builder("RegistryBadMap")
            .field("s", StateVar::new(0).value_map([(0, "x"), (1, "x")]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("mapped twice"), "{err}");
    }

    #[test]
    fn shared_keys_resolve_through_registry() {
        PageStateDef::builder("RegistrySharedTarget")
            .config(ClassConfig::default().url_prefix("t_"))
            .field("q", StateVar::new("").url_key("q"))
            .register()
            .unwrap();
        let def = PageStateDef::builder("RegistrySharer")
            .config(ClassConfig::default().share_url_with(["RegistrySharedTarget", "Nope"]))
            .field("p", StateVar::new(1).url_key("p"))
            .register()
            .unwrap();

        let allowed = def.allowed_url_keys();
        assert!(allowed.contains("p"));
        assert!(allowed.contains("t_q"));
        assert_eq!(allowed.len(), 2);
        assert!(registered_names().contains(&"RegistrySharer".to_string()));
    }
}
