use serde::Serialize;

use crate::value::Value;

use super::types::TypeDescriptor;

/// Bijective table between internal values and their URL representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(Value, String)>,
}

impl ValueMap {
    pub fn new<I, V, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, S)>,
        V: Into<Value>,
        S: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(v, s)| (v.into(), s.into()))
                .collect(),
        }
    }

    /// URL string for an internal value. Callers must check hashability first.
    pub fn external_for(&self, value: &Value) -> Option<&str> {
        self.entries
            .iter()
            .find(|(internal, _)| internal == value)
            .map(|(_, external)| external.as_str())
    }

    /// Internal value for a URL string.
    pub fn internal_for(&self, external: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(_, e)| e == external)
            .map(|(internal, _)| internal)
    }

    /// First pair that breaks the one-to-one mapping, if any.
    pub(crate) fn first_conflict(&self) -> Option<String> {
        for (i, (value, external)) in self.entries.iter().enumerate() {
            for (other_value, other_external) in &self.entries[i + 1..] {
                if external == other_external {
                    return Some(format!("URL value '{external}' is mapped twice"));
                }
                if value == other_value {
                    return Some(format!("value '{value}' is mapped twice"));
                }
            }
        }
        None
    }
}

/// Declaration of one state variable.
///
/// ```
/// use page_state_core::schema::{StateVar, TypeDescriptor};
///
/// let status = StateVar::new(1)
///     .url_key("status")
///     .value_map([(0, "pending"), (1, "active"), (2, "archived")]);
/// let tags = StateVar::new(Vec::<String>::new())
///     .url_key("tags")
///     .typed(TypeDescriptor::list(TypeDescriptor::STR));
/// # let _ = (status, tags);
/// ```
#[derive(Debug, Clone)]
pub struct StateVar {
    pub(crate) default: Value,
    pub(crate) url_key: Option<String>,
    pub(crate) value_map: Option<ValueMap>,
    pub(crate) declared_type: Option<TypeDescriptor>,
}

impl StateVar {
    pub fn new(default: impl Into<Value>) -> Self {
        Self {
            default: default.into(),
            url_key: None,
            value_map: None,
            declared_type: None,
        }
    }

    pub fn url_key(mut self, key: impl Into<String>) -> Self {
        self.url_key = Some(key.into());
        self
    }

    pub fn value_map<I, V, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, S)>,
        V: Into<Value>,
        S: Into<String>,
    {
        self.value_map = Some(ValueMap::new(pairs));
        self
    }

    pub fn typed(mut self, ty: TypeDescriptor) -> Self {
        self.declared_type = Some(ty);
        self
    }

    pub(crate) fn into_meta(self, name: &str) -> FieldMeta {
        let declared_type = self
            .declared_type
            .unwrap_or_else(|| TypeDescriptor::infer(&self.default));
        FieldMeta {
            name: name.to_string(),
            default: self.default,
            url_key: self.url_key,
            value_map: self.value_map,
            declared_type,
        }
    }
}

/// Resolved metadata for one declared field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMeta {
    pub name: String,
    #[serde(serialize_with = "serialize_display")]
    pub default: Value,
    pub url_key: Option<String>,
    #[serde(skip)]
    pub value_map: Option<ValueMap>,
    pub declared_type: TypeDescriptor,
}

impl FieldMeta {
    /// External key with the owning class's prefix applied.
    pub fn prefixed_key(&self, prefix: &str) -> Option<String> {
        self.url_key.as_ref().map(|k| format!("{prefix}{k}"))
    }
}

fn serialize_display<S: serde::Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
