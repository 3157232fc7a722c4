//! JSON envelope for persisted state: `{"__type__": ..., "__value__": ...}`
//! for tuples, sets, temporal values and bytes; primitives pass through.

use std::collections::BTreeMap;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::codec::{
    format_date, format_datetime, format_time, parse_date, parse_datetime, parse_time,
};
use crate::value::Value;

const TYPE_TAG: &str = "__type__";
const VALUE_TAG: &str = "__value__";

pub fn serialize_state(data: &BTreeMap<String, Value>) -> anyhow::Result<String> {
    let obj: JsonMap<String, Json> = data
        .iter()
        .map(|(k, v)| (k.clone(), to_json(v)))
        .collect();
    serde_json::to_string(&obj).context("failed to serialize state")
}

pub fn deserialize_state(raw: &str) -> anyhow::Result<BTreeMap<String, Value>> {
    let parsed: Json = serde_json::from_str(raw).context("failed to parse stored state")?;
    match from_json(parsed) {
        Value::Map(m) => Ok(m),
        other => anyhow::bail!("stored state is a {}, expected an object", other.kind_name()),
    }
}

/// One value in envelope JSON, e.g. `{"__type__": "set", "__value__": [1, 2]}`.
pub fn parse_value(raw: &str) -> anyhow::Result<Value> {
    let parsed: Json = serde_json::from_str(raw).context("invalid JSON value")?;
    Ok(from_json(parsed))
}

pub fn render_value(value: &Value) -> anyhow::Result<String> {
    serde_json::to_string(&to_json(value)).context("failed to render value")
}

fn tagged(tag: &str, value: Json) -> Json {
    let mut obj = JsonMap::new();
    obj.insert(TYPE_TAG.to_string(), Json::String(tag.to_string()));
    obj.insert(VALUE_TAG.to_string(), value);
    Json::Object(obj)
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => match Number::from_f64(*f) {
            Some(n) => Json::Number(n),
            None => {
                tracing::warn!(
                    target: "page_state.persistence",
                    stage = "envelope.skip",
                    value = %f,
                    "non-finite float replaced with null"
                );
                Json::Null
            }
        },
        Value::Str(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Tuple(items) => tagged("tuple", Json::Array(items.iter().map(to_json).collect())),
        Value::Set(items) => tagged("set", Json::Array(items.iter().map(to_json).collect())),
        Value::DateTime(dt) => tagged("datetime", Json::String(format_datetime(dt))),
        Value::Date(d) => tagged("date", Json::String(format_date(d))),
        Value::Time(t) => tagged("time", Json::String(format_time(t))),
        Value::Bytes(b) => tagged("bytes", Json::String(STANDARD.encode(b))),
        Value::Map(m) => Json::Object(m.iter().map(|(k, v)| (k.clone(), to_json(v))).collect()),
    }
}

fn from_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Str(s),
        Json::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
        Json::Object(obj) => from_object(obj),
    }
}

fn from_object(obj: JsonMap<String, Json>) -> Value {
    let tag = obj.get(TYPE_TAG).and_then(Json::as_str).map(str::to_string);
    if let (Some(tag), Some(inner)) = (tag.as_deref(), obj.get(VALUE_TAG)) {
        if let Some(value) = untag(tag, inner) {
            return value;
        }
    }
    Value::Map(obj.into_iter().map(|(k, v)| (k, from_json(v))).collect())
}

/// Rebuilds a tagged value; `None` for unknown tags or malformed payloads.
fn untag(tag: &str, inner: &Json) -> Option<Value> {
    let items = || {
        inner
            .as_array()
            .map(|a| a.iter().cloned().map(from_json).collect::<Vec<_>>())
    };
    let text = || inner.as_str();
    match tag {
        "tuple" => items().map(Value::Tuple),
        "set" => items().map(Value::set),
        "datetime" => parse_datetime(text()?).ok().map(Value::DateTime),
        "date" => parse_date(text()?).ok().map(Value::Date),
        "time" => parse_time(text()?).ok().map(Value::Time),
        "bytes" => STANDARD.decode(text()?).ok().map(Value::Bytes),
        _ => None,
    }
}
