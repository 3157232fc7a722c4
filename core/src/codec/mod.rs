//! Conversion between typed values and their query-parameter text.
//!
//! Scalars use their plain textual form (ISO-8601 for temporal values).
//! Collections become a JSON array of recursively encoded items, wrapped in a
//! single URL-safe base64 token. Decoding also understands the older
//! `a||b||c` form.

mod scalar;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

use crate::error::{DecodeError, PageStateError};
use crate::schema::{TypeDescriptor, ValueMap};
use crate::value::Value;

pub(crate) use scalar::{
    format_date, format_datetime, format_time, parse_date, parse_datetime, parse_time,
};

/// Separator of the legacy collection format.
pub const SEPARATOR: &str = "||";

/// URL-safe base64, padded on encode and lenient about padding on decode.
pub(crate) const URL_TOKEN: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encodes a value for the URL.
///
/// `value_map` wins over the generic form whenever the value is hashable and
/// present in the map. Unhashable values skip the lookup entirely.
pub fn encode(key: &str, value: &Value, value_map: Option<&ValueMap>) -> Result<String, PageStateError> {
    let mut converted = match value {
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => {
            let encoded = items
                .iter()
                .enumerate()
                .map(|(i, item)| encode(&format!("{key}[{i}]"), item, value_map))
                .collect::<Result<Vec<_>, _>>()?;
            let json = serde_json::to_string(&encoded).map_err(|e| PageStateError::Encode {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
            URL_TOKEN.encode(json)
        }
        Value::Map(_) => {
            return Err(PageStateError::Encode {
                key: key.to_string(),
                reason: "maps have no query-parameter representation".to_string(),
            })
        }
        other => scalar::format_scalar(other).unwrap_or_default(),
    };

    if let Some(map) = value_map {
        if value.is_hashable() {
            if let Some(external) = map.external_for(value) {
                converted = external.to_string();
            }
        }
    }

    Ok(converted)
}

/// Decodes URL text into a value of the declared type.
///
/// `value_map` is consulted before type conversion; a mapped value that already
/// has the target shape is returned as-is.
pub fn decode(
    key: &str,
    raw: &str,
    ty: &TypeDescriptor,
    value_map: Option<&ValueMap>,
) -> Result<Value, DecodeError> {
    if let Some(mapped) = value_map.and_then(|map| map.internal_for(raw)) {
        return coerce(key, raw, mapped, ty);
    }
    decode_plain(key, raw, ty)
}

fn coerce(key: &str, raw: &str, mapped: &Value, ty: &TypeDescriptor) -> Result<Value, DecodeError> {
    let matches_type = match (ty, mapped) {
        (TypeDescriptor::Scalar(kind), value) => TypeDescriptor::infer(value)
            == TypeDescriptor::Scalar(*kind),
        (TypeDescriptor::Sequence(_), Value::List(_))
        | (TypeDescriptor::Tuple(_), Value::Tuple(_))
        | (TypeDescriptor::Set(_), Value::Set(_)) => true,
        _ => false,
    };
    if matches_type {
        return Ok(mapped.clone());
    }
    match mapped {
        Value::Str(s) => decode_plain(key, s, ty),
        Value::Int(i) => decode_plain(key, &i.to_string(), ty),
        Value::Float(f) => decode_plain(key, &format!("{f:?}"), ty),
        Value::Bool(b) => decode_plain(key, if *b { "true" } else { "false" }, ty),
        _ => Err(DecodeError::new(
            key,
            raw,
            ty,
            format!("mapped value of kind {} does not fit", mapped.kind_name()),
        )),
    }
}

fn decode_plain(key: &str, raw: &str, ty: &TypeDescriptor) -> Result<Value, DecodeError> {
    match ty {
        TypeDescriptor::Scalar(kind) => {
            scalar::parse_scalar(raw, *kind).map_err(|cause| DecodeError::new(key, raw, ty, cause))
        }
        TypeDescriptor::Sequence(item) | TypeDescriptor::Tuple(item) | TypeDescriptor::Set(item) => {
            let items = split_collection(raw)
                .into_iter()
                .enumerate()
                .map(|(i, part)| decode_plain(&format!("{key}[{i}]"), &part, item))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|inner| DecodeError::new(key, raw, ty, inner))?;
            Ok(match ty {
                TypeDescriptor::Tuple(_) => Value::Tuple(items),
                TypeDescriptor::Set(_) => Value::set(items),
                _ => Value::List(items),
            })
        }
    }
}

/// Raw item strings of an encoded collection, base64 JSON first, legacy split second.
fn split_collection(raw: &str) -> Vec<String> {
    if let Some(items) = decode_token(raw) {
        return items;
    }
    raw.split(SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_token(raw: &str) -> Option<Vec<String>> {
    let bytes = URL_TOKEN.decode(raw.trim()).ok()?;
    let json = String::from_utf8(bytes).ok()?;
    match serde_json::from_str::<serde_json::Value>(&json).ok()? {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        _ => None,
    }
}
