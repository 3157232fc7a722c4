use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Str,
    Date,
    DateTime,
    Time,
    Bytes,
}

impl ScalarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Str => "str",
            ScalarKind::Date => "date",
            ScalarKind::DateTime => "datetime",
            ScalarKind::Time => "time",
            ScalarKind::Bytes => "bytes",
        }
    }
}

/// Declared type of a field, used to pick the decode routine for URL strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Scalar(ScalarKind),
    Sequence(Box<TypeDescriptor>),
    Tuple(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub const BOOL: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::Bool);
    pub const INT: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::Int);
    pub const FLOAT: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::Float);
    pub const STR: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::Str);
    pub const DATE: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::Date);
    pub const DATETIME: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::DateTime);
    pub const TIME: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::Time);
    pub const BYTES: TypeDescriptor = TypeDescriptor::Scalar(ScalarKind::Bytes);

    pub fn list(item: TypeDescriptor) -> Self {
        TypeDescriptor::Sequence(Box::new(item))
    }

    pub fn tuple(item: TypeDescriptor) -> Self {
        TypeDescriptor::Tuple(Box::new(item))
    }

    pub fn set(item: TypeDescriptor) -> Self {
        TypeDescriptor::Set(Box::new(item))
    }

    /// Type implied by a default value when the declaration has no explicit type.
    ///
    /// Collections take their element type from the first item; null, maps and
    /// empty collections fall back to `str`.
    pub fn infer(value: &Value) -> Self {
        let first_item = |items: &[Value]| {
            items
                .first()
                .map(TypeDescriptor::infer)
                .unwrap_or(TypeDescriptor::STR)
        };
        match value {
            Value::Bool(_) => TypeDescriptor::BOOL,
            Value::Int(_) => TypeDescriptor::INT,
            Value::Float(_) => TypeDescriptor::FLOAT,
            Value::Date(_) => TypeDescriptor::DATE,
            Value::DateTime(_) => TypeDescriptor::DATETIME,
            Value::Time(_) => TypeDescriptor::TIME,
            Value::Bytes(_) => TypeDescriptor::BYTES,
            Value::List(items) => TypeDescriptor::list(first_item(items)),
            Value::Tuple(items) => TypeDescriptor::tuple(first_item(items)),
            Value::Set(items) => TypeDescriptor::set(first_item(items)),
            Value::Null | Value::Str(_) | Value::Map(_) => TypeDescriptor::STR,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(kind) => f.write_str(kind.as_str()),
            TypeDescriptor::Sequence(item) => write!(f, "list[{item}]"),
            TypeDescriptor::Tuple(item) => write!(f, "tuple[{item}]"),
            TypeDescriptor::Set(item) => write!(f, "set[{item}]"),
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(open) = s.find('[') {
            let inner = s[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| format!("unbalanced brackets in type '{s}'"))?;
            let item: TypeDescriptor = inner.parse()?;
            return match &s[..open] {
                "list" => Ok(TypeDescriptor::list(item)),
                "tuple" => Ok(TypeDescriptor::tuple(item)),
                "set" => Ok(TypeDescriptor::set(item)),
                other => Err(format!("unknown collection type '{other}'")),
            };
        }
        match s {
            "bool" => Ok(TypeDescriptor::BOOL),
            "int" => Ok(TypeDescriptor::INT),
            "float" => Ok(TypeDescriptor::FLOAT),
            "str" | "string" => Ok(TypeDescriptor::STR),
            "date" => Ok(TypeDescriptor::DATE),
            "datetime" => Ok(TypeDescriptor::DATETIME),
            "time" => Ok(TypeDescriptor::TIME),
            "bytes" => Ok(TypeDescriptor::BYTES),
            "list" => Ok(TypeDescriptor::list(TypeDescriptor::STR)),
            "tuple" => Ok(TypeDescriptor::tuple(TypeDescriptor::STR)),
            "set" => Ok(TypeDescriptor::set(TypeDescriptor::STR)),
            other => Err(format!("unknown type '{other}'")),
        }
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
