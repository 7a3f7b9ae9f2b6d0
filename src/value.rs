//! Dynamic value model shared by every unit under test.
//!
//! Arguments and return values cross the loader boundary as `Value`s, so the
//! engine never needs to know what language a unit was written in. The JSON
//! form (serde, externally tagged) is the wire format of the language host
//! protocol and of supervisor work orders.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A value passed to, or returned from, a callable under test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    /// An instance of a user-defined class, reduced to its field map.
    Object {
        class: String,
        fields: BTreeMap<String, Value>,
    },
    /// A member of an enumeration, compared by label.
    Enum { class: String, label: String },
}

/// Runtime type shape of a value: the unit of deduplication for probed
/// working signatures.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    None,
    Bool,
    Int,
    Float,
    Str,
    List,
    Tuple,
    Dict,
    Object(String),
    Enum(String),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(s.to_string())
    }

    /// Build a string-keyed mapping from `(key, value)` pairs.
    pub fn dict<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
        Value::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::None => TypeTag::None,
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::Str,
            Value::List(_) => TypeTag::List,
            Value::Tuple(_) => TypeTag::Tuple,
            Value::Dict(_) => TypeTag::Dict,
            Value::Object { class, .. } => TypeTag::Object(class.clone()),
            Value::Enum { class, .. } => TypeTag::Enum(class.clone()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list or tuple.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::None => write!(f, "none"),
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::Int => write!(f, "int"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Str => write!(f, "str"),
            TypeTag::List => write!(f, "list"),
            TypeTag::Tuple => write!(f, "tuple"),
            TypeTag::Dict => write!(f, "dict"),
            TypeTag::Object(class) | TypeTag::Enum(class) => write!(f, "{}", class),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object { class, fields } => {
                write!(f, "{}(", class)?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, ")")
            }
            Value::Enum { class, label } => write!(f, "{}.{}", class, label),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Render an argument tuple the way it appears in diagnostics: `(1, "a")`.
pub fn format_args(args: &[Value]) -> String {
    Value::Tuple(args.to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::str("a\"b").to_string(), "\"a\\\"b\"");
    }

    #[test]
    fn test_display_containers() {
        let v = Value::dict([("key", Value::List(vec![Value::Int(1), Value::Int(2)]))]);
        assert_eq!(v.to_string(), "{\"key\": [1, 2]}");
        assert_eq!(format_args(&[Value::Int(1)]), "(1,)");
        assert_eq!(format_args(&[Value::Int(1), Value::None]), "(1, None)");

        let obj = Value::Object {
            class: "Point".to_string(),
            fields: [("x".to_string(), Value::Int(1))].into_iter().collect(),
        };
        assert_eq!(obj.to_string(), "Point(x=1)");
        let e = Value::Enum {
            class: "Color".to_string(),
            label: "RED".to_string(),
        };
        assert_eq!(e.to_string(), "Color.RED");
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(Value::Int(0).type_tag(), TypeTag::Int);
        assert_eq!(Value::List(vec![]).type_tag(), TypeTag::List);
        assert_eq!(
            Value::List(vec![Value::Int(1)]).type_tag(),
            Value::List(vec![]).type_tag(),
            "shape ignores contents"
        );
        assert_ne!(Value::Bool(true).type_tag(), Value::Int(1).type_tag());
    }

    #[test]
    fn test_json_round_trip_shape() {
        let v = Value::Tuple(vec![Value::Int(1), Value::str("x"), Value::None]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"tuple":[{"int":1},{"str":"x"},"none"]}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
