//! Type annotations and manifest directives, and the three fixed
//! type-to-strategy mappings built on them.

use std::fmt;
use std::str::FromStr;

use super::Strategy;
use crate::value::Value;

/// A parsed type annotation or manifest directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeHint {
    /// `int`, or `int(min,max)` with an explicit range.
    Int(Option<(i64, i64)>),
    Float,
    Str,
    Bool,
    None,
    List(Box<TypeHint>),
    Dict(Box<TypeHint>, Box<TypeHint>),
    Tuple(Vec<TypeHint>),
    Union(Vec<TypeHint>),
    Any,
    /// Anything unrecognized, kept verbatim.
    Other(String),
}

impl FromStr for TypeHint {
    type Err = std::convert::Infallible;

    /// Never fails: unknown text becomes `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_hint(s))
    }
}

impl TypeHint {
    pub fn parse(s: &str) -> Self {
        parse_hint(s)
    }
}

fn parse_hint(text: &str) -> TypeHint {
    let text = text.trim();
    let alternatives = split_top_level(text, '|');
    if alternatives.len() > 1 {
        return TypeHint::Union(alternatives.iter().map(|a| parse_hint(a)).collect());
    }

    let (head, params) = match text.find('[') {
        Some(open) if text.ends_with(']') => {
            (&text[..open], split_top_level(&text[open + 1..text.len() - 1], ','))
        }
        _ => (text, Vec::new()),
    };
    let head = head.trim();
    let lowered = head.to_ascii_lowercase();
    let name = lowered
        .strip_prefix("typing.")
        .or_else(|| lowered.strip_prefix("builtins."))
        .unwrap_or(&lowered);

    if let Some(range) = name.strip_prefix("int(") {
        return TypeHint::Int(parse_range(range));
    }

    let param = |i: usize| -> TypeHint {
        params
            .get(i)
            .map(|p| parse_hint(p))
            .unwrap_or(TypeHint::Any)
    };

    match name {
        "int" => TypeHint::Int(None),
        "float" => TypeHint::Float,
        "str" | "string" => TypeHint::Str,
        "bool" => TypeHint::Bool,
        "none" | "nonetype" => TypeHint::None,
        "list" | "sequence" => TypeHint::List(Box::new(param(0))),
        "dict" | "mapping" => TypeHint::Dict(Box::new(param(0)), Box::new(param(1))),
        "tuple" => {
            let parts: Vec<TypeHint> = params
                .iter()
                .filter(|p| p.trim() != "...")
                .map(|p| parse_hint(p))
                .collect();
            TypeHint::Tuple(parts)
        }
        "optional" => TypeHint::Union(vec![param(0), TypeHint::None]),
        "union" => TypeHint::Union(params.iter().map(|p| parse_hint(p)).collect()),
        "any" | "object" => TypeHint::Any,
        _ => TypeHint::Other(head.to_string()),
    }
}

/// `min,max)` -> range. Anything malformed yields no range.
fn parse_range(rest: &str) -> Option<(i64, i64)> {
    let inner = rest.strip_suffix(')')?;
    let (lo, hi) = inner.split_once(',')?;
    let lo: i64 = lo.trim().parse().ok()?;
    let hi: i64 = hi.trim().parse().ok()?;
    (lo <= hi).then_some((lo, hi))
}

/// Split on `sep` outside of brackets and parentheses.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Int(None) => write!(f, "int"),
            TypeHint::Int(Some((lo, hi))) => write!(f, "int({},{})", lo, hi),
            TypeHint::Float => write!(f, "float"),
            TypeHint::Str => write!(f, "str"),
            TypeHint::Bool => write!(f, "bool"),
            TypeHint::None => write!(f, "None"),
            TypeHint::List(t) => write!(f, "list[{}]", t),
            TypeHint::Dict(k, v) => write!(f, "dict[{}, {}]", k, v),
            TypeHint::Tuple(parts) => {
                write!(f, "tuple[")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, "]")
            }
            TypeHint::Union(parts) => {
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", p)?;
                }
                Ok(())
            }
            TypeHint::Any => write!(f, "Any"),
            TypeHint::Other(name) => write!(f, "{}", name),
        }
    }
}

// ─── Mappings ──────────────────────────────────────────────────────

const DECLARED_INT_BOUND: i64 = 50;
const MANIFEST_INT_BOUND: i64 = 100;
const RUNTIME_INT_BOUND: i64 = 100;

/// Strategy for a declared parameter annotation.
pub fn declared_strategy(hint: &TypeHint) -> Strategy {
    match hint {
        TypeHint::Int(Some((lo, hi))) => Strategy::int(*lo, *hi),
        TypeHint::Int(None) => Strategy::int(-DECLARED_INT_BOUND, DECLARED_INT_BOUND),
        TypeHint::Float => Strategy::Float,
        TypeHint::Str => Strategy::text(),
        TypeHint::Bool => Strategy::Bool,
        TypeHint::None => Strategy::none(),
        TypeHint::List(element) => Strategy::list(declared_strategy(element)),
        TypeHint::Dict(_, value) => Strategy::dict(declared_strategy(value)),
        TypeHint::Tuple(parts) => Strategy::Tuple(parts.iter().map(declared_strategy).collect()),
        TypeHint::Union(parts) => Strategy::one_of(parts.iter().map(declared_strategy).collect()),
        TypeHint::Any | TypeHint::Other(_) => Strategy::any(),
    }
}

/// Strategy for one manifest directive. Collections are always of
/// integers or text; unknown directives fall back to integers or text.
pub fn manifest_strategy(hint: &TypeHint) -> Strategy {
    let fallback = || Strategy::int_or_text(-MANIFEST_INT_BOUND, MANIFEST_INT_BOUND);
    match hint {
        TypeHint::Int(Some((lo, hi))) => Strategy::int(*lo, *hi),
        TypeHint::Int(None) => Strategy::int(-MANIFEST_INT_BOUND, MANIFEST_INT_BOUND),
        TypeHint::Float => Strategy::Float,
        TypeHint::Str => Strategy::text(),
        TypeHint::Bool => Strategy::Bool,
        TypeHint::None => Strategy::none(),
        TypeHint::List(_) => Strategy::list(fallback()),
        TypeHint::Dict(..) => Strategy::dict(fallback()),
        _ => fallback(),
    }
}

/// Strategy reproducing the runtime type of a value that worked.
pub fn runtime_strategy(value: &Value) -> Strategy {
    let int_or_text = || Strategy::int_or_text(-RUNTIME_INT_BOUND, RUNTIME_INT_BOUND);
    match value {
        Value::None => Strategy::none(),
        Value::Bool(_) => Strategy::Bool,
        Value::Int(_) => Strategy::int(-RUNTIME_INT_BOUND, RUNTIME_INT_BOUND),
        Value::Float(_) => Strategy::Float,
        Value::Str(_) => Strategy::text(),
        Value::List(_) => Strategy::list(int_or_text()),
        Value::Dict(_) => Strategy::dict(int_or_text()),
        Value::Tuple(items) => Strategy::Tuple(items.iter().map(runtime_strategy).collect()),
        Value::Object { .. } | Value::Enum { .. } => Strategy::Just(value.clone()),
    }
}
