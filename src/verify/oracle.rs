//! The equivalence oracle: one input, both implementations, one judgement.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::unit::{Outcome, Raised};
use crate::value::{format_args, Value};

/// Error categories the original may raise where a returning candidate
/// counts as a fix rather than a divergence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashPolicy {
    pub tolerated: BTreeSet<String>,
}

impl CrashPolicy {
    pub const DEFAULT_TOLERATED: [&'static str; 8] = [
        "AttributeError",
        "TypeError",
        "NameError",
        "UnboundLocalError",
        "ZeroDivisionError",
        "IndexError",
        "KeyError",
        "RecursionError",
    ];

    /// No tolerance: every original error must be reproduced.
    pub fn strict() -> Self {
        Self {
            tolerated: BTreeSet::new(),
        }
    }

    pub fn tolerate(mut self, category: &str) -> Self {
        self.tolerated.insert(category.to_string());
        self
    }

    pub fn tolerates(&self, raised: &Raised) -> bool {
        self.tolerated.contains(&raised.category)
    }
}

impl Default for CrashPolicy {
    fn default() -> Self {
        Self {
            tolerated: Self::DEFAULT_TOLERATED
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// A concrete input on which the two implementations diverge.
#[derive(Clone, Debug, PartialEq)]
pub struct Mismatch {
    pub input: Vec<Value>,
    pub original: Outcome,
    pub candidate: Outcome,
}

impl Mismatch {
    /// The triggering input, rendered as an argument tuple.
    pub fn input_text(&self) -> String {
        format_args(&self.input)
    }
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Ok(value) => format!("returned {}", value),
        Err(raised) => format!("raised {}", raised),
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mismatch for input {}: original {}, candidate {}",
            format_args(&self.input),
            describe(&self.original),
            describe(&self.candidate)
        )
    }
}

/// Judge one pair of outcomes for `input`.
pub fn check(
    policy: &CrashPolicy,
    input: &[Value],
    original: Outcome,
    candidate: Outcome,
) -> Result<(), Mismatch> {
    let same = match (&original, &candidate) {
        (Err(a), Err(b)) => a.category == b.category,
        (Err(a), Ok(_)) => policy.tolerates(a),
        (Ok(_), Err(_)) => false,
        (Ok(a), Ok(b)) => values_equal(a, b),
    };
    if same {
        Ok(())
    } else {
        Err(Mismatch {
            input: input.to_vec(),
            original,
            candidate,
        })
    }
}

/// Structural equality. Booleans, ints and floats compare by numeric
/// value (`True == 1`); lists and tuples interchangeably.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (
            Value::Bool(_) | Value::Int(_) | Value::Float(_),
            Value::Bool(_) | Value::Int(_) | Value::Float(_),
        ) => numbers_equal(&numeric(a), &numeric(b)),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x) | Value::Tuple(x), Value::List(y) | Value::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| values_equal(p, q))
        }
        (Value::Dict(x), Value::Dict(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        (
            Value::Object {
                class: ca,
                fields: fa,
            },
            Value::Object {
                class: cb,
                fields: fb,
            },
        ) => {
            ca == cb
                && fa.len() == fb.len()
                && fa
                    .iter()
                    .all(|(k, v)| fb.get(k).is_some_and(|w| values_equal(v, w)))
        }
        (
            Value::Enum {
                class: ca,
                label: la,
            },
            Value::Enum {
                class: cb,
                label: lb,
            },
        ) => ca == cb && la == lb,
        _ => false,
    }
}

fn numeric(v: &Value) -> Value {
    match v {
        Value::Bool(b) => Value::Int(i64::from(*b)),
        other => other.clone(),
    }
}

fn numbers_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
            y.fract() == 0.0 && (*x as f64) == *y && (*y as i64) == *x
        }
        (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => false,
    }
}
