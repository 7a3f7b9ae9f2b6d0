//! Input-generation strategies.
//!
//! A `Strategy` is an immutable description of a set of values. All the
//! randomness lives in the `DataSource` passed to `draw`, which is what
//! makes examples replayable and shrinkable: replaying the same choices
//! reproduces the same value, and smaller choices produce simpler values.

pub mod infer;
pub mod manifest;
mod source;
pub mod types;

pub use infer::{infer, palette, Inferred, Resolution};
pub use manifest::Manifest;
pub use source::{DataSource, Overrun};
pub use types::TypeHint;

use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// Longest generated text, unless a strategy says otherwise.
pub const TEXT_MAX_LEN: usize = 20;
/// Largest generated list or mapping.
pub const COLLECTION_MAX_SIZE: usize = 5;

const ANY_MAX_DEPTH: usize = 3;
const ANY_MAX_LEAVES: usize = 10;
const ANY_INT_BOUND: i64 = 1_000_000;

/// Characters text is drawn from. Earlier characters are simpler.
const ALPHABET: &[char] = &[
    'a', 'b', 'c', 'x', 'y', 'z', 'A', 'B', 'Z', '0', '1', '9', ' ', '_', '-', '.', ',', '!', '\'',
    '"', '\\', '\n', '\t', 'é', 'ß', 'Ω', '中', '🙂', '\u{0}',
];

// ─── Strategy ──────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum Strategy {
    /// Always the given value.
    Just(Value),
    Bool,
    Int {
        min: i64,
        max: i64,
    },
    /// Finite reals.
    Float,
    Text {
        max_len: usize,
    },
    List {
        element: Box<Strategy>,
        max_size: usize,
    },
    /// String-keyed mappings.
    Dict {
        value: Box<Strategy>,
        max_size: usize,
    },
    Tuple(Vec<Strategy>),
    OneOf(Vec<Strategy>),
    /// Blind recursive values: scalars, and lists or mappings of them.
    Recursive {
        max_depth: usize,
        max_leaves: usize,
    },
}

impl Strategy {
    pub fn none() -> Self {
        Strategy::Just(Value::None)
    }

    pub fn int(min: i64, max: i64) -> Self {
        Strategy::Int { min, max }
    }

    pub fn text() -> Self {
        Strategy::Text {
            max_len: TEXT_MAX_LEN,
        }
    }

    pub fn list(element: Strategy) -> Self {
        Strategy::List {
            element: Box::new(element),
            max_size: COLLECTION_MAX_SIZE,
        }
    }

    pub fn dict(value: Strategy) -> Self {
        Strategy::Dict {
            value: Box::new(value),
            max_size: COLLECTION_MAX_SIZE,
        }
    }

    /// One-of over `options`; a single option is returned as is.
    pub fn one_of(mut options: Vec<Strategy>) -> Self {
        if options.len() == 1 {
            options.remove(0)
        } else {
            Strategy::OneOf(options)
        }
    }

    /// Integers or text, the fallback for untyped collections.
    pub fn int_or_text(min: i64, max: i64) -> Self {
        Strategy::OneOf(vec![Strategy::int(min, max), Strategy::text()])
    }

    /// Anything at all, nested up to a fixed depth and leaf count.
    pub fn any() -> Self {
        Strategy::Recursive {
            max_depth: ANY_MAX_DEPTH,
            max_leaves: ANY_MAX_LEAVES,
        }
    }

    pub fn draw(&self, source: &mut DataSource) -> Result<Value, Overrun> {
        match self {
            Strategy::Just(value) => Ok(value.clone()),
            Strategy::Bool => Ok(Value::Bool(source.draw(1)? == 1)),
            Strategy::Int { min, max } => draw_int(source, *min, *max).map(Value::Int),
            Strategy::Float => draw_float(source).map(Value::Float),
            Strategy::Text { max_len } => draw_text(source, *max_len).map(Value::Str),
            Strategy::List { element, max_size } => {
                let mut items = Vec::new();
                while items.len() < *max_size && more(source)? {
                    items.push(element.draw(source)?);
                }
                Ok(Value::List(items))
            }
            Strategy::Dict { value, max_size } => {
                let mut entries = BTreeMap::new();
                let mut drawn = 0;
                while drawn < *max_size && more(source)? {
                    let key = draw_text(source, 8)?;
                    entries.insert(key, value.draw(source)?);
                    drawn += 1;
                }
                Ok(Value::Dict(entries))
            }
            Strategy::Tuple(parts) => parts
                .iter()
                .map(|p| p.draw(source))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Tuple),
            Strategy::OneOf(options) => {
                if options.is_empty() {
                    return Ok(Value::None);
                }
                let i = source.draw(options.len() as u64 - 1)? as usize;
                options[i].draw(source)
            }
            Strategy::Recursive {
                max_depth,
                max_leaves,
            } => {
                let mut leaves = *max_leaves;
                draw_recursive(source, 0, *max_depth, &mut leaves)
            }
        }
    }

    /// Draw one positional argument list.
    pub fn draw_args(&self, source: &mut DataSource) -> Result<Vec<Value>, Overrun> {
        match self.draw(source)? {
            Value::Tuple(items) => Ok(items),
            other => Ok(vec![other]),
        }
    }

    /// Lazy example stream: the all-minimal example first, then random ones.
    pub fn examples(&self, seed: u64) -> Examples<'_> {
        Examples {
            strategy: self,
            seed,
            index: 0,
        }
    }
}

/// One generated argument list and the choices that produced it.
#[derive(Clone, Debug)]
pub struct Example {
    pub choices: Vec<u64>,
    pub args: Vec<Value>,
}

pub struct Examples<'a> {
    strategy: &'a Strategy,
    seed: u64,
    index: u64,
}

impl Iterator for Examples<'_> {
    type Item = Example;

    fn next(&mut self) -> Option<Example> {
        for _ in 0..100 {
            let mut source = if self.index == 0 {
                DataSource::replay(&[])
            } else {
                DataSource::random(self.seed.wrapping_add(self.index))
            };
            self.index += 1;
            if let Ok(args) = self.strategy.draw_args(&mut source) {
                return Some(Example {
                    choices: source.into_choices(),
                    args,
                });
            }
        }
        None
    }
}

// ─── Primitive Draws ───────────────────────────────────────────────

/// Continue a collection? Zero stops, so shrinking shortens collections.
fn more(source: &mut DataSource) -> Result<bool, Overrun> {
    Ok(source.draw(4)? > 0)
}

/// Sign and magnitude, so the simplest value is the one closest to zero.
fn draw_int(source: &mut DataSource, min: i64, max: i64) -> Result<i64, Overrun> {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let (lo, hi) = (lo as i128, hi as i128);
    let value = if lo <= 0 && hi >= 0 {
        let negative = (hi == 0 && lo < 0) || (lo < 0 && source.draw(1)? == 1);
        if negative {
            -(source.draw((-lo) as u64)? as i128)
        } else {
            source.draw(hi as u64)? as i128
        }
    } else if lo > 0 {
        lo + source.draw((hi - lo) as u64)? as i128
    } else {
        hi - source.draw((hi - lo) as u64)? as i128
    };
    Ok(value as i64)
}

fn draw_float(source: &mut DataSource) -> Result<f64, Overrun> {
    let x = match source.draw(3)? {
        0 => draw_int(source, -100, 100)? as f64,
        1 => draw_int(source, -100_000, 100_000)? as f64 / 100.0,
        2 => {
            let whole = draw_int(source, -ANY_INT_BOUND, ANY_INT_BOUND)? as f64;
            whole + source.draw(999)? as f64 / 1000.0
        }
        _ => {
            let raw = f64::from_bits(source.draw(u64::MAX)?);
            if raw.is_finite() {
                raw
            } else {
                0.0
            }
        }
    };
    Ok(x)
}

fn draw_text(source: &mut DataSource, max_len: usize) -> Result<String, Overrun> {
    let mut text = String::new();
    let mut len = 0;
    while len < max_len && more(source)? {
        let i = source.draw(ALPHABET.len() as u64 - 1)? as usize;
        text.push(ALPHABET[i]);
        len += 1;
    }
    Ok(text)
}

fn draw_recursive(
    source: &mut DataSource,
    depth: usize,
    max_depth: usize,
    leaves: &mut usize,
) -> Result<Value, Overrun> {
    let branch = if depth >= max_depth || *leaves == 0 {
        0
    } else {
        source.draw(2)?
    };
    match branch {
        0 => {
            *leaves = leaves.saturating_sub(1);
            let leaf = match source.draw(4)? {
                0 => Strategy::int(-ANY_INT_BOUND, ANY_INT_BOUND),
                1 => Strategy::Float,
                2 => Strategy::text(),
                3 => Strategy::none(),
                _ => Strategy::Bool,
            };
            leaf.draw(source)
        }
        1 => {
            let mut items = Vec::new();
            while *leaves > 0 && items.len() < COLLECTION_MAX_SIZE && more(source)? {
                items.push(draw_recursive(source, depth + 1, max_depth, leaves)?);
            }
            Ok(Value::List(items))
        }
        _ => {
            let mut entries = BTreeMap::new();
            let mut drawn = 0;
            while *leaves > 0 && drawn < COLLECTION_MAX_SIZE && more(source)? {
                let key = draw_text(source, 8)?;
                entries.insert(key, draw_recursive(source, depth + 1, max_depth, leaves)?);
                drawn += 1;
            }
            Ok(Value::Dict(entries))
        }
    }
}

// ─── Display ───────────────────────────────────────────────────────

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Just(value) => write!(f, "just({})", value),
            Strategy::Bool => write!(f, "bool"),
            Strategy::Int { min, max } => write!(f, "int({}..={})", min, max),
            Strategy::Float => write!(f, "float"),
            Strategy::Text { .. } => write!(f, "text"),
            Strategy::List { element, .. } => write!(f, "list[{}]", element),
            Strategy::Dict { value, .. } => write!(f, "dict[str, {}]", value),
            Strategy::Tuple(parts) => {
                write!(f, "(")?;
                write_joined(f, parts, ", ")?;
                write!(f, ")")
            }
            Strategy::OneOf(options) => write_joined(f, options, " | "),
            Strategy::Recursive { .. } => write!(f, "any"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Strategy], sep: &str) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", part)?;
    }
    Ok(())
}
