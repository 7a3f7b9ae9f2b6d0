//! Strategy inference for callables whose parameter types are unknown.
//!
//! Resolution order: fully declared annotations, then the operator
//! manifest, then probing the original with a fixed palette of values and
//! generalizing every argument shape that did not raise.

use std::collections::BTreeSet;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::types::{declared_strategy, manifest_strategy, runtime_strategy, TypeHint};
use super::{Manifest, Strategy};
use crate::config::ProbeSettings;
use crate::error::InferError;
use crate::unit::Invoker;
use crate::value::{TypeTag, Value};

/// Which rule produced a strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Every parameter was annotated.
    Declared,
    /// An operator manifest entry, found under `key`.
    Manifest { key: String },
    /// No parameters: the only input is the empty argument list.
    Nullary,
    /// Probing found this many distinct working argument shapes.
    Probed { signatures: usize },
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Declared => write!(f, "declared types"),
            Resolution::Manifest { key } => write!(f, "manifest entry '{}'", key),
            Resolution::Nullary => write!(f, "no parameters"),
            Resolution::Probed { signatures } => write!(f, "{} probed signatures", signatures),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Inferred {
    pub strategy: Strategy,
    pub resolution: Resolution,
}

/// The probing palette, in probing order.
pub fn palette() -> Vec<Value> {
    vec![
        Value::Int(1),
        Value::Int(0),
        Value::Int(-1),
        Value::Float(1.5),
        Value::str("test"),
        Value::str(""),
        Value::Bool(true),
        Value::None,
        Value::List(vec![Value::Int(1), Value::Int(2)]),
        Value::List(vec![]),
        Value::dict([("a", Value::Int(1))]),
        Value::dict([]),
        Value::List(vec![Value::dict([
            ("name", Value::str("test")),
            ("age", Value::Int(25)),
            ("score", Value::Int(90)),
        ])]),
        Value::dict([(
            "key",
            Value::List(vec![Value::str("val1"), Value::str("val2")]),
        )]),
    ]
}

/// Infer an argument strategy for `invoker`.
///
/// Only probing calls the callable; `seed` drives its random phase.
pub fn infer(
    invoker: &dyn Invoker,
    manifest: &Manifest,
    probe: &ProbeSettings,
    seed: u64,
) -> Result<Inferred, InferError> {
    let descriptor = invoker.descriptor();
    let name = descriptor.qualified().to_string();

    if descriptor.is_fully_typed() {
        let parts = descriptor
            .params
            .iter()
            .map(|p| {
                let hint = TypeHint::parse(p.annotation.as_deref().unwrap_or("Any"));
                declared_strategy(&hint)
            })
            .collect();
        log::info!("{}: using declared types", name);
        return Ok(Inferred {
            strategy: Strategy::Tuple(parts),
            resolution: Resolution::Declared,
        });
    }

    if let Some((key, directives)) = manifest.lookup(descriptor) {
        let parts = directives
            .iter()
            .map(|d| manifest_strategy(&TypeHint::parse(d)))
            .collect();
        log::info!("{}: using manifest entry '{}'", name, key);
        return Ok(Inferred {
            strategy: Strategy::Tuple(parts),
            resolution: Resolution::Manifest {
                key: key.to_string(),
            },
        });
    }

    if descriptor.arity() == 0 {
        return Ok(Inferred {
            strategy: Strategy::Tuple(Vec::new()),
            resolution: Resolution::Nullary,
        });
    }

    log::info!("{}: probing {} parameters", name, descriptor.arity());
    let signatures = probe_signatures(invoker, probe, seed)?;
    if signatures.is_empty() {
        return Err(InferError::Unsatisfiable { name });
    }
    log::info!("{}: deduced {} valid signatures", name, signatures.len());

    let shapes = signatures
        .iter()
        .map(|args| Strategy::Tuple(args.iter().map(runtime_strategy).collect()))
        .collect();
    Ok(Inferred {
        strategy: Strategy::one_of(shapes),
        resolution: Resolution::Probed {
            signatures: signatures.len(),
        },
    })
}

// ─── Probing ───────────────────────────────────────────────────────

/// Working argument tuples, one representative per runtime shape, in the
/// order they were found.
struct Signatures<'a> {
    invoker: &'a dyn Invoker,
    seen: BTreeSet<Vec<TypeTag>>,
    found: Vec<Vec<Value>>,
    cap: usize,
}

impl Signatures<'_> {
    fn full(&self) -> bool {
        self.found.len() >= self.cap
    }

    /// Try one tuple; record it if the original accepts it.
    fn try_args(&mut self, args: Vec<Value>) -> Result<(), InferError> {
        match self.invoker.invoke(&args) {
            Ok(_) => {
                let shape: Vec<TypeTag> = args.iter().map(Value::type_tag).collect();
                if self.seen.insert(shape) {
                    self.found.push(args);
                }
                Ok(())
            }
            Err(raised) if raised.is_infrastructure() => Err(InferError::Infrastructure {
                name: self.invoker.descriptor().qualified().to_string(),
                message: raised.message,
            }),
            Err(_) => Ok(()),
        }
    }
}

fn probe_signatures(
    invoker: &dyn Invoker,
    probe: &ProbeSettings,
    seed: u64,
) -> Result<Vec<Vec<Value>>, InferError> {
    let palette = palette();
    let arity = invoker.descriptor().arity();
    let mut sigs = Signatures {
        invoker,
        seen: BTreeSet::new(),
        found: Vec::new(),
        cap: probe.max_signatures.max(1),
    };

    if arity <= probe.exhaustive_arity {
        // Mixed-radix counter over palette^arity, last position fastest.
        // Every combination is tried; the cap only bounds the wide phases.
        let mut digits = vec![0usize; arity];
        loop {
            sigs.try_args(digits.iter().map(|&d| palette[d].clone()).collect())?;
            if !advance(&mut digits, palette.len()) {
                break;
            }
        }
        return Ok(sigs.found);
    }

    for value in &palette {
        sigs.try_args(vec![value.clone(); arity])?;
        if sigs.full() {
            return Ok(sigs.found);
        }
    }
    if arity <= palette.len() {
        sigs.try_args(palette[..arity].to_vec())?;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..probe.random_trials {
        if sigs.full() {
            break;
        }
        let args = (0..arity)
            .map(|_| palette[rng.gen_range(0..palette.len())].clone())
            .collect();
        sigs.try_args(args)?;
    }
    Ok(sigs.found)
}

/// Step the counter; false once it wraps around.
fn advance(digits: &mut [usize], radix: usize) -> bool {
    for d in digits.iter_mut().rev() {
        *d += 1;
        if *d < radix {
            return true;
        }
        *d = 0;
    }
    false
}
