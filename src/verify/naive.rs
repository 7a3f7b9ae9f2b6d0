//! The naive sweep: uniform random values straight from parameter
//! annotations, with no inference and no shrinking.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{CrashPolicy, Differential, Trial, Verdict};
use crate::strategy::TypeHint;
use crate::unit::Param;
use crate::value::Value;

const INT_BOUND: i64 = 1000;
const FLOAT_BOUND: f64 = 1000.0;
const MAX_TEXT: usize = 50;
const MAX_COLLECTION: usize = 5;

/// Run `iterations` random argument lists from `make_args`. Iterations
/// where the original raised are checked but do not count as usable.
pub(crate) fn naive_sweep(
    subject: &dyn Differential,
    policy: &CrashPolicy,
    iterations: usize,
    seed: u64,
    mut make_args: impl FnMut(&mut StdRng) -> Vec<Value>,
) -> Verdict {
    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut usable = 0;

    for _ in 0..iterations {
        let args = make_args(&mut rng);
        match subject.trial(&args, policy) {
            Trial::Agreed { usable: true } => usable += 1,
            Trial::Agreed { usable: false } | Trial::Discarded => {}
            Trial::Aborted(reason) => return Verdict::skip(start.elapsed(), reason),
            Trial::Diverged(mismatch) => {
                log::debug!("naive sweep failed: {}", mismatch);
                return Verdict::fail(start.elapsed(), mismatch.to_string());
            }
        }
    }

    if usable == 0 {
        Verdict::skip(start.elapsed(), "naive sweep found no usable inputs")
    } else {
        Verdict::pass(start.elapsed())
    }
}

/// One random argument per parameter.
pub(crate) fn random_args(params: &[Param], rng: &mut StdRng) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p.annotation.as_deref() {
            Some(annotation) => random_for(&TypeHint::parse(annotation), rng),
            None => random_blind(rng),
        })
        .collect()
}

fn random_for(hint: &TypeHint, rng: &mut StdRng) -> Value {
    match hint {
        TypeHint::Int(Some((lo, hi))) => Value::Int(rng.gen_range(*lo..=*hi)),
        TypeHint::Int(None) => Value::Int(rng.gen_range(-INT_BOUND..=INT_BOUND)),
        TypeHint::Float => Value::Float(rng.gen_range(-FLOAT_BOUND..FLOAT_BOUND)),
        TypeHint::Str => Value::Str(random_text(rng)),
        TypeHint::Bool => Value::Bool(rng.gen()),
        TypeHint::None => Value::None,
        TypeHint::List(_) => random_list(rng),
        TypeHint::Dict(..) => random_dict(rng),
        TypeHint::Tuple(parts) => Value::Tuple(parts.iter().map(|p| random_for(p, rng)).collect()),
        TypeHint::Union(parts) if !parts.is_empty() => {
            let i = rng.gen_range(0..parts.len());
            random_for(&parts[i], rng)
        }
        _ => random_blind(rng),
    }
}

fn random_text(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..=MAX_TEXT);
    (0..len).map(|_| rng.sample(Alphanumeric) as char).collect()
}

fn random_scalar(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..5) {
        0 => Value::Int(rng.gen_range(-INT_BOUND..=INT_BOUND)),
        1 => Value::Float(rng.gen_range(-FLOAT_BOUND..FLOAT_BOUND)),
        2 => Value::Str(random_text(rng)),
        3 => Value::Bool(rng.gen()),
        _ => Value::None,
    }
}

fn random_list(rng: &mut StdRng) -> Value {
    let len = rng.gen_range(0..=MAX_COLLECTION);
    Value::List((0..len).map(|_| random_scalar(rng)).collect())
}

fn random_dict(rng: &mut StdRng) -> Value {
    let len = rng.gen_range(0..=MAX_COLLECTION);
    let mut entries = BTreeMap::new();
    for _ in 0..len {
        entries.insert(random_text(rng), random_scalar(rng));
    }
    Value::Dict(entries)
}

/// An untyped parameter: any primitive kind, or a small collection.
fn random_blind(rng: &mut StdRng) -> Value {
    match rng.gen_range(0..7) {
        5 => random_list(rng),
        6 => random_dict(rng),
        _ => random_scalar(rng),
    }
}
