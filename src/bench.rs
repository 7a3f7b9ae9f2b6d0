//! Companion performance benchmark. Advisory only: never affects verdicts.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::BenchSettings;
use crate::strategy::{infer, Strategy};
use crate::unit::{
    CallableDescriptor, ClassDescriptor, ConstructorInvoker, FunctionInvoker, Instance,
    MethodInvoker, Outcome, Unit,
};
use crate::value::Value;
use crate::verify::VerifyContext;

/// Mean wall time per pass over the input set, for each side.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Speedup {
    pub original_mean: f64,
    pub candidate_mean: f64,
}

impl Speedup {
    /// original / candidate; `None` when the candidate took no time.
    pub fn ratio(&self) -> Option<f64> {
        (self.candidate_mean > 0.0).then(|| self.original_mean / self.candidate_mean)
    }
}

impl fmt::Display for Speedup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ratio() {
            Some(r) => write!(f, "{:.2}x", r),
            None => write!(f, "N/A"),
        }
    }
}

/// Draw up to `inputs * candidate_factor` examples and keep the first
/// `inputs` the original accepts.
fn collect_inputs(
    strategy: &Strategy,
    bench: &BenchSettings,
    seed: u64,
    accepts: impl Fn(&[Value]) -> bool,
) -> Vec<Vec<Value>> {
    strategy
        .examples(seed)
        .take(bench.inputs.saturating_mul(bench.candidate_factor))
        .map(|e| e.args)
        .filter(|args| accepts(args))
        .take(bench.inputs)
        .collect()
}

/// Warm up, then time `runs` passes over every input. Returns the mean
/// pass time in seconds.
fn measure(inputs: &[Vec<Value>], bench: &BenchSettings, call: impl Fn(&[Value]) -> Outcome) -> f64 {
    for _ in 0..bench.warmup {
        for args in inputs {
            let _ = call(args);
        }
    }
    let samples: Vec<f64> = (0..bench.runs.max(1))
        .map(|_| {
            let start = Instant::now();
            for args in inputs {
                let _ = call(args);
            }
            start.elapsed().as_secs_f64()
        })
        .collect();
    samples.iter().mean()
}

fn compare(
    inputs: &[Vec<Value>],
    bench: &BenchSettings,
    original: impl Fn(&[Value]) -> Outcome,
    candidate: impl Fn(&[Value]) -> Outcome,
) -> Result<Speedup, String> {
    if inputs.is_empty() {
        return Err("no usable inputs".to_string());
    }
    Ok(Speedup {
        original_mean: measure(inputs, bench, original),
        candidate_mean: measure(inputs, bench, candidate),
    })
}

/// Benchmark a shared free function.
pub fn bench_function(
    original: &dyn Unit,
    candidate: &dyn Unit,
    descriptor: &CallableDescriptor,
    ctx: VerifyContext<'_>,
) -> Result<Speedup, String> {
    let settings = ctx.settings;
    let seed = settings.seed_for(descriptor.qualified());
    let invoker = FunctionInvoker::new(original, descriptor);
    let inferred =
        infer(&invoker, ctx.manifest, &settings.probe, seed).map_err(|e| e.to_string())?;
    let name = descriptor.name.as_str();
    let inputs = collect_inputs(&inferred.strategy, &settings.bench, seed, |args| {
        original.call(name, args).is_ok()
    });
    log::debug!("bench {}: {} inputs", descriptor.qualified(), inputs.len());
    compare(
        &inputs,
        &settings.bench,
        |args| original.call(name, args),
        |args| candidate.call(name, args),
    )
}

/// Benchmark a shared method on one instance per side, built from one
/// sampled constructor tuple.
pub fn bench_method(
    original: &dyn Unit,
    candidate: &dyn Unit,
    class: &ClassDescriptor,
    method: &CallableDescriptor,
    ctx: VerifyContext<'_>,
) -> Result<Speedup, String> {
    let settings = ctx.settings;
    let seed = settings.seed_for(method.qualified());
    let ctor = infer(
        &ConstructorInvoker::new(original, class),
        ctx.manifest,
        &settings.probe,
        seed,
    )
    .map_err(|e| e.to_string())?;
    let ctor_args = ctor
        .strategy
        .examples(seed)
        .next()
        .map(|e| e.args)
        .ok_or_else(|| "could not find valid constructor arguments".to_string())?;
    let build = |unit: &dyn Unit| -> Result<Box<dyn Instance>, String> {
        unit.construct(&class.name, &ctor_args)
            .map_err(|e| format!("construction raised {}", e))
    };
    let ours = build(original)?;
    let theirs = build(candidate)?;

    let inferred = infer(
        &MethodInvoker::new(ours.as_ref(), method),
        ctx.manifest,
        &settings.probe,
        seed,
    )
    .map_err(|e| e.to_string())?;
    let name = method.name.as_str();
    let inputs = collect_inputs(&inferred.strategy, &settings.bench, seed, |args| {
        ours.call_method(name, args).is_ok()
    });
    compare(
        &inputs,
        &settings.bench,
        |args| ours.call_method(name, args),
        |args| theirs.call_method(name, args),
    )
}
