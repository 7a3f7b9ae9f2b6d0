use std::time::Instant;

use super::guided::{guided_sweep, GuidedLimits};
use super::naive::{naive_sweep, random_args};
use super::{combine, judge, CrashPolicy, Differential, Trial, Verdict, VerifyContext};
use crate::error::InferError;
use crate::strategy::infer;
use crate::unit::{CallableDescriptor, FunctionInvoker, Unit};
use crate::value::Value;

/// The same free function in both units.
struct FunctionPair<'a> {
    original: &'a dyn Unit,
    candidate: &'a dyn Unit,
    name: &'a str,
}

impl Differential for FunctionPair<'_> {
    fn trial(&self, args: &[Value], policy: &CrashPolicy) -> Trial {
        let original = self.original.call(self.name, args);
        let candidate = self.candidate.call(self.name, args);
        judge(policy, args, original, candidate)
    }
}

/// Skip diagnostic for an inference failure.
pub(super) fn inference_skip(err: &InferError) -> String {
    match err {
        InferError::Unsatisfiable { name } => format!("no valid inputs for {}", name),
        InferError::Infrastructure { .. } => err.to_string(),
    }
}

/// Verify one shared free function: guided and naive sweeps, combined.
pub fn verify_function(
    original: &dyn Unit,
    candidate: &dyn Unit,
    descriptor: &CallableDescriptor,
    ctx: VerifyContext<'_>,
) -> Verdict {
    let settings = ctx.settings;
    let policy = &settings.crash_policy;
    let seed = settings.seed_for(descriptor.qualified());
    let pair = FunctionPair {
        original,
        candidate,
        name: &descriptor.name,
    };
    log::debug!("verifying function {}", descriptor.qualified());

    let start = Instant::now();
    let invoker = FunctionInvoker::new(original, descriptor);
    let guided = match infer(&invoker, ctx.manifest, &settings.probe, seed) {
        Ok(inferred) => {
            log::debug!(
                "{}: strategy {} from {}",
                descriptor.qualified(),
                inferred.strategy,
                inferred.resolution
            );
            let limits = GuidedLimits {
                max_examples: settings.max_examples,
                shrink_budget: settings.shrink_budget,
            };
            let mut verdict = guided_sweep(&pair, &inferred.strategy, policy, &limits, seed);
            verdict.duration = start.elapsed();
            verdict
        }
        Err(err) => Verdict::skip(start.elapsed(), inference_skip(&err)),
    };

    let naive = naive_sweep(
        &pair,
        policy,
        settings.naive_iterations,
        seed.rotate_left(1),
        |rng| random_args(&descriptor.params, rng),
    );
    combine(guided, naive)
}
