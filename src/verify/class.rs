use std::time::Instant;

use super::function::inference_skip;
use super::guided::{guided_sweep, GuidedLimits};
use super::naive::{naive_sweep, random_args};
use super::{check, combine, judge, CrashPolicy, Differential, Trial, Verdict, VerifyContext};
use crate::strategy::{infer, Strategy};
use crate::unit::{CallableDescriptor, ClassDescriptor, ConstructorInvoker, MethodInvoker, Unit};
use crate::value::Value;

const NO_CONSTRUCTOR_ARGS: &str = "could not find valid constructor arguments";

/// A method of the same class in both units. Each trial takes
/// `[constructor args, method args]` and builds fresh instances.
struct MethodPair<'a> {
    original: &'a dyn Unit,
    candidate: &'a dyn Unit,
    class: &'a str,
    method: &'a str,
}

impl Differential for MethodPair<'_> {
    fn trial(&self, args: &[Value], policy: &CrashPolicy) -> Trial {
        let (Some(ctor_args), Some(method_args)) = (
            args.first().and_then(Value::as_seq),
            args.get(1).and_then(Value::as_seq),
        ) else {
            return Trial::Discarded;
        };

        let original = match self.original.construct(self.class, ctor_args) {
            Ok(instance) => instance,
            Err(raised) if raised.is_infrastructure() => {
                return Trial::Aborted(format!("host failure: {}", raised.message))
            }
            Err(_) => return Trial::Discarded,
        };
        let candidate = match self.candidate.construct(self.class, ctor_args) {
            Ok(instance) => instance,
            Err(raised) if raised.is_infrastructure() => {
                return Trial::Aborted(format!("host failure: {}", raised.message))
            }
            Err(raised) => {
                return match check(policy, args, Ok(Value::None), Err(raised)) {
                    Ok(()) => Trial::Discarded,
                    Err(mismatch) => Trial::Diverged(mismatch),
                }
            }
        };

        let a = original.call_method(self.method, method_args);
        let b = candidate.call_method(self.method, method_args);
        judge(policy, args, a, b)
    }
}

fn pack(ctor_args: &[Value], method_args: Vec<Value>) -> Vec<Value> {
    vec![Value::Tuple(ctor_args.to_vec()), Value::Tuple(method_args)]
}

/// Verify one shared method: sample constructor arguments, infer the
/// method's inputs on a sampled instance, then run both sweeps with fresh
/// instances per example.
pub fn verify_method(
    original: &dyn Unit,
    candidate: &dyn Unit,
    class: &ClassDescriptor,
    method: &CallableDescriptor,
    ctx: VerifyContext<'_>,
) -> Verdict {
    let settings = ctx.settings;
    let policy = &settings.crash_policy;
    let seed = settings.seed_for(method.qualified());
    let start = Instant::now();
    log::debug!("verifying method {}", method.qualified());

    let ctor_invoker = ConstructorInvoker::new(original, class);
    let ctor = match infer(&ctor_invoker, ctx.manifest, &settings.probe, seed) {
        Ok(inferred) => inferred.strategy,
        Err(err) => {
            log::debug!("{}: {}", class.name, err);
            return Verdict::skip(start.elapsed(), NO_CONSTRUCTOR_ARGS);
        }
    };
    let Some(sample) = ctor.examples(seed).next() else {
        return Verdict::skip(start.elapsed(), NO_CONSTRUCTOR_ARGS);
    };
    let ctor_args = sample.args;
    let instance = match original.construct(&class.name, &ctor_args) {
        Ok(instance) => instance,
        Err(raised) => {
            log::debug!("{}: sampled construction raised {}", class.name, raised);
            return Verdict::skip(start.elapsed(), NO_CONSTRUCTOR_ARGS);
        }
    };

    let pair = MethodPair {
        original,
        candidate,
        class: &class.name,
        method: &method.name,
    };
    let method_invoker = MethodInvoker::new(instance.as_ref(), method);
    let guided = match infer(&method_invoker, ctx.manifest, &settings.probe, seed) {
        Ok(inferred) => {
            let combined = Strategy::Tuple(vec![ctor.clone(), inferred.strategy]);
            let limits = GuidedLimits {
                max_examples: settings.max_examples,
                shrink_budget: settings.shrink_budget,
            };
            let mut verdict = guided_sweep(&pair, &combined, policy, &limits, seed);
            verdict.duration = start.elapsed();
            verdict
        }
        Err(err) => Verdict::skip(start.elapsed(), inference_skip(&err)),
    };
    drop(instance);

    let naive = naive_sweep(
        &pair,
        policy,
        settings.naive_iterations,
        seed.rotate_left(1),
        |rng| pack(&ctor_args, random_args(&method.params, rng)),
    );
    combine(guided, naive)
}
