use std::time::Instant;

use super::shrink::shrink;
use super::{CrashPolicy, Differential, Trial, Verdict};
use crate::strategy::Strategy;

/// Budget for the guided sweep.
pub(crate) struct GuidedLimits {
    pub max_examples: usize,
    pub shrink_budget: usize,
}

/// Property run over `strategy`: up to `max_examples` valid examples, the
/// all-minimal one first. A divergence is shrunk before it is reported.
pub(crate) fn guided_sweep(
    subject: &dyn Differential,
    strategy: &Strategy,
    policy: &CrashPolicy,
    limits: &GuidedLimits,
    seed: u64,
) -> Verdict {
    let start = Instant::now();
    let max_attempts = limits.max_examples.saturating_mul(10).max(1);
    let mut valid = 0;

    for example in strategy.examples(seed).take(max_attempts) {
        if valid >= limits.max_examples {
            break;
        }
        match subject.trial(&example.args, policy) {
            Trial::Agreed { .. } => valid += 1,
            Trial::Discarded => {}
            Trial::Aborted(reason) => return Verdict::skip(start.elapsed(), reason),
            Trial::Diverged(mismatch) => {
                let minimal = shrink(
                    subject,
                    strategy,
                    policy,
                    example.choices,
                    mismatch,
                    limits.shrink_budget,
                );
                log::debug!("guided sweep failed: {}", minimal);
                return Verdict::fail(
                    start.elapsed(),
                    format!("{}\nFalsifying example: {}", minimal, minimal.input_text()),
                );
            }
        }
    }

    if valid == 0 {
        Verdict::skip(start.elapsed(), "no valid inputs")
    } else {
        Verdict::pass(start.elapsed())
    }
}
