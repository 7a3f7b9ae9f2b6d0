//! Choice-sequence shrinking.
//!
//! A failing example is the choice sequence that produced it. Candidates
//! are smaller sequences, replayed through the strategy; a candidate is
//! kept when it still diverges and sorts before the current one by
//! (length, lexicographic order).

use super::{CrashPolicy, Differential, Mismatch, Trial};
use crate::strategy::{DataSource, Strategy};

struct Shrinker<'a> {
    subject: &'a dyn Differential,
    strategy: &'a Strategy,
    policy: &'a CrashPolicy,
    current: Vec<u64>,
    best: Mismatch,
    budget: usize,
}

fn sort_key(choices: &[u64]) -> (usize, &[u64]) {
    (choices.len(), choices)
}

impl Shrinker<'_> {
    /// Replay `candidate`; adopt it if it still fails and is simpler.
    fn consider(&mut self, candidate: &[u64]) -> bool {
        if self.budget == 0 || sort_key(candidate) >= sort_key(&self.current) {
            return false;
        }
        self.budget -= 1;
        let mut source = DataSource::replay(candidate);
        let Ok(args) = self.strategy.draw_args(&mut source) else {
            return false;
        };
        match self.subject.trial(&args, self.policy) {
            Trial::Diverged(mismatch) => {
                let used = source.into_choices();
                // Replay may consume fewer choices than offered.
                let used = if sort_key(&used) < sort_key(&self.current) {
                    used
                } else {
                    candidate.to_vec()
                };
                self.current = used;
                self.best = mismatch;
                true
            }
            _ => false,
        }
    }

    fn delete_chunks(&mut self) -> bool {
        let mut improved = false;
        for size in [8, 4, 2, 1] {
            let mut i = 0;
            while i + size <= self.current.len() {
                let mut candidate = self.current.clone();
                candidate.drain(i..i + size);
                if self.consider(&candidate) {
                    improved = true;
                } else {
                    i += 1;
                }
            }
        }
        improved
    }

    fn zero_chunks(&mut self) -> bool {
        let mut improved = false;
        for size in [8, 4, 2, 1] {
            let mut i = 0;
            while i + size <= self.current.len() {
                if self.current[i..i + size].iter().any(|&c| c != 0) {
                    let mut candidate = self.current.clone();
                    candidate[i..i + size].iter_mut().for_each(|c| *c = 0);
                    improved |= self.consider(&candidate);
                }
                i += 1;
            }
        }
        improved
    }

    /// Lower each choice: try zero, then halve, then step down by one.
    fn minimize_choices(&mut self) -> bool {
        let mut improved = false;
        let mut i = 0;
        while i < self.current.len() {
            loop {
                let value = self.current[i];
                if value == 0 || self.budget == 0 {
                    break;
                }
                let mut adopted = false;
                for lower in [0, value / 2, value - 1] {
                    if lower >= value {
                        continue;
                    }
                    let mut candidate = self.current.clone();
                    candidate[i] = lower;
                    if self.consider(&candidate) {
                        adopted = true;
                        break;
                    }
                }
                if !adopted || i >= self.current.len() {
                    break;
                }
                improved = true;
            }
            i += 1;
        }
        improved
    }
}

/// Shrink a failing example within `budget` replays.
pub(crate) fn shrink(
    subject: &dyn Differential,
    strategy: &Strategy,
    policy: &CrashPolicy,
    choices: Vec<u64>,
    first: Mismatch,
    budget: usize,
) -> Mismatch {
    let mut shrinker = Shrinker {
        subject,
        strategy,
        policy,
        current: choices,
        best: first,
        budget,
    };
    loop {
        let mut improved = shrinker.delete_chunks();
        improved |= shrinker.zero_chunks();
        improved |= shrinker.minimize_choices();
        if !improved || shrinker.budget == 0 {
            break;
        }
    }
    shrinker.best
}
