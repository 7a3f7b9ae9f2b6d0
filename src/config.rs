//! Run settings, built once at the CLI edge and threaded everywhere else.
//!
//! Layering is defaults, then environment overrides, then flags. Nothing
//! below the CLI reads the environment; workers receive `Settings` inside
//! their work order.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::verify::CrashPolicy;

/// Probing limits for strategy inference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Largest arity probed with the full palette product.
    pub exhaustive_arity: usize,
    pub random_trials: usize,
    /// Stop the wide-arity phases once this many distinct shapes work.
    pub max_signatures: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            exhaustive_arity: 3,
            random_trials: 20_000,
            max_signatures: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchSettings {
    /// Inputs kept for timing.
    pub inputs: usize,
    /// Inputs drawn per kept input, at most.
    pub candidate_factor: usize,
    pub warmup: usize,
    pub runs: usize,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            inputs: 100,
            candidate_factor: 10,
            warmup: 5,
            runs: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Guided sweep examples per callable.
    pub max_examples: usize,
    pub naive_iterations: usize,
    /// Candidate replays the shrinker may spend per failure.
    pub shrink_budget: usize,
    pub probe: ProbeSettings,
    pub bench: BenchSettings,
    pub deadline: Duration,
    /// Callable-level worker width.
    pub workers: usize,
    /// Job-level width.
    pub job_workers: usize,
    pub seed: u64,
    pub crash_policy: CrashPolicy,
    /// Report private names as passing without running them.
    pub skip_private: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let cores = available_parallelism();
        Self {
            max_examples: 100,
            naive_iterations: 50,
            shrink_budget: 500,
            probe: ProbeSettings::default(),
            bench: BenchSettings::default(),
            deadline: Duration::from_secs(15),
            workers: cores,
            job_workers: (cores / 2).max(1),
            seed: 0,
            crash_policy: CrashPolicy::default(),
            skip_private: true,
        }
    }
}

impl Settings {
    pub const MAX_EXAMPLES_VAR: &'static str = "PARITY_MAX_EXAMPLES";
    pub const BENCH_RUNS_VAR: &'static str = "PARITY_BENCH_RUNS";

    /// Apply environment overrides, read through `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        if let Some(n) = read_count(&lookup, Self::MAX_EXAMPLES_VAR)? {
            self.max_examples = n;
        }
        if let Some(n) = read_count(&lookup, Self::BENCH_RUNS_VAR)? {
            self.bench.runs = n;
        }
        Ok(self)
    }

    /// Per-callable seed: BLAKE3 of the run seed and the qualified name.
    pub fn seed_for(&self, name: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

fn read_count(
    lookup: &impl Fn(&str) -> Option<String>,
    variable: &str,
) -> Result<Option<usize>, SettingsError> {
    let Some(raw) = lookup(variable) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(SettingsError {
            variable: variable.to_string(),
            value: raw,
        }),
    }
}

pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
