//! Differential verification of one callable.
//!
//! Two independent sweeps drive the oracle: a guided sweep over the
//! inferred strategy (with shrinking on failure) and a naive uniform
//! random sweep that ignores inference. Their verdicts are combined into
//! one per callable.

mod class;
mod function;
mod guided;
mod naive;
pub mod oracle;
mod shrink;

pub use class::verify_method;
pub use function::verify_function;
pub use oracle::{check, values_equal, CrashPolicy, Mismatch};

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::strategy::Manifest;
use crate::unit::Raised;
use crate::value::Value;

// ─── Verdicts ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Skip,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pass => write!(f, "PASS"),
            Status::Fail => write!(f, "FAIL"),
            Status::Skip => write!(f, "SKIP"),
        }
    }
}

/// Outcome of verifying one callable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: Status,
    pub duration: Duration,
    /// Why it failed or was skipped; empty on a plain pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl Verdict {
    pub fn pass(duration: Duration) -> Self {
        Self {
            status: Status::Pass,
            duration,
            diagnostic: None,
        }
    }

    pub fn fail(duration: Duration, diagnostic: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            duration,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn skip(duration: Duration, diagnostic: impl Into<String>) -> Self {
        Self {
            status: Status::Skip,
            duration,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.diagnostic = Some(note.to_string());
        self
    }
}

/// Fold the guided and naive sweeps into one verdict.
///
/// Any failure wins. Otherwise one completed sweep is enough to pass.
/// Durations add.
pub fn combine(guided: Verdict, naive: Verdict) -> Verdict {
    let duration = guided.duration + naive.duration;
    let (status, diagnostic) = match (guided.status, naive.status) {
        (Status::Fail, _) => (Status::Fail, guided.diagnostic),
        (_, Status::Fail) => (Status::Fail, naive.diagnostic),
        (Status::Pass, _) | (_, Status::Pass) => (Status::Pass, None),
        (Status::Skip, Status::Skip) => (Status::Skip, guided.diagnostic.or(naive.diagnostic)),
    };
    Verdict {
        status,
        duration,
        diagnostic,
    }
}

// ─── Trials ────────────────────────────────────────────────────────

/// What one example did.
pub(crate) enum Trial {
    /// The oracle accepted. `usable` is whether the original returned
    /// normally.
    Agreed { usable: bool },
    Diverged(Mismatch),
    /// Not a valid input for the original (its construction failed).
    Discarded,
    /// The host failed; the sweep cannot continue.
    Aborted(String),
}

/// Runs one argument list through both implementations.
pub(crate) trait Differential {
    fn trial(&self, args: &[Value], policy: &CrashPolicy) -> Trial;
}

/// Apply the oracle, unless either side failed for infrastructure
/// reasons.
pub(crate) fn judge(
    policy: &CrashPolicy,
    input: &[Value],
    original: Result<Value, Raised>,
    candidate: Result<Value, Raised>,
) -> Trial {
    for side in [&original, &candidate] {
        if let Err(raised) = side {
            if raised.is_infrastructure() {
                return Trial::Aborted(format!("host failure: {}", raised.message));
            }
        }
    }
    let usable = original.is_ok();
    match check(policy, input, original, candidate) {
        Ok(()) => Trial::Agreed { usable },
        Err(mismatch) => Trial::Diverged(mismatch),
    }
}

/// What a verifier needs besides the two units.
#[derive(Clone, Copy)]
pub struct VerifyContext<'a> {
    pub settings: &'a Settings,
    pub manifest: &'a Manifest,
}

impl<'a> VerifyContext<'a> {
    pub fn new(settings: &'a Settings, manifest: &'a Manifest) -> Self {
        Self { settings, manifest }
    }
}
