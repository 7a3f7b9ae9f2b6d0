//! Isolated, deadline-bounded execution of verification units.
//!
//! Every callable verification and every benchmark is a `WorkOrder` run by
//! an `Executor` behind its own fault boundary. The `Supervisor` admits
//! orders up to a fixed width, polls the running ones, and terminates any
//! that outlive the deadline. Results only travel back as `UnitOutcome`s.

mod process;
mod thread;
#[cfg(test)]
mod tests;

pub use process::ProcessExecutor;
pub use thread::ThreadExecutor;

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::bench::{bench_function, bench_method, Speedup};
use crate::config::Settings;
use crate::error::SupervisorError;
use crate::strategy::Manifest;
use crate::unit::Loader;
use crate::verify::{verify_function, verify_method, Status, Verdict, VerifyContext};

// ─── Work Orders ───────────────────────────────────────────────────

/// The callable a work order is about.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Function { name: String },
    Method { class: String, method: String },
}

impl Target {
    pub fn function(name: &str) -> Self {
        Target::Function {
            name: name.to_string(),
        }
    }

    pub fn method(class: &str, method: &str) -> Self {
        Target::Method {
            class: class.to_string(),
            method: method.to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Function { name } => write!(f, "{}", name),
            Target::Method { class, method } => write!(f, "{}.{}", class, method),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Verify,
    Bench,
}

/// Everything a worker needs, and nothing it has to look up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkOrder {
    pub original: PathBuf,
    pub candidate: PathBuf,
    pub target: Target,
    pub kind: TaskKind,
    pub settings: Settings,
    #[serde(default)]
    pub manifest: Manifest,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnitOutcome {
    Verdict(Verdict),
    Speedup(Speedup),
    BenchSkipped { reason: String },
}

impl UnitOutcome {
    /// The outcome for a unit that never produced one.
    pub fn abandoned(kind: TaskKind, elapsed: Duration, reason: &str) -> Self {
        match kind {
            TaskKind::Verify => UnitOutcome::Verdict(Verdict::skip(elapsed, reason)),
            TaskKind::Bench => UnitOutcome::BenchSkipped {
                reason: reason.to_string(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UnitOutcome::Verdict(v) if v.status == Status::Fail)
    }
}

/// Worker body: load both units and run one order.
pub fn execute(order: &WorkOrder, loader: &dyn Loader) -> UnitOutcome {
    let start = Instant::now();
    let units = loader
        .load(&order.original)
        .and_then(|original| loader.load(&order.candidate).map(|c| (original, c)));
    let (original, candidate) = match units {
        Ok(pair) => pair,
        Err(e) => {
            return UnitOutcome::abandoned(order.kind, start.elapsed(), &format!("load failed: {}", e))
        }
    };
    let ctx = VerifyContext::new(&order.settings, &order.manifest);

    match &order.target {
        Target::Function { name } => {
            let Some(descriptor) = original.functions().into_iter().find(|f| &f.name == name) else {
                return UnitOutcome::abandoned(order.kind, start.elapsed(), "function not found");
            };
            match order.kind {
                TaskKind::Verify => UnitOutcome::Verdict(verify_function(
                    original.as_ref(),
                    candidate.as_ref(),
                    &descriptor,
                    ctx,
                )),
                TaskKind::Bench => bench_outcome(bench_function(
                    original.as_ref(),
                    candidate.as_ref(),
                    &descriptor,
                    ctx,
                )),
            }
        }
        Target::Method { class, method } => {
            let found = original
                .classes()
                .into_iter()
                .find(|c| &c.name == class)
                .and_then(|c| c.method(method).cloned().map(|m| (c, m)));
            let Some((class, method)) = found else {
                return UnitOutcome::abandoned(order.kind, start.elapsed(), "method not found");
            };
            match order.kind {
                TaskKind::Verify => UnitOutcome::Verdict(verify_method(
                    original.as_ref(),
                    candidate.as_ref(),
                    &class,
                    &method,
                    ctx,
                )),
                TaskKind::Bench => bench_outcome(bench_method(
                    original.as_ref(),
                    candidate.as_ref(),
                    &class,
                    &method,
                    ctx,
                )),
            }
        }
    }
}

fn bench_outcome(result: Result<Speedup, String>) -> UnitOutcome {
    match result {
        Ok(speedup) => UnitOutcome::Speedup(speedup),
        Err(reason) => UnitOutcome::BenchSkipped { reason },
    }
}

// ─── Executors ─────────────────────────────────────────────────────

/// Starts work orders behind a fault boundary.
pub trait Executor: Send + Sync {
    fn launch(&self, order: WorkOrder) -> Result<Box<dyn Running>, SupervisorError>;
}

/// A launched order.
pub trait Running: Send {
    /// Non-blocking; `Some` once the unit has finished, crashed included.
    fn poll(&mut self) -> Option<UnitOutcome>;
    /// Destroy the unit's execution context.
    fn terminate(&mut self);
}

// ─── Supervisor ────────────────────────────────────────────────────

/// One finished unit.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitReport {
    pub target: Target,
    pub kind: TaskKind,
    pub outcome: UnitOutcome,
}

struct Active {
    target: Target,
    kind: TaskKind,
    running: Box<dyn Running>,
    started: Instant,
}

pub struct Supervisor<'a> {
    executor: &'a dyn Executor,
    width: usize,
    deadline: Duration,
    poll_interval: Duration,
}

impl<'a> Supervisor<'a> {
    pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new(executor: &'a dyn Executor, width: usize, deadline: Duration) -> Self {
        Self {
            executor,
            width: width.max(1),
            deadline,
            poll_interval: Self::POLL_INTERVAL,
        }
    }

    /// Run every order; reports come back in completion order.
    pub fn run(&self, orders: Vec<WorkOrder>) -> Vec<UnitReport> {
        let mut queue: VecDeque<WorkOrder> = orders.into();
        let mut active: Vec<Active> = Vec::new();
        let mut reports = Vec::new();

        loop {
            while active.len() < self.width {
                let Some(order) = queue.pop_front() else {
                    break;
                };
                let (target, kind) = (order.target.clone(), order.kind);
                match self.executor.launch(order) {
                    Ok(running) => active.push(Active {
                        target,
                        kind,
                        running,
                        started: Instant::now(),
                    }),
                    Err(e) => {
                        let reason = format!("worker crashed: {}", e);
                        reports.push(UnitReport {
                            outcome: UnitOutcome::abandoned(kind, Duration::ZERO, &reason),
                            target,
                            kind,
                        });
                    }
                }
            }
            if active.is_empty() {
                break;
            }

            let mut i = 0;
            while i < active.len() {
                let unit = &mut active[i];
                if let Some(outcome) = unit.running.poll() {
                    let unit = active.swap_remove(i);
                    reports.push(UnitReport {
                        target: unit.target,
                        kind: unit.kind,
                        outcome,
                    });
                } else if unit.started.elapsed() > self.deadline {
                    unit.running.terminate();
                    let unit = active.swap_remove(i);
                    log::warn!("{} timed out after {:?}", unit.target, self.deadline);
                    reports.push(UnitReport {
                        outcome: UnitOutcome::abandoned(unit.kind, self.deadline, "timeout"),
                        target: unit.target,
                        kind: unit.kind,
                    });
                } else {
                    i += 1;
                }
            }

            if !active.is_empty() {
                std::thread::sleep(self.poll_interval);
            }
        }
        reports
    }
}

/// True iff any unit failed verification.
pub fn batch_failed(reports: &[UnitReport]) -> bool {
    reports.iter().any(|r| r.outcome.is_failure())
}
