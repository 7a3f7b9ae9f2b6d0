//! Consolidated verification report.
//!
//! Jobs and callables finish in any order; rendering sorts both by name.


use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::bench::Speedup;
use crate::verify::{Status, Verdict};

// ─── Data Structures ───────────────────────────────────────────────

/// One verified callable. `name` is `function` or `Class.method`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallableReport {
    pub name: String,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speedup: Option<Speedup>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub name: String,
    pub status: Status,
    pub callables: Vec<CallableReport>,
    /// Why the whole job was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl JobReport {
    /// Roll callables up: FAIL iff any callable failed, otherwise PASS.
    pub fn new(name: &str, mut callables: Vec<CallableReport>) -> Self {
        callables.sort_by(|a, b| a.name.cmp(&b.name));
        let status = if callables.iter().any(|c| c.verdict.status == Status::Fail) {
            Status::Fail
        } else {
            Status::Pass
        };
        Self {
            name: name.to_string(),
            status,
            callables,
            note: None,
        }
    }

    /// A job whose units could not be loaded.
    pub fn skipped(name: &str, note: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: Status::Skip,
            callables: Vec::new(),
            note: Some(note.into()),
        }
    }
}

/// Average, best and worst measured speedup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerfSummary {
    pub average: f64,
    pub best: f64,
    pub worst: f64,
    pub samples: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub jobs: Vec<JobReport>,
}

impl Report {
    pub fn new(mut jobs: Vec<JobReport>) -> Self {
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        Self { jobs }
    }

    /// True iff any job FAILed; drives the exit code.
    pub fn failed(&self) -> bool {
        self.jobs.iter().any(|j| j.status == Status::Fail)
    }

    pub fn count(&self, status: Status) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }

    /// `None` when no benchmark produced a ratio.
    pub fn perf_summary(&self) -> Option<PerfSummary> {
        let ratios: Vec<f64> = self
            .jobs
            .iter()
            .flat_map(|j| &j.callables)
            .filter_map(|c| c.speedup.and_then(|s| s.ratio()))
            .collect();
        if ratios.is_empty() {
            return None;
        }
        Some(PerfSummary {
            average: ratios.iter().sum::<f64>() / ratios.len() as f64,
            best: ratios.iter().copied().fold(f64::MIN, f64::max),
            worst: ratios.iter().copied().fold(f64::MAX, f64::min),
            samples: ratios.len(),
        })
    }

    // ─── Rendering ─────────────────────────────────────────────────

    /// Line-oriented text report.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let Some(perf) = self.perf_summary() {
            let _ = writeln!(out, "--- Global Performance Summary ---");
            let _ = writeln!(out, "Average Speedup: {:.2}x", perf.average);
            let _ = writeln!(out, "Best Speedup:    {:.2}x", perf.best);
            let _ = writeln!(out, "Worst Speedup:   {:.2}x", perf.worst);
            let _ = writeln!(out, "----------------------------------");
            let _ = writeln!(out);
        }

        for job in &self.jobs {
            let _ = writeln!(out, "[{}] {}", job.status, job.name);
            if let Some(note) = &job.note {
                let _ = writeln!(out, "  {}", note);
            }
            for callable in &job.callables {
                render_callable(&mut out, callable);
            }
        }

        let _ = writeln!(
            out,
            "\n{} jobs: {} passed, {} failed, {} skipped",
            self.jobs.len(),
            self.count(Status::Pass),
            self.count(Status::Fail),
            self.count(Status::Skip),
        );
        out
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn render_callable(out: &mut String, callable: &CallableReport) {
    let verdict = &callable.verdict;
    let mut extras = vec![format!("{:.4}s", verdict.duration.as_secs_f64())];
    if let Some(speedup) = callable.speedup {
        extras.push(format!("Speedup: {}", speedup));
    }
    let _ = writeln!(
        out,
        "  [{}] {} ({})",
        verdict.status,
        callable.name,
        extras.join(", ")
    );

    let Some(diagnostic) = &verdict.diagnostic else {
        return;
    };
    match verdict.status {
        Status::Fail => {
            let _ = writeln!(out, "    ERROR Details:");
            for line in diagnostic.lines() {
                let _ = writeln!(out, "      {}", line);
            }
        }
        Status::Skip | Status::Pass => {
            for line in diagnostic.lines() {
                let _ = writeln!(out, "    {}", line);
            }
        }
    }
}
