use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;

use super::{discover, Job, MANIFEST_FILE};
use crate::bench::Speedup;
use crate::config::Settings;
use crate::diagnostic::clean_diagnostic;
use crate::error::WorkspaceError;
use crate::report::{CallableReport, JobReport, Report};
use crate::strategy::Manifest;
use crate::supervisor::{Executor, Supervisor, Target, TaskKind, UnitOutcome, UnitReport, WorkOrder};
use crate::unit::{common_classes, common_functions, is_dunder, is_private, Loader};
use crate::verify::Verdict;

const PRIVATE_NOTE: &str = "private, not verified";

/// Fans verification and benchmarking out across a workspace.
///
/// Jobs run on a rayon pool `job_workers` wide. Within a job, verification
/// and benchmarking each get their own supervisor and run side by side.
pub struct Orchestrator {
    settings: Settings,
    manifest: Manifest,
    loader: Arc<dyn Loader>,
    executor: Arc<dyn Executor>,
}

impl Orchestrator {
    pub fn new(settings: Settings, loader: Arc<dyn Loader>, executor: Arc<dyn Executor>) -> Self {
        Self {
            settings,
            manifest: Manifest::default(),
            loader,
            executor,
        }
    }

    /// A manifest applied to every job; per-job `type_hints.json` entries
    /// take precedence over it.
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn run(&self, workspace: &Path) -> Result<Report, WorkspaceError> {
        let jobs = discover(workspace, self.loader.as_ref())?;
        log::info!("found {} jobs in '{}'", jobs.len(), workspace.display());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.job_workers.max(1))
            .thread_name(|i| format!("parity-job-{}", i))
            .build()?;
        let reports = pool.install(|| jobs.par_iter().map(|job| self.run_job(job)).collect());
        Ok(Report::new(reports))
    }

    pub fn run_job(&self, job: &Job) -> JobReport {
        let loaded = self
            .loader
            .load(&job.original)
            .and_then(|original| self.loader.load(&job.candidate).map(|c| (original, c)));
        let (original, candidate) = match loaded {
            Ok(pair) => pair,
            Err(e) => {
                log::warn!("skipping job '{}': {}", job.name, e);
                return JobReport::skipped(&job.name, format!("load failed: {}", e));
            }
        };

        let manifest = match &job.manifest {
            None => self.manifest.clone(),
            Some(path) => match Manifest::load(path) {
                Ok(local) => self.manifest.merged(&local),
                Err(e) => {
                    log::warn!("skipping job '{}': {}", job.name, e);
                    return JobReport::skipped(&job.name, format!("invalid {}: {}", MANIFEST_FILE, e));
                }
            },
        };

        let mut callables = Vec::new();
        let mut targets = Vec::new();
        let mut admit = |target: Target, name: &str| {
            if self.settings.skip_private && is_private(name) {
                callables.push(CallableReport {
                    name: target.to_string(),
                    verdict: Verdict::pass(Duration::ZERO).with_note(PRIVATE_NOTE),
                    speedup: None,
                });
            } else {
                targets.push(target);
            }
        };
        for function in common_functions(original.as_ref(), candidate.as_ref()) {
            admit(Target::function(&function.name), &function.name);
        }
        for shared in common_classes(original.as_ref(), candidate.as_ref()) {
            for method in shared.methods.iter().filter(|m| !is_dunder(&m.name)) {
                admit(Target::method(&shared.class.name, &method.name), &method.name);
            }
        }
        // Workers load their own copies.
        drop((original, candidate));
        log::debug!("job '{}': {} callables to verify", job.name, targets.len());

        let orders = |kind: TaskKind| -> Vec<WorkOrder> {
            targets
                .iter()
                .map(|target| WorkOrder {
                    original: job.original.clone(),
                    candidate: job.candidate.clone(),
                    target: target.clone(),
                    kind,
                    settings: self.settings.clone(),
                    manifest: manifest.clone(),
                })
                .collect()
        };
        let supervisor = Supervisor::new(
            self.executor.as_ref(),
            self.settings.workers,
            self.settings.deadline,
        );
        let (verified, benched) = std::thread::scope(|s| {
            let bench = s.spawn(|| supervisor.run(orders(TaskKind::Bench)));
            let verified = supervisor.run(orders(TaskKind::Verify));
            let benched = bench.join().unwrap_or_else(|_| {
                log::warn!("job '{}': benchmark supervisor panicked", job.name);
                Vec::new()
            });
            (verified, benched)
        });

        let speedups = speedups(benched);
        callables.extend(verified.into_iter().map(|report| {
            let verdict = match report.outcome {
                UnitOutcome::Verdict(verdict) => verdict,
                other => Verdict::skip(Duration::ZERO, format!("unexpected outcome: {:?}", other)),
            };
            CallableReport {
                name: report.target.to_string(),
                speedup: speedups.get(&report.target).copied(),
                verdict: self.cleaned(job, verdict),
            }
        }));
        JobReport::new(&job.name, callables)
    }

    fn cleaned(&self, job: &Job, mut verdict: Verdict) -> Verdict {
        let file_name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        if let Some(raw) = verdict.diagnostic.take() {
            verdict.diagnostic = Some(clean_diagnostic(
                &raw,
                &file_name(&job.original),
                &file_name(&job.candidate),
            ));
        }
        verdict
    }
}

fn speedups(reports: Vec<UnitReport>) -> BTreeMap<Target, Speedup> {
    reports
        .into_iter()
        .filter_map(|r| match r.outcome {
            UnitOutcome::Speedup(s) => Some((r.target, s)),
            UnitOutcome::BenchSkipped { reason } => {
                log::debug!("bench {} skipped: {}", r.target, reason);
                None
            }
            UnitOutcome::Verdict(_) => None,
        })
        .collect()
}
