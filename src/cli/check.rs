use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};

use parity::config::{available_parallelism, Settings};
use parity::error::SettingsError;
use parity::supervisor::{Executor, ProcessExecutor, ThreadExecutor};
use parity::{CrashPolicy, Loader, Manifest, Orchestrator};

use super::{resolve_host, DEFAULT_EXT, DEFAULT_HOST};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Isolation {
    /// One worker process per unit (killable on timeout)
    Process,
    /// One worker thread per unit (detached on timeout)
    Thread,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Workspace directory with one subdirectory per job
    #[arg(required_unless_present = "target_dir", conflicts_with = "target_dir")]
    pub workspace: Option<PathBuf>,
    /// Workspace directory (alternative to the positional argument)
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,
    /// Callable-level worker width (default: available parallelism)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,
    /// Job-level worker width
    #[arg(long)]
    pub job_workers: Option<usize>,
    /// Inline type manifest JSON, merged under each job's type_hints.json
    #[arg(long, default_value = "{}")]
    pub manifest: String,
    /// Language host command, started as `<CMD> <unit path>`
    #[arg(long, value_name = "CMD", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Unit file extension
    #[arg(long, default_value = DEFAULT_EXT)]
    pub ext: String,
    /// Fault boundary for each verification unit
    #[arg(long, value_enum, default_value_t = Isolation::Process)]
    pub isolation: Isolation,
    /// Per-unit wall-clock deadline in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_deadline)]
    pub deadline: Option<Duration>,
    /// Base seed for all generators
    #[arg(long)]
    pub seed: Option<u64>,
    /// Add an error category the candidate may fix (repeatable)
    #[arg(long, value_name = "CATEGORY")]
    pub tolerate: Vec<String>,
    /// Require every original error to be reproduced exactly
    #[arg(long)]
    pub strict_errors: bool,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_deadline(raw: &str) -> Result<Duration, String> {
    match raw.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(format!("'{}' is not a positive number of seconds", raw)),
    }
}

/// Defaults, then environment overrides, then flags.
fn build_settings(args: &CheckArgs) -> Result<Settings, SettingsError> {
    let mut settings = Settings::default().with_env_overrides(|var| std::env::var(var).ok())?;
    if let Some(n) = args.workers {
        settings.workers = n.max(1);
    }
    settings.job_workers = match (args.job_workers, args.isolation) {
        (Some(n), _) => n.max(1),
        (None, Isolation::Thread) => available_parallelism(),
        (None, Isolation::Process) => settings.job_workers,
    };
    if let Some(deadline) = args.deadline {
        settings.deadline = deadline;
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if args.strict_errors {
        settings.crash_policy = CrashPolicy::strict();
    }
    for category in &args.tolerate {
        settings.crash_policy = settings.crash_policy.tolerate(category);
    }
    Ok(settings)
}

pub fn cmd_check(args: CheckArgs) {
    let Some(workspace) = args.workspace.clone().or_else(|| args.target_dir.clone()) else {
        eprintln!("error: no workspace given");
        process::exit(1);
    };

    let settings = match build_settings(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let manifest = match Manifest::parse(&args.manifest) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: invalid --manifest: {}", e);
            process::exit(1);
        }
    };

    let host = resolve_host(&args.host, &args.ext);
    let loader: Arc<dyn Loader> = host;
    let executor: Arc<dyn Executor> = match args.isolation {
        Isolation::Thread => Arc::new(ThreadExecutor::new(Arc::clone(&loader))),
        Isolation::Process => {
            let mut worker_args = vec![
                "worker".to_string(),
                "--host".to_string(),
                args.host.clone(),
                "--ext".to_string(),
                args.ext.clone(),
            ];
            if log::log_enabled!(log::Level::Debug) {
                worker_args.push("--verbose".to_string());
            }
            match ProcessExecutor::current_exe(worker_args) {
                Ok(executor) => Arc::new(executor),
                Err(e) => {
                    eprintln!("error: cannot locate the parity binary: {}", e);
                    process::exit(1);
                }
            }
        }
    };
    log::debug!(
        "checking '{}' with {} job workers x {} unit workers, deadline {:?}",
        workspace.display(),
        settings.job_workers,
        settings.workers,
        settings.deadline
    );

    let orchestrator = Orchestrator::new(settings, loader, executor).with_manifest(manifest);
    let report = match orchestrator.run(&workspace) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if args.json {
        println!("{}", report.to_json());
    } else {
        print!("{}", report.render());
    }
    if report.failed() {
        process::exit(1);
    }
}
