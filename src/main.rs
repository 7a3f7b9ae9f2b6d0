mod cli;

use std::process;

use clap::{Parser, Subcommand};

use cli::check::{cmd_check, CheckArgs};
use cli::worker::{cmd_worker, WorkerArgs};

#[derive(Parser)]
#[command(
    name = "parity",
    version,
    about = "Differential equivalence checking for refactored code"
)]
struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify every job in a workspace of original/candidate pairs
    Check(CheckArgs),
    /// Run one work order from stdin (used by process isolation)
    #[command(hide = true)]
    Worker(WorkerArgs),
}

fn main() {
    // Usage errors exit 1 like every other configuration error.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };
    init_logging(cli.verbose);

    match cli.command {
        Command::Check(args) => cmd_check(args),
        Command::Worker(args) => cmd_worker(args),
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    let _ = builder.try_init();
}
