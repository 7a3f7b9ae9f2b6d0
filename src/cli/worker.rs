use std::io::Read;
use std::process;

use clap::Args;

use parity::supervisor::{execute, WorkOrder};

use super::{resolve_host, DEFAULT_EXT, DEFAULT_HOST};

#[derive(Args)]
pub struct WorkerArgs {
    /// Language host command
    #[arg(long, value_name = "CMD", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Unit file extension
    #[arg(long, default_value = DEFAULT_EXT)]
    pub ext: String,
}

/// Read one work order from stdin, run it, print the outcome as JSON.
///
/// Exits non-zero only when the order itself is unusable; every
/// verification result, SKIP included, is a normal outcome.
pub fn cmd_worker(args: WorkerArgs) {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("error: cannot read work order: {}", e);
        process::exit(1);
    }
    let order: WorkOrder = match serde_json::from_str(&input) {
        Ok(order) => order,
        Err(e) => {
            eprintln!("error: invalid work order: {}", e);
            process::exit(1);
        }
    };

    let loader = resolve_host(&args.host, &args.ext);
    log::debug!("worker {}: {:?} {}", process::id(), order.kind, order.target);
    let outcome = execute(&order, loader.as_ref());
    match serde_json::to_string(&outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error: cannot encode outcome: {}", e);
            process::exit(1);
        }
    }
}
