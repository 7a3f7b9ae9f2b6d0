pub mod check;
pub mod worker;

use std::process;
use std::sync::Arc;

use parity::unit::{HostCommand, HostLoader};

/// Reference host shipped with the crate, relative to the working directory.
pub const DEFAULT_HOST: &str = "python3 hosts/python_host.py";
pub const DEFAULT_EXT: &str = "py";

/// Build the host loader from a `--host` command line, or exit.
pub fn resolve_host(host: &str, ext: &str) -> Arc<HostLoader> {
    match HostCommand::parse(host) {
        Some(command) => Arc::new(HostLoader::new(command, ext)),
        None => {
            eprintln!("error: --host must name a program");
            process::exit(1);
        }
    }
}
