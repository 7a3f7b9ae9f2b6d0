use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use super::{Executor, Running, TaskKind, UnitOutcome, WorkOrder};
use crate::error::SupervisorError;

/// Runs each order in a fresh worker process.
///
/// The worker is this binary's hidden `worker` subcommand: it reads one
/// JSON work order on stdin and writes one JSON outcome on stdout. It leads
/// its own process group, so termination also takes down any language
/// hosts it started.
#[derive(Clone, Debug)]
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessExecutor {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// Re-execute the running binary with `args`.
    pub fn current_exe(args: Vec<String>) -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, args))
    }
}

struct ProcessRunning {
    child: Child,
    output: Receiver<String>,
    kind: TaskKind,
    started: Instant,
}

impl Executor for ProcessExecutor {
    fn launch(&self, order: WorkOrder) -> Result<Box<dyn Running>, SupervisorError> {
        let payload = serde_json::to_vec(&order)?;
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn()?;

        // Drain stdout on a side thread so a large outcome never blocks
        // the worker on a full pipe.
        let (tx, output) = mpsc::channel();
        if let Some(mut stdout) = child.stdout.take() {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = stdout.read_to_string(&mut text);
                let _ = tx.send(text);
            });
        }
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&payload) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SupervisorError::Spawn(e));
            }
        }

        Ok(Box::new(ProcessRunning {
            child,
            output,
            kind: order.kind,
            started: Instant::now(),
        }))
    }
}

impl ProcessRunning {
    fn crashed(&self, reason: String) -> UnitOutcome {
        UnitOutcome::abandoned(
            self.kind,
            self.started.elapsed(),
            &format!("worker crashed: {}", reason),
        )
    }
}

impl Running for ProcessRunning {
    fn poll(&mut self) -> Option<UnitOutcome> {
        match self.child.try_wait() {
            Ok(None) => None,
            Ok(Some(status)) => {
                let text = self
                    .output
                    .recv_timeout(Duration::from_secs(1))
                    .unwrap_or_default();
                if !status.success() {
                    return Some(self.crashed(status.to_string()));
                }
                Some(
                    serde_json::from_str(&text)
                        .unwrap_or_else(|e| self.crashed(format!("unreadable outcome: {}", e))),
                )
            }
            Err(e) => Some(self.crashed(e.to_string())),
        }
    }

    fn terminate(&mut self) {
        #[cfg(unix)]
        {
            let pid = self.child.id() as libc::pid_t;
            unsafe {
                let _ = libc::kill(-pid, libc::SIGKILL);
            }
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
