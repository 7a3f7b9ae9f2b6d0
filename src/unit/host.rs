use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::{CallableDescriptor, ClassDescriptor, Instance, Loader, Outcome, Raised, Unit};
use crate::error::{HostError, LoadError};
use crate::value::Value;

// ─── Host Command ──────────────────────────────────────────────────

/// The command line that starts a language host. The unit path is
/// appended as the last argument.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl HostCommand {
    /// Split a command line on whitespace. Empty input yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

// ─── Wire Messages ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Describe,
    Call {
        function: &'a str,
        args: &'a [Value],
    },
    Construct {
        class: &'a str,
        args: &'a [Value],
    },
    CallMethod {
        handle: u64,
        method: &'a str,
        args: &'a [Value],
    },
    Release {
        handle: u64,
    },
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Response {
    Described {
        #[serde(default)]
        functions: Vec<CallableDescriptor>,
        #[serde(default)]
        classes: Vec<ClassDescriptor>,
    },
    Returned {
        value: Value,
    },
    Raised {
        category: String,
        #[serde(default)]
        message: String,
    },
    Constructed {
        handle: u64,
    },
    Released,
    Failed {
        message: String,
    },
}

// ─── Session ───────────────────────────────────────────────────────

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Session {
    fn spawn(command: &HostCommand, path: &Path) -> Result<Self, HostError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| HostError::Spawn {
                command: command.to_string(),
                source,
            })?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(HostError::Closed);
        };
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn round_trip(&mut self, request: &Request<'_>) -> Result<Response, HostError> {
        let line = serde_json::to_string(request).map_err(|e| HostError::Protocol(e.to_string()))?;
        writeln!(self.stdin, "{}", line)?;
        self.stdin.flush()?;

        let mut reply = String::new();
        if self.stdout.read_line(&mut reply)? == 0 {
            return Err(HostError::Closed);
        }
        serde_json::from_str(&reply).map_err(|e| HostError::Protocol(e.to_string()))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

type SharedSession = Arc<Mutex<Session>>;

fn exchange(session: &SharedSession, request: &Request<'_>) -> Result<Response, HostError> {
    let mut session = session
        .lock()
        .map_err(|_| HostError::Protocol("session poisoned".to_string()))?;
    session.round_trip(request)
}

/// Map a call-like reply to an outcome. Anything other than a return or a
/// raise is an infrastructure failure.
fn outcome(reply: Result<Response, HostError>) -> Outcome {
    match reply {
        Ok(Response::Returned { value }) => Ok(value),
        Ok(Response::Raised { category, message }) => Err(Raised { category, message }),
        Ok(Response::Failed { message }) => Err(Raised::host_failure(message)),
        Ok(_) => Err(Raised::host_failure("unexpected host response")),
        Err(e) => Err(Raised::host_failure(e.to_string())),
    }
}

// ─── Host Units ────────────────────────────────────────────────────

/// A unit living inside a language host subprocess.
pub struct HostUnit {
    session: SharedSession,
    functions: Vec<CallableDescriptor>,
    classes: Vec<ClassDescriptor>,
}

impl HostUnit {
    /// Start a host for `path` and read back its description.
    pub fn spawn(command: &HostCommand, path: &Path) -> Result<Self, HostError> {
        let mut session = Session::spawn(command, path)?;
        match session.round_trip(&Request::Describe)? {
            Response::Described { functions, classes } => Ok(Self {
                session: Arc::new(Mutex::new(session)),
                functions,
                classes,
            }),
            Response::Failed { message } => Err(HostError::Failed(message)),
            _ => Err(HostError::Protocol("expected a description".to_string())),
        }
    }
}

impl Unit for HostUnit {
    fn functions(&self) -> Vec<CallableDescriptor> {
        self.functions.clone()
    }

    fn classes(&self) -> Vec<ClassDescriptor> {
        self.classes.clone()
    }

    fn call(&self, function: &str, args: &[Value]) -> Outcome {
        outcome(exchange(&self.session, &Request::Call { function, args }))
    }

    fn construct(&self, class: &str, args: &[Value]) -> Result<Box<dyn Instance>, Raised> {
        match exchange(&self.session, &Request::Construct { class, args }) {
            Ok(Response::Constructed { handle }) => Ok(Box::new(HostInstance {
                session: Arc::clone(&self.session),
                handle,
            })),
            other => match outcome(other) {
                Err(raised) => Err(raised),
                Ok(_) => Err(Raised::host_failure("constructor returned a value")),
            },
        }
    }
}

struct HostInstance {
    session: SharedSession,
    handle: u64,
}

impl Instance for HostInstance {
    fn call_method(&self, method: &str, args: &[Value]) -> Outcome {
        outcome(exchange(
            &self.session,
            &Request::CallMethod {
                handle: self.handle,
                method,
                args,
            },
        ))
    }
}

impl Drop for HostInstance {
    fn drop(&mut self) {
        let _ = exchange(
            &self.session,
            &Request::Release {
                handle: self.handle,
            },
        );
    }
}

// ─── Host Loader ───────────────────────────────────────────────────

/// Loads units with a language host, one subprocess per unit.
#[derive(Clone, Debug)]
pub struct HostLoader {
    command: HostCommand,
    extension: String,
}

impl HostLoader {
    pub fn new(command: HostCommand, extension: &str) -> Self {
        Self {
            command,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }
}

impl Loader for HostLoader {
    fn accepts(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == self.extension.as_str())
    }

    fn load(&self, path: &Path) -> Result<Arc<dyn Unit>, LoadError> {
        let unit = HostUnit::spawn(&self.command, path).map_err(|source| LoadError::Host {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("host '{}' loaded {}", self.command, path.display());
        Ok(Arc::new(unit))
    }
}
