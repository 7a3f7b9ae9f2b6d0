//! Error types for the library surface.
//!
//! Behavioral differences are never errors: they are `Mismatch` values
//! produced by the oracle. The types here cover infrastructure only.

use std::path::PathBuf;

use thiserror::Error;

/// A unit could not be loaded at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no registered unit named '{key}' (from '{path}')")]
    UnknownUnit { key: String, path: PathBuf },
    #[error("language host failed for '{path}': {source}")]
    Host {
        path: PathBuf,
        #[source]
        source: HostError,
    },
}

/// Failure talking to a language host subprocess.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("cannot start host '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("host i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("host closed its output")]
    Closed,
    #[error("malformed host response: {0}")]
    Protocol(String),
    #[error("host reported failure: {0}")]
    Failed(String),
}

/// The operator-supplied type manifest is not valid.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid type manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read manifest '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Strategy inference found nothing to generate from.
#[derive(Debug, Error)]
pub enum InferError {
    #[error("could not find valid inputs for '{name}'")]
    Unsatisfiable { name: String },
    #[error("host failure while probing '{name}': {message}")]
    Infrastructure { name: String, message: String },
}

/// An environment override holds something other than a count.
#[derive(Debug, Error)]
#[error("invalid value '{value}' for {variable}: expected a positive integer")]
pub struct SettingsError {
    pub variable: String,
    pub value: String,
}

/// A worker could not be started.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("cannot spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("cannot encode work order: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The workspace itself is unusable.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace '{0}' does not exist or is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot scan '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot build job pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
