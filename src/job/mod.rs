//! Job discovery and orchestration.
//!
//! A workspace holds one subdirectory per job. Each job directory carries
//! an original unit (`original.<ext>`), a candidate unit (`refactored.<ext>`
//! or `candidate.<ext>`), and optionally a `type_hints.json` manifest.

mod orchestrator;

pub use orchestrator::Orchestrator;

use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;
use crate::unit::Loader;

pub const MANIFEST_FILE: &str = "type_hints.json";
const ORIGINAL_STEM: &str = "original";
const CANDIDATE_STEMS: [&str; 2] = ["refactored", "candidate"];

/// One original/candidate pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub original: PathBuf,
    pub candidate: PathBuf,
    pub manifest: Option<PathBuf>,
}

/// Scan `workspace` for jobs the loader can handle, sorted by name.
///
/// Hidden directories and directories missing either unit are ignored.
pub fn discover(workspace: &Path, loader: &dyn Loader) -> Result<Vec<Job>, WorkspaceError> {
    if !workspace.is_dir() {
        return Err(WorkspaceError::NotADirectory(workspace.to_path_buf()));
    }
    let mut jobs = Vec::new();
    for dir in list(workspace)? {
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        match find_job(name, &dir, loader)? {
            Some(job) => jobs.push(job),
            None => log::debug!("ignoring '{}': no original/candidate pair", dir.display()),
        }
    }
    jobs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(jobs)
}

fn find_job(name: &str, dir: &Path, loader: &dyn Loader) -> Result<Option<Job>, WorkspaceError> {
    let files: Vec<PathBuf> = list(dir)?
        .into_iter()
        .filter(|p| p.is_file() && loader.accepts(p))
        .collect();
    let with_stem = |stem: &str| {
        files
            .iter()
            .find(|p| p.file_stem().and_then(|s| s.to_str()) == Some(stem))
            .cloned()
    };

    let Some(original) = with_stem(ORIGINAL_STEM) else {
        return Ok(None);
    };
    let Some(candidate) = CANDIDATE_STEMS.iter().find_map(|stem| with_stem(stem)) else {
        return Ok(None);
    };
    let manifest = Some(dir.join(MANIFEST_FILE)).filter(|p| p.is_file());
    Ok(Some(Job {
        name: name.to_string(),
        original,
        candidate,
        manifest,
    }))
}

fn list(dir: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    let scan = |source: std::io::Error| WorkspaceError::Scan {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(scan)? {
        entries.push(entry.map_err(scan)?.path());
    }
    entries.sort();
    Ok(entries)
}
