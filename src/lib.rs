//! Differential equivalence verification for refactored code.
//!
//! Given an original unit and a candidate rewrite of it, `parity`
//! infers input strategies for every callable they share, fuzzes both
//! with two independent sweeps, and reports PASS, FAIL (with a shrunk
//! counterexample) or SKIP per callable and per job.

pub mod bench;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod job;
pub mod report;
pub mod strategy;
pub mod supervisor;
pub mod unit;
pub mod value;
pub mod verify;

pub use config::Settings;
pub use job::{discover, Job, Orchestrator};
pub use report::Report;
pub use strategy::{infer, Manifest, Resolution, Strategy};
pub use unit::{HostCommand, HostLoader, Loader, NativeLoader, NativeUnit, Unit};
pub use value::Value;
pub use verify::{verify_function, verify_method, CrashPolicy, Status, Verdict};
