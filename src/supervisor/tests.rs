use std::path::Path;
use std::sync::Arc;

use super::*;
use crate::error::LoadError;
use crate::unit::{CallableDescriptor, NativeClass, NativeLoader, NativeUnit, Raised, Unit};
use crate::value::Value;

fn native_loader() -> NativeLoader {
    let square = |args: &[Value]| match args[0].as_int() {
        Some(n) => Ok(Value::Int(n * n)),
        None => Err(Raised::new("TypeError", "int required")),
    };
    let counter = || {
        NativeClass::new(CallableDescriptor::typed("Counter", &[("start", "int")]), |a| {
            Ok(a[0].clone())
        })
        .method(CallableDescriptor::typed("add", &[("n", "int")]), |state, a| {
            let next = state.as_int().unwrap_or(0) + a[0].as_int().unwrap_or(0);
            *state = Value::Int(next);
            Ok(Value::Int(next))
        })
    };
    NativeLoader::new()
        .register(
            "original",
            NativeUnit::new()
                .function(CallableDescriptor::new("square", &["x"]), square)
                .function(CallableDescriptor::new("spin", &[]), |_| loop {
                    std::thread::sleep(Duration::from_millis(10));
                })
                .class(counter()),
        )
        .register(
            "candidate",
            NativeUnit::new()
                .function(CallableDescriptor::new("square", &["x"]), square)
                .function(CallableDescriptor::new("spin", &[]), |_| Ok(Value::None))
                .class(counter()),
        )
}

struct Workspace {
    _dir: tempfile::TempDir,
    original: PathBuf,
    candidate: PathBuf,
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("original.native");
    let candidate = dir.path().join("refactored.native");
    std::fs::write(&original, "original").unwrap();
    std::fs::write(&candidate, "candidate").unwrap();
    Workspace {
        _dir: dir,
        original,
        candidate,
    }
}

fn order(ws: &Workspace, target: Target, kind: TaskKind) -> WorkOrder {
    let mut settings = Settings::default();
    settings.bench.runs = 2;
    settings.bench.warmup = 0;
    WorkOrder {
        original: ws.original.clone(),
        candidate: ws.candidate.clone(),
        target,
        kind,
        settings,
        manifest: Manifest::default(),
    }
}

fn verdict(outcome: &UnitOutcome) -> &Verdict {
    match outcome {
        UnitOutcome::Verdict(v) => v,
        other => panic!("expected a verdict, got {:?}", other),
    }
}

#[test]
fn test_execute_function() {
    let ws = workspace();
    let outcome = execute(
        &order(&ws, Target::function("square"), TaskKind::Verify),
        &native_loader(),
    );
    assert_eq!(verdict(&outcome).status, Status::Pass);
}

#[test]
fn test_execute_method_and_bench() {
    let ws = workspace();
    let loader = native_loader();
    let target = Target::method("Counter", "add");
    let outcome = execute(&order(&ws, target.clone(), TaskKind::Verify), &loader);
    assert_eq!(verdict(&outcome).status, Status::Pass);

    let outcome = execute(&order(&ws, target, TaskKind::Bench), &loader);
    assert!(matches!(outcome, UnitOutcome::Speedup(_)), "{:?}", outcome);
}

#[test]
fn test_execute_missing_targets() {
    let ws = workspace();
    let loader = native_loader();
    let outcome = execute(&order(&ws, Target::function("cube"), TaskKind::Verify), &loader);
    assert_eq!(verdict(&outcome).diagnostic.as_deref(), Some("function not found"));

    let outcome = execute(
        &order(&ws, Target::method("Counter", "sub"), TaskKind::Bench),
        &loader,
    );
    assert_eq!(
        outcome,
        UnitOutcome::BenchSkipped {
            reason: "method not found".to_string()
        }
    );
}

#[test]
fn test_execute_load_failure_skips() {
    let ws = workspace();
    std::fs::write(&ws.candidate, "unregistered").unwrap();
    let outcome = execute(
        &order(&ws, Target::function("square"), TaskKind::Verify),
        &native_loader(),
    );
    let v = verdict(&outcome);
    assert_eq!(v.status, Status::Skip);
    assert!(v.diagnostic.as_deref().unwrap().starts_with("load failed"));
}

#[test]
fn test_timeout_is_skip_and_siblings_finish() {
    let ws = workspace();
    let executor = ThreadExecutor::new(Arc::new(native_loader()));
    let supervisor = Supervisor::new(&executor, 2, Duration::from_millis(300));
    let start = Instant::now();
    let reports = supervisor.run(vec![
        order(&ws, Target::function("spin"), TaskKind::Verify),
        order(&ws, Target::function("square"), TaskKind::Verify),
    ]);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(reports.len(), 2);

    let spin = reports
        .iter()
        .find(|r| r.target == Target::function("spin"))
        .unwrap();
    let v = verdict(&spin.outcome);
    assert_eq!(v.status, Status::Skip);
    assert_eq!(v.diagnostic.as_deref(), Some("timeout"));

    let square = reports
        .iter()
        .find(|r| r.target == Target::function("square"))
        .unwrap();
    assert_eq!(verdict(&square.outcome).status, Status::Pass);
    assert!(!batch_failed(&reports));
}

struct PanickingLoader;

impl Loader for PanickingLoader {
    fn accepts(&self, _path: &Path) -> bool {
        true
    }

    fn load(&self, _path: &Path) -> Result<Arc<dyn Unit>, LoadError> {
        panic!("loader exploded")
    }
}

#[test]
fn test_panicking_worker_is_skip() {
    let ws = workspace();
    let executor = ThreadExecutor::new(Arc::new(PanickingLoader));
    let reports = Supervisor::new(&executor, 1, Duration::from_secs(5)).run(vec![order(
        &ws,
        Target::function("square"),
        TaskKind::Verify,
    )]);
    let v = verdict(&reports[0].outcome);
    assert_eq!(v.status, Status::Skip);
    assert!(v.diagnostic.as_deref().unwrap().contains("loader exploded"));
}

#[test]
fn test_unlaunchable_process_worker_is_skip() {
    let ws = workspace();
    let executor = ProcessExecutor::new(PathBuf::from("/nonexistent/parity-worker"), vec![]);
    let reports = Supervisor::new(&executor, 1, Duration::from_secs(5)).run(vec![order(
        &ws,
        Target::function("square"),
        TaskKind::Bench,
    )]);
    match &reports[0].outcome {
        UnitOutcome::BenchSkipped { reason } => assert!(reason.starts_with("worker crashed")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_batch_failed() {
    let report = |status| UnitReport {
        target: Target::function("f"),
        kind: TaskKind::Verify,
        outcome: UnitOutcome::Verdict(Verdict {
            status,
            duration: Duration::ZERO,
            diagnostic: None,
        }),
    };
    assert!(!batch_failed(&[report(Status::Pass), report(Status::Skip)]));
    assert!(batch_failed(&[report(Status::Pass), report(Status::Fail)]));
}

#[test]
fn test_work_order_json() {
    let ws = workspace();
    let original = order(&ws, Target::method("Counter", "add"), TaskKind::Bench);
    let json = serde_json::to_string(&original).unwrap();
    assert!(json.contains(r#""target":{"kind":"method","class":"Counter","method":"add"}"#));
    let back: WorkOrder = serde_json::from_str(&json).unwrap();
    assert_eq!(back.target, original.target);
    assert_eq!(back.settings, original.settings);

    let outcome = UnitOutcome::BenchSkipped {
        reason: "timeout".to_string(),
    };
    let json = serde_json::to_string(&outcome).unwrap();
    assert_eq!(json, r#"{"outcome":"bench_skipped","reason":"timeout"}"#);
}
