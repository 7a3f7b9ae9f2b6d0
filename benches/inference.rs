//! Strategy inference and drawing throughput.
//!
//! Measures the three resolution paths (declared types, manifest lookup,
//! exhaustive probing) and raw example generation from the blind strategy.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use parity::config::ProbeSettings;
use parity::unit::{CallableDescriptor, FunctionInvoker, Raised};
use parity::{infer, Manifest, NativeUnit, Strategy, Value};

/// A three-parameter function that only accepts integers, so probing has to
/// walk the whole 14^3 palette grid.
fn int_only(descriptor: &CallableDescriptor) -> NativeUnit {
    NativeUnit::new().function(descriptor.clone(), |args| {
        if args.iter().all(|a| a.as_int().is_some()) {
            Ok(Value::Int(args.len() as i64))
        } else {
            Err(Raised::new("TypeError", "ints only"))
        }
    })
}

fn bench_infer(c: &mut Criterion) {
    let probe = ProbeSettings::default();
    let untyped = CallableDescriptor::new("f", &["a", "b", "c"]);
    let typed = CallableDescriptor::typed("f", &[("a", "int"), ("b", "str"), ("c", "list[int]")]);
    let unit = int_only(&untyped);
    let mut manifest = Manifest::default();
    manifest.insert("f", &["int", "int(0,10)", "str"]);
    let empty = Manifest::default();

    let mut group = c.benchmark_group("infer");
    group.bench_function("declared", |b| {
        let invoker = FunctionInvoker::new(&unit, &typed);
        b.iter(|| infer(&invoker, &empty, &probe, black_box(0)))
    });
    group.bench_function("manifest", |b| {
        let invoker = FunctionInvoker::new(&unit, &untyped);
        b.iter(|| infer(&invoker, &manifest, &probe, black_box(0)))
    });
    group.bench_function("probe_arity_3", |b| {
        let invoker = FunctionInvoker::new(&unit, &untyped);
        b.iter(|| infer(&invoker, &empty, &probe, black_box(0)))
    });
    group.finish();
}

fn bench_draw(c: &mut Criterion) {
    let blind = Strategy::Tuple(vec![Strategy::any(), Strategy::any()]);
    let ranged = Strategy::Tuple(vec![Strategy::int(-100, 100), Strategy::list(Strategy::text())]);

    c.bench_function("draw_blind_100", |b| {
        b.iter(|| blind.examples(black_box(7)).take(100).count())
    });
    c.bench_function("draw_ranged_100", |b| {
        b.iter(|| ranged.examples(black_box(7)).take(100).count())
    });
}

criterion_group!(benches, bench_infer, bench_draw);
criterion_main!(benches);
