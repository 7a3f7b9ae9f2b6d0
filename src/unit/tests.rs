use super::*;

fn adder() -> NativeUnit {
    NativeUnit::new()
        .function(CallableDescriptor::new("add", &["a", "b"]), |args| {
            match (args[0].as_int(), args[1].as_int()) {
                (Some(a), Some(b)) => Ok(Value::Int(a + b)),
                _ => Err(Raised::new("TypeError", "unsupported operand")),
            }
        })
        .function(CallableDescriptor::new("boom", &[]), |_| panic!("kaboom"))
        .class(counter())
}

fn counter() -> NativeClass {
    NativeClass::new(CallableDescriptor::new("Counter", &["start"]), |args| {
        args[0]
            .as_int()
            .map(Value::Int)
            .ok_or_else(|| Raised::new("TypeError", "start must be int"))
    })
    .method(CallableDescriptor::new("bump", &[]), |state, _| {
        let next = state.as_int().unwrap_or(0) + 1;
        *state = Value::Int(next);
        Ok(Value::Int(next))
    })
    .method(CallableDescriptor::new("reset", &[]), |state, _| {
        *state = Value::Int(0);
        Ok(Value::None)
    })
}

#[test]
fn test_descriptor_typing() {
    let untyped = CallableDescriptor::new("f", &["a"]);
    assert!(!untyped.is_fully_typed());
    let typed = CallableDescriptor::typed("g", &[("a", "int"), ("b", "str")]);
    assert!(typed.is_fully_typed());
    assert_eq!(typed.arity(), 2);
    assert!(
        !CallableDescriptor::new("h", &[]).is_fully_typed(),
        "zero parameters is not fully typed"
    );
}

#[test]
fn test_qualified_name_fallback() {
    let mut d = CallableDescriptor::new("f", &[]);
    d.qualified_name.clear();
    assert_eq!(d.qualified(), "f");
    assert_eq!(d.with_qualified_name("M.f").qualified(), "M.f");
}

#[test]
fn test_private_and_dunder_names() {
    assert!(is_private("_helper"));
    assert!(!is_private("helper"));
    assert!(!is_private("__init__"));
    assert!(is_dunder("__eq__"));
    assert!(!is_dunder("__"));
    assert!(is_private("__mangled"));
}

#[test]
fn test_native_call() {
    let unit = adder();
    assert_eq!(unit.call("add", &[Value::Int(2), Value::Int(3)]), Ok(Value::Int(5)));

    let wrong_arity = unit.call("add", &[Value::Int(2)]).unwrap_err();
    assert_eq!(wrong_arity.category, "TypeError");

    let missing = unit.call("nope", &[]).unwrap_err();
    assert_eq!(missing.category, "NameError");
}

#[test]
fn test_native_panic_becomes_raise() {
    let raised = adder().call("boom", &[]).unwrap_err();
    assert_eq!(raised.category, "Panic");
    assert!(raised.message.contains("kaboom"));
    assert!(!raised.is_infrastructure());
}

#[test]
fn test_native_instances_keep_state() {
    let unit = adder();
    let instance = unit.construct("Counter", &[Value::Int(10)]).unwrap();
    assert_eq!(instance.call_method("bump", &[]), Ok(Value::Int(11)));
    assert_eq!(instance.call_method("bump", &[]), Ok(Value::Int(12)));

    let fresh = unit.construct("Counter", &[Value::Int(10)]).unwrap();
    assert_eq!(fresh.call_method("bump", &[]), Ok(Value::Int(11)));

    let err = instance.call_method("missing", &[]).unwrap_err();
    assert_eq!(err.category, "AttributeError");
}

#[test]
fn test_native_constructor_raises() {
    let err = adder().construct("Counter", &[Value::str("x")]).err().unwrap();
    assert_eq!(err.category, "TypeError");
}

#[test]
fn test_method_qualified_names() {
    let classes = adder().classes();
    let bump = classes[0].method("bump").unwrap();
    assert_eq!(bump.qualified(), "Counter.bump");
    assert_eq!(classes[0].constructor.qualified(), "Counter");
}

#[test]
fn test_invokers() {
    let unit = adder();
    let functions = unit.functions();
    let add = functions.iter().find(|f| f.name == "add").unwrap();
    let invoker = FunctionInvoker::new(&unit, add);
    assert_eq!(invoker.invoke(&[Value::Int(1), Value::Int(1)]), Ok(Value::Int(2)));

    let classes = unit.classes();
    let ctor = ConstructorInvoker::new(&unit, &classes[0]);
    assert_eq!(ctor.invoke(&[Value::Int(0)]), Ok(Value::None));
    assert!(ctor.invoke(&[Value::None]).is_err());

    let instance = unit.construct("Counter", &[Value::Int(0)]).unwrap();
    let bump = classes[0].method("bump").unwrap();
    let method = MethodInvoker::new(instance.as_ref(), bump);
    assert_eq!(method.descriptor().name, "bump");
    assert_eq!(method.invoke(&[]), Ok(Value::Int(1)));
}

#[test]
fn test_common_names() {
    let original = adder();
    let candidate = NativeUnit::new()
        .function(CallableDescriptor::new("add", &["a", "b"]), |_| Ok(Value::None))
        .function(CallableDescriptor::new("extra", &[]), |_| Ok(Value::None))
        .class(
            NativeClass::new(CallableDescriptor::new("Counter", &["start"]), |_| {
                Ok(Value::Int(0))
            })
            .method(CallableDescriptor::new("bump", &[]), |_, _| Ok(Value::None)),
        );

    let functions = common_functions(&original, &candidate);
    let names: Vec<&str> = functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["add"]);

    let classes = common_classes(&original, &candidate);
    assert_eq!(classes.len(), 1);
    let methods: Vec<&str> = classes[0].methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["bump"], "reset exists only in the original");
}

#[test]
fn test_native_loader_resolves_by_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("original.native");
    std::fs::write(&path, "adder\n").unwrap();

    let loader = NativeLoader::new().register("adder", adder());
    assert!(loader.accepts(&path));
    assert!(!loader.accepts(Path::new("original.py")));

    let unit = loader.load(&path).unwrap();
    assert_eq!(unit.functions().len(), 2);

    std::fs::write(&path, "other").unwrap();
    match loader.load(&path) {
        Err(LoadError::UnknownUnit { key, .. }) => assert_eq!(key, "other"),
        other => panic!("expected unknown unit, got {:?}", other.err()),
    }
}

#[test]
fn test_host_command_parse() {
    let cmd = HostCommand::parse("python3 -u hosts/python_host.py").unwrap();
    assert_eq!(cmd.program, "python3");
    assert_eq!(cmd.args, vec!["-u", "hosts/python_host.py"]);
    assert_eq!(cmd.to_string(), "python3 -u hosts/python_host.py");
    assert!(HostCommand::parse("   ").is_none());
}

#[test]
fn test_host_spawn_failure_is_load_error() {
    let loader = HostLoader::new(
        HostCommand::parse("/nonexistent/parity-host-binary").unwrap(),
        ".py",
    );
    assert!(loader.accepts(Path::new("job/original.py")));
    match loader.load(Path::new("job/original.py")) {
        Err(LoadError::Host { source, .. }) => {
            assert!(matches!(source, crate::error::HostError::Spawn { .. }))
        }
        other => panic!("expected host error, got {:?}", other.err()),
    }
}

#[test]
fn test_raised_display() {
    assert_eq!(
        Raised::new("KeyError", "'a'").to_string(),
        "KeyError: 'a'"
    );
    assert_eq!(Raised::new("StopIteration", "").to_string(), "StopIteration");
    assert!(Raised::host_failure("gone").is_infrastructure());
}

// ─── Python Host ───────────────────────────────────────────────────

const PY_UNIT: &str = r#"
def add(a, b):
    print("noise on stdout")
    return a + b

def div(a, b):
    return a / b

def ask():
    return input()

def keyed():
    return {1: "int key"}

class Acc:
    def __init__(self, start):
        self.total = start

    def dep(self, n):
        self.total += n
        return self.total
"#;

fn python_host() -> Option<HostLoader> {
    let available = std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success());
    if !available {
        eprintln!("python3 not available, skipping test");
        return None;
    }
    let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("hosts/python_host.py");
    Some(HostLoader::new(
        HostCommand {
            program: "python3".to_string(),
            args: vec![script.display().to_string()],
        },
        "py",
    ))
}

#[test]
fn test_python_host_session() {
    let Some(loader) = python_host() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("original.py");
    std::fs::write(&path, PY_UNIT).unwrap();
    let unit = loader.load(&path).unwrap();

    let names: Vec<String> = unit.functions().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["add", "ask", "div", "keyed"]);
    let classes = unit.classes();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].constructor.arity(), 1);
    let dep = classes[0].method("dep").unwrap();
    assert_eq!(dep.arity(), 1);
    assert_eq!(dep.qualified(), "Acc.dep");

    // Replies stay paired with requests across returns and raises.
    assert_eq!(unit.call("add", &[Value::Int(1), Value::Int(2)]), Ok(Value::Int(3)));
    let raised = unit.call("div", &[Value::Int(1), Value::Int(0)]).unwrap_err();
    assert_eq!(raised.category, "ZeroDivisionError");
    assert_eq!(unit.call("div", &[Value::Int(3), Value::Int(2)]), Ok(Value::Float(1.5)));
    assert_eq!(unit.call("ask", &[]).unwrap_err().category, "EOFError");
    assert_eq!(unit.call("add", &[Value::Int(2), Value::Int(2)]), Ok(Value::Int(4)));

    match unit.call("keyed", &[]) {
        Ok(Value::Object { class, .. }) => assert_eq!(class, "dict"),
        other => panic!("expected tagged mapping, got {:?}", other),
    }

    let acc = unit.construct("Acc", &[Value::Int(5)]).unwrap();
    assert_eq!(acc.call_method("dep", &[Value::Int(3)]), Ok(Value::Int(8)));
    assert_eq!(acc.call_method("dep", &[Value::Int(2)]), Ok(Value::Int(10)));
    drop(acc);
    let raised = unit.construct("Acc", &[]).err().unwrap();
    assert_eq!(raised.category, "TypeError");
    assert_eq!(unit.call("add", &[Value::Int(0), Value::Int(0)]), Ok(Value::Int(0)));
}

#[test]
fn test_python_host_load_failure() {
    let Some(loader) = python_host() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("original.py");
    std::fs::write(&path, "raise ValueError('boom')\n").unwrap();
    match loader.load(&path) {
        Err(LoadError::Host { source, .. }) => {
            assert!(source.to_string().contains("ValueError: boom"), "{}", source)
        }
        other => panic!("expected host failure, got {:?}", other.err()),
    }
}
