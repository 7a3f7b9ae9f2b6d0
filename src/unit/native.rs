use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{CallableDescriptor, ClassDescriptor, Instance, Loader, Outcome, Raised, Unit};
use crate::error::LoadError;
use crate::value::Value;

type NativeFn = Arc<dyn Fn(&[Value]) -> Outcome + Send + Sync>;
type NativeCtor = Arc<dyn Fn(&[Value]) -> Result<Value, Raised> + Send + Sync>;
type NativeMethod = Arc<dyn Fn(&mut Value, &[Value]) -> Outcome + Send + Sync>;

/// Category reported when a native closure panics.
const PANIC: &str = "Panic";

// ─── Native Units ──────────────────────────────────────────────────

/// A unit assembled in-process from Rust closures.
#[derive(Clone, Default)]
pub struct NativeUnit {
    functions: BTreeMap<String, (CallableDescriptor, NativeFn)>,
    classes: BTreeMap<String, Arc<NativeClass>>,
}

impl NativeUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(
        mut self,
        descriptor: CallableDescriptor,
        body: impl Fn(&[Value]) -> Outcome + Send + Sync + 'static,
    ) -> Self {
        self.functions
            .insert(descriptor.name.clone(), (descriptor, Arc::new(body)));
        self
    }

    pub fn class(mut self, class: NativeClass) -> Self {
        self.classes
            .insert(class.descriptor.name.clone(), Arc::new(class));
        self
    }
}

/// A class: a constructor producing a state value, plus methods over it.
pub struct NativeClass {
    descriptor: ClassDescriptor,
    constructor: NativeCtor,
    methods: BTreeMap<String, NativeMethod>,
}

impl NativeClass {
    pub fn new(
        constructor: CallableDescriptor,
        body: impl Fn(&[Value]) -> Result<Value, Raised> + Send + Sync + 'static,
    ) -> Self {
        let name = constructor.name.clone();
        Self {
            descriptor: ClassDescriptor {
                name,
                constructor,
                methods: Vec::new(),
            },
            constructor: Arc::new(body),
            methods: BTreeMap::new(),
        }
    }

    pub fn method(
        mut self,
        descriptor: CallableDescriptor,
        body: impl Fn(&mut Value, &[Value]) -> Outcome + Send + Sync + 'static,
    ) -> Self {
        let qualified = format!("{}.{}", self.descriptor.name, descriptor.name);
        let descriptor = descriptor.with_qualified_name(&qualified);
        self.methods.insert(descriptor.name.clone(), Arc::new(body));
        self.descriptor.methods.push(descriptor);
        self
    }
}

fn check_arity(descriptor: &CallableDescriptor, args: &[Value]) -> Result<(), Raised> {
    if descriptor.arity() == args.len() {
        Ok(())
    } else {
        Err(Raised::new(
            "TypeError",
            format!(
                "{}() takes {} positional arguments but {} were given",
                descriptor.name,
                descriptor.arity(),
                args.len()
            ),
        ))
    }
}

/// Run a closure, turning a panic into a raised error.
fn guarded<T>(body: impl FnOnce() -> Result<T, Raised>) -> Result<T, Raised> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(Raised::new(PANIC, panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Unit for NativeUnit {
    fn functions(&self) -> Vec<CallableDescriptor> {
        self.functions.values().map(|(d, _)| d.clone()).collect()
    }

    fn classes(&self) -> Vec<ClassDescriptor> {
        self.classes.values().map(|c| c.descriptor.clone()).collect()
    }

    fn call(&self, function: &str, args: &[Value]) -> Outcome {
        let Some((descriptor, body)) = self.functions.get(function) else {
            return Err(Raised::new(
                "NameError",
                format!("name '{}' is not defined", function),
            ));
        };
        check_arity(descriptor, args)?;
        guarded(|| body(args))
    }

    fn construct(&self, class: &str, args: &[Value]) -> Result<Box<dyn Instance>, Raised> {
        let Some(native) = self.classes.get(class) else {
            return Err(Raised::new(
                "NameError",
                format!("name '{}' is not defined", class),
            ));
        };
        check_arity(&native.descriptor.constructor, args)?;
        let state = guarded(|| (native.constructor)(args))?;
        Ok(Box::new(NativeInstance {
            class: Arc::clone(native),
            state: Mutex::new(state),
        }))
    }
}

struct NativeInstance {
    class: Arc<NativeClass>,
    state: Mutex<Value>,
}

impl Instance for NativeInstance {
    fn call_method(&self, method: &str, args: &[Value]) -> Outcome {
        let (Some(body), Some(descriptor)) = (
            self.class.methods.get(method),
            self.class.descriptor.method(method),
        ) else {
            return Err(Raised::new(
                "AttributeError",
                format!(
                    "'{}' object has no attribute '{}'",
                    self.class.descriptor.name, method
                ),
            ));
        };
        check_arity(descriptor, args)?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| Raised::host_failure("instance state poisoned"))?;
        guarded(|| body(&mut *state, args))
    }
}

// ─── Native Loader ─────────────────────────────────────────────────

/// Resolves `*.native` unit files to registered units. The file's trimmed
/// content is the registry key.
#[derive(Clone, Default)]
pub struct NativeLoader {
    units: BTreeMap<String, Arc<NativeUnit>>,
}

impl NativeLoader {
    pub const EXTENSION: &'static str = "native";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, key: &str, unit: NativeUnit) -> Self {
        self.units.insert(key.to_string(), Arc::new(unit));
        self
    }
}

impl Loader for NativeLoader {
    fn accepts(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == Self::EXTENSION)
    }

    fn load(&self, path: &Path) -> Result<Arc<dyn Unit>, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let key = content.trim();
        match self.units.get(key) {
            Some(unit) => Ok(Arc::clone(unit) as Arc<dyn Unit>),
            None => Err(LoadError::UnknownUnit {
                key: key.to_string(),
                path: path.to_path_buf(),
            }),
        }
    }
}
