//! Loaded implementation units and the narrow invocation interface.
//!
//! A unit is one implementation of a module: a set of named functions and
//! classes. Two loaders exist: `native` (Rust closures, used for embedding
//! and tests) and `host` (a language host subprocess speaking JSON lines).
//! Everything above this module only sees `Unit`, `Instance` and `Invoker`.

mod host;
mod native;
#[cfg(test)]
mod tests;

pub use host::{HostCommand, HostLoader, HostUnit};
pub use native::{NativeClass, NativeLoader, NativeUnit};
pub(crate) use native::panic_message;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::value::Value;

/// Category reported when the machinery around a call failed, rather than
/// the call itself. Never compared as behavior.
pub const HOST_FAILURE: &str = "HostFailure";

// ─── Call Outcomes ─────────────────────────────────────────────────

/// An error raised by a callable: its category (exception type name) and
/// message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Raised {
    pub category: String,
    #[serde(default)]
    pub message: String,
}

impl Raised {
    pub fn new(category: &str, message: impl Into<String>) -> Self {
        Self {
            category: category.to_string(),
            message: message.into(),
        }
    }

    pub fn host_failure(message: impl Into<String>) -> Self {
        Self::new(HOST_FAILURE, message)
    }

    /// True when the error came from the loader or host, not the code
    /// under test.
    pub fn is_infrastructure(&self) -> bool {
        self.category == HOST_FAILURE
    }
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.category)
        } else {
            write!(f, "{}: {}", self.category, self.message)
        }
    }
}

/// What one invocation did: returned a value or raised.
pub type Outcome = Result<Value, Raised>;

// ─── Descriptors ───────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    /// Declared type annotation, verbatim (`int`, `list[str]`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

/// Introspected shape of a callable: name and ordered parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableDescriptor {
    pub name: String,
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default)]
    pub params: Vec<Param>,
}

impl CallableDescriptor {
    /// A callable with untyped parameters.
    pub fn new(name: &str, params: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            qualified_name: name.to_string(),
            params: params
                .iter()
                .map(|p| Param {
                    name: p.to_string(),
                    annotation: None,
                })
                .collect(),
        }
    }

    /// A callable whose parameters carry `(name, annotation)` pairs.
    pub fn typed(name: &str, params: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            qualified_name: name.to_string(),
            params: params
                .iter()
                .map(|(p, ty)| Param {
                    name: p.to_string(),
                    annotation: Some(ty.to_string()),
                })
                .collect(),
        }
    }

    pub fn with_qualified_name(mut self, qualified_name: &str) -> Self {
        self.qualified_name = qualified_name.to_string();
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Qualified name, falling back to the bare name when the loader gave
    /// none.
    pub fn qualified(&self) -> &str {
        if self.qualified_name.is_empty() {
            &self.name
        } else {
            &self.qualified_name
        }
    }

    /// At least one parameter, and every parameter annotated.
    pub fn is_fully_typed(&self) -> bool {
        !self.params.is_empty() && self.params.iter().all(|p| p.annotation.is_some())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub name: String,
    /// Constructor parameters, excluding the receiver.
    pub constructor: CallableDescriptor,
    #[serde(default)]
    pub methods: Vec<CallableDescriptor>,
}

impl ClassDescriptor {
    pub fn method(&self, name: &str) -> Option<&CallableDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// `__name__` style names.
pub fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

/// Leading-underscore names that are not dunders.
pub fn is_private(name: &str) -> bool {
    name.starts_with('_') && !is_dunder(name)
}

// ─── Units ─────────────────────────────────────────────────────────

/// One loaded implementation.
pub trait Unit: Send + Sync {
    fn functions(&self) -> Vec<CallableDescriptor>;
    fn classes(&self) -> Vec<ClassDescriptor>;
    fn call(&self, function: &str, args: &[Value]) -> Outcome;
    fn construct(&self, class: &str, args: &[Value]) -> Result<Box<dyn Instance>, Raised>;
}

/// A constructed object of a unit's class.
pub trait Instance: Send {
    fn call_method(&self, method: &str, args: &[Value]) -> Outcome;
}

/// Turns a source location into a `Unit`.
pub trait Loader: Send + Sync {
    /// Whether `path` is a unit file this loader understands.
    fn accepts(&self, path: &Path) -> bool;
    fn load(&self, path: &Path) -> Result<Arc<dyn Unit>, LoadError>;
}

// ─── Invokers ──────────────────────────────────────────────────────

/// A single callable, ready to be called positionally.
pub trait Invoker {
    fn descriptor(&self) -> &CallableDescriptor;
    fn invoke(&self, args: &[Value]) -> Outcome;
}

/// A free function of a unit.
pub struct FunctionInvoker<'a> {
    unit: &'a dyn Unit,
    descriptor: &'a CallableDescriptor,
}

impl<'a> FunctionInvoker<'a> {
    pub fn new(unit: &'a dyn Unit, descriptor: &'a CallableDescriptor) -> Self {
        Self { unit, descriptor }
    }
}

impl Invoker for FunctionInvoker<'_> {
    fn descriptor(&self) -> &CallableDescriptor {
        self.descriptor
    }

    fn invoke(&self, args: &[Value]) -> Outcome {
        self.unit.call(&self.descriptor.name, args)
    }
}

/// A class constructor. Invoking it builds and discards an instance.
pub struct ConstructorInvoker<'a> {
    unit: &'a dyn Unit,
    class: &'a ClassDescriptor,
}

impl<'a> ConstructorInvoker<'a> {
    pub fn new(unit: &'a dyn Unit, class: &'a ClassDescriptor) -> Self {
        Self { unit, class }
    }
}

impl Invoker for ConstructorInvoker<'_> {
    fn descriptor(&self) -> &CallableDescriptor {
        &self.class.constructor
    }

    fn invoke(&self, args: &[Value]) -> Outcome {
        self.unit.construct(&self.class.name, args).map(|_| Value::None)
    }
}

/// A method bound to one instance. State carries over between calls.
pub struct MethodInvoker<'a> {
    instance: &'a dyn Instance,
    descriptor: &'a CallableDescriptor,
}

impl<'a> MethodInvoker<'a> {
    pub fn new(instance: &'a dyn Instance, descriptor: &'a CallableDescriptor) -> Self {
        Self {
            instance,
            descriptor,
        }
    }
}

impl Invoker for MethodInvoker<'_> {
    fn descriptor(&self) -> &CallableDescriptor {
        self.descriptor
    }

    fn invoke(&self, args: &[Value]) -> Outcome {
        self.instance.call_method(&self.descriptor.name, args)
    }
}

// ─── Shared Names ──────────────────────────────────────────────────

/// A class present in both units, with the methods both define.
#[derive(Clone, Debug)]
pub struct SharedClass {
    /// The original's descriptor.
    pub class: ClassDescriptor,
    pub methods: Vec<CallableDescriptor>,
}

/// Functions defined by both units, as described by the original, sorted
/// by name.
pub fn common_functions(original: &dyn Unit, candidate: &dyn Unit) -> Vec<CallableDescriptor> {
    let theirs: BTreeSet<String> = candidate.functions().into_iter().map(|f| f.name).collect();
    let mut shared: Vec<CallableDescriptor> = original
        .functions()
        .into_iter()
        .filter(|f| theirs.contains(&f.name))
        .collect();
    shared.sort_by(|a, b| a.name.cmp(&b.name));
    shared.dedup_by(|a, b| a.name == b.name);
    shared
}

/// Classes defined by both units, each with its shared method set.
pub fn common_classes(original: &dyn Unit, candidate: &dyn Unit) -> Vec<SharedClass> {
    let theirs = candidate.classes();
    let mut shared = Vec::new();
    for class in original.classes() {
        let Some(other) = theirs.iter().find(|c| c.name == class.name) else {
            continue;
        };
        let mut methods: Vec<CallableDescriptor> = class
            .methods
            .iter()
            .filter(|m| other.method(&m.name).is_some())
            .cloned()
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods.dedup_by(|a, b| a.name == b.name);
        shared.push(SharedClass { class, methods });
    }
    shared.sort_by(|a, b| a.class.name.cmp(&b.class.name));
    shared
}
