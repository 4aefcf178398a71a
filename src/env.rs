//! Environments and the host linker.
//!
//! An [`Environment`] maps variable symbols to runtime values during
//! expression evaluation. Environments are small and short-lived; `Let`
//! extends by copy so sibling branches never observe each other's
//! bindings.
//!
//! A [`Linker`] resolves definition symbols to host-provided functions
//! (hooks) and native names to reflective host calls. Both return plain
//! `Result<Value, String>`; the evaluator wraps failures into
//! [`crate::error::Error::Host`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::symbol::{DefnSym, VarSym};
use crate::value::Value;

/// A mapping from variable symbols to values.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<VarSym, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Build an environment from symbol/value pairs.
    pub fn of(pairs: impl IntoIterator<Item = (VarSym, Value)>) -> Self {
        Environment {
            bindings: pairs.into_iter().collect(),
        }
    }

    /// Look up a variable.
    pub fn get(&self, sym: &VarSym) -> Option<&Value> {
        self.bindings.get(sym)
    }

    /// Bind a variable in place.
    pub fn bind(&mut self, sym: VarSym, value: Value) {
        self.bindings.insert(sym, value);
    }

    /// A copy of this environment with one extra binding.
    pub fn extended(&self, sym: VarSym, value: Value) -> Environment {
        let mut next = self.clone();
        next.bind(sym, value);
        next
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

/// A host function invoked with an evaluated argument array.
pub type HostFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Resolves definition symbols and native names to host functions.
///
/// A hook registered for a definition symbol shadows the definition's IR
/// body: calls to that symbol go to the host instead. Natives back the
/// `NativeConstructor` / `NativeField` / `NativeMethod` boundary seam.
#[derive(Clone, Default)]
pub struct Linker {
    hooks: HashMap<DefnSym, HostFn>,
    natives: HashMap<String, HostFn>,
}

impl Linker {
    pub fn new() -> Self {
        Linker::default()
    }

    /// Register a hook for a definition symbol.
    pub fn register_hook(
        &mut self,
        sym: DefnSym,
        f: impl Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    ) {
        self.hooks.insert(sym, Arc::new(f));
    }

    /// Register a native member by name.
    pub fn register_native(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    ) {
        self.natives.insert(name.into(), Arc::new(f));
    }

    /// The hook registered for a definition symbol, if any.
    pub fn hook(&self, sym: &DefnSym) -> Option<&HostFn> {
        self.hooks.get(sym)
    }

    /// The native member registered under a name, if any.
    pub fn native(&self, name: &str) -> Option<&HostFn> {
        self.natives.get(name)
    }
}

impl std::fmt::Debug for Linker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linker")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("natives", &self.natives.keys().collect::<Vec<_>>())
            .finish()
    }
}
