//! Aspect definitions, binding models, and live aspect instances.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::dispatch::run::AdviceCx;

use super::value::{Thrown, Value};

/// Interned identity of a registered aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectId(pub u32);

/// How many live instances of an aspect exist, and who owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingModel {
    /// One process-wide instance.
    Global,
    /// One instance per operation-owner type.
    PerOwnerType,
    /// One lazily-created instance per caller instance.
    PerCallerInstance,
    /// One lazily-created instance per callee instance.
    PerCalleeInstance,
}

impl BindingModel {
    pub fn label(&self) -> &'static str {
        match self {
            BindingModel::Global => "global",
            BindingModel::PerOwnerType => "per-owner-type",
            BindingModel::PerCallerInstance => "per-caller-instance",
            BindingModel::PerCalleeInstance => "per-callee-instance",
        }
    }

    /// True for the two models resolved through a process-wide slot.
    pub fn is_static(&self) -> bool {
        matches!(self, BindingModel::Global | BindingModel::PerOwnerType)
    }
}

/// The executable body of one advice.
pub type AdviceBody =
    Arc<dyn Fn(&AspectInstance, &mut AdviceCx<'_>) -> Result<Value, Thrown> + Send + Sync>;

/// One named advice method of an aspect.
#[derive(Clone)]
pub struct AdviceDecl {
    pub name: String,
    pub body: AdviceBody,
}

impl fmt::Debug for AdviceDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdviceDecl").field("name", &self.name).finish()
    }
}

/// A registered aspect: its binding model, advice methods, and the dynamic
/// extents it declares.
#[derive(Debug, Clone)]
pub struct AspectDef {
    pub name: String,
    pub deployment: BindingModel,
    pub advice: Vec<AdviceDecl>,
    pub extents: Vec<String>,
}

impl AspectDef {
    pub fn new(name: &str, deployment: BindingModel) -> Self {
        Self {
            name: name.to_string(),
            deployment,
            advice: Vec::new(),
            extents: Vec::new(),
        }
    }

    pub fn with_advice(
        mut self,
        name: &str,
        body: impl Fn(&AspectInstance, &mut AdviceCx<'_>) -> Result<Value, Thrown>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.advice.push(AdviceDecl {
            name: name.to_string(),
            body: Arc::new(body),
        });
        self
    }

    pub fn with_extent(mut self, name: &str) -> Self {
        self.extents.push(name.to_string());
        self
    }

    pub fn advice_index(&self, name: &str) -> Option<usize> {
        self.advice.iter().position(|a| a.name == name)
    }
}

/// A live aspect instance with keyed mutable state.
///
/// State is observable by tests and scenarios, which makes instance-count
/// semantics of the four binding models checkable from the outside.
#[derive(Debug)]
pub struct AspectInstance {
    def: AspectId,
    state: Mutex<HashMap<String, Value>>,
}

impl AspectInstance {
    pub fn new(def: AspectId) -> Self {
        Self {
            def,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn def(&self) -> AspectId {
        self.def
    }

    pub fn get(&self, key: &str) -> Value {
        self.state
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    pub fn set(&self, key: &str, value: Value) {
        self.state.lock().unwrap().insert(key.to_string(), value);
    }

    /// Increment an integer counter in the state map, returning the new
    /// count. Non-integer prior values restart from one.
    pub fn bump(&self, key: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        let next = match state.get(key) {
            Some(Value::Int(n)) => n + 1,
            _ => 1,
        };
        state.insert(key.to_string(), Value::Int(next));
        next
    }
}
