//! Dynamic values exchanged between the host, advice, and intercepted
//! operations.
//!
//! Participant objects are host-owned: the engine holds shared references
//! (`ObjRef`) with a stable numeric identity, never copies. Field-operation
//! kinds read and write the instance's field map directly.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::types::{TypeId, builtin};

/// Shared reference to a live participant instance.
pub type ObjRef = Arc<Instance>;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// A live object participating in intercepted operations.
#[derive(Debug)]
pub struct Instance {
    id: u64,
    type_id: TypeId,
    fields: Mutex<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(type_id: TypeId) -> ObjRef {
        Arc::new(Self {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            type_id,
            fields: Mutex::new(HashMap::new()),
        })
    }

    /// Process-unique identity, used to key per-instance aspect storage.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Read a field; unset fields read as `Nil`.
    pub fn get_field(&self, name: &str) -> Value {
        self.fields
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.fields.lock().unwrap().insert(name.to_string(), value);
    }
}

/// A dynamically-typed runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Obj(ObjRef),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    /// Runtime type of this value (the instance type for objects).
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Nil => builtin::NIL,
            Value::Bool(_) => builtin::BOOL,
            Value::Int(_) => builtin::INT,
            Value::Float(_) => builtin::FLOAT,
            Value::Str(_) => builtin::STRING,
            Value::Obj(o) => o.type_id(),
        }
    }

    pub fn as_obj(&self) -> Option<&ObjRef> {
        match self {
            Value::Obj(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Objects compare by identity, never structurally.
            (Value::Obj(a), Value::Obj(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Obj(o) => write!(f, "object#{}", o.id()),
        }
    }
}

/// An exception in flight: the thrown value plus its runtime type.
///
/// Travels as the `Err` arm of `Result<Value, Thrown>` end-to-end; the
/// engine never wraps or copies the underlying value.
#[derive(Debug, Clone, PartialEq)]
pub struct Thrown {
    value: Value,
    type_id: TypeId,
}

impl Thrown {
    pub fn new(value: Value) -> Self {
        let type_id = value.type_id();
        Self { value, type_id }
    }

    /// Construct a typed exception object carrying a message field.
    pub fn raise(type_id: TypeId, message: &str) -> Self {
        let obj = Instance::new(type_id);
        obj.set_field("message", Value::str(message));
        Self {
            value: Value::Obj(obj),
            type_id,
        }
    }

    /// A dispatch-machinery failure (host contract violation).
    pub fn fault(message: &str) -> Self {
        Self::raise(builtin::FAULT, message)
    }

    /// The error for a continuation position consumed a second time.
    pub fn proceed_exhausted(signature: &str) -> Self {
        Self::raise(
            builtin::PROCEED_EXHAUSTED,
            &format!("continuation for {} already consumed", signature),
        )
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn message(&self) -> Option<String> {
        match &self.value {
            Value::Obj(o) => match o.get_field("message") {
                Value::Nil => None,
                v => Some(v.to_string()),
            },
            _ => None,
        }
    }
}
