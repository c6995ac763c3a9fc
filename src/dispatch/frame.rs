//! Per-invocation dispatch state.
//!
//! A `Frame` is allocated fresh for each logical invocation on the general
//! path, so nested self-invocations of the same routine each get their own
//! cursor and never corrupt an outer in-progress continuation. The cursor is
//! threaded by `&mut` through the continuation chain; there is exactly one
//! owner at any point.

use std::collections::HashMap;

use crate::model::descriptor::{OperationDescriptor, OperationKind};
use crate::model::value::{Thrown, Value};

/// Mutable state of one logical invocation.
#[derive(Debug)]
pub struct Frame {
    pub args: Vec<Value>,
    pub caller: Option<Value>,
    pub callee: Option<Value>,
    /// Around-chain cursor; -1 before the first continuation entry.
    pub position: isize,
    /// Number of call-throughs attempted so far, exposed through the advice
    /// context; not captured by snapshots.
    pub proceed_calls: u32,
    /// Per-invocation metadata, shared by all advice of this invocation.
    pub metadata: HashMap<String, Value>,
    /// Outcome of the guarded phase, available to after-phase parameter
    /// binding.
    pub outcome: Option<Result<Value, Thrown>>,
}

impl Frame {
    pub fn new(args: Vec<Value>, callee: Option<Value>, caller: Option<Value>) -> Self {
        Self {
            args,
            caller,
            callee,
            position: -1,
            proceed_calls: 0,
            metadata: HashMap::new(),
            outcome: None,
        }
    }

    /// A structurally-identical detached copy of this invocation's join
    /// point: captured arguments, participants, cursor, and metadata carry
    /// over; reentrancy-sensitive counters do not.
    pub fn snapshot(&self, descriptor: &OperationDescriptor) -> JoinPointSnapshot {
        JoinPointSnapshot {
            signature: descriptor.signature.clone(),
            kind: descriptor.kind,
            operation_id: descriptor.operation_id,
            args: self.args.clone(),
            caller: self.caller.clone(),
            callee: self.callee.clone(),
            position: self.position,
            metadata: self.metadata.clone(),
        }
    }
}

/// A stable, owned copy of one invocation's join point, valid after the
/// live frame has moved on or been reused.
#[derive(Debug, Clone)]
pub struct JoinPointSnapshot {
    pub signature: String,
    pub kind: OperationKind,
    pub operation_id: u64,
    pub args: Vec<Value>,
    pub caller: Option<Value>,
    pub callee: Option<Value>,
    pub position: isize,
    pub metadata: HashMap<String, Value>,
}
