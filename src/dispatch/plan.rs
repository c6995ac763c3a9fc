//! Compiled dispatch plans: the instruction forms produced by synthesis and
//! interpreted by the runtime.
//!
//! A plan is to the dispatch runtime what a bytecode chunk is to a VM:
//! immutable after synthesis, shared freely across threads, and free of any
//! per-invocation state (that lives in `Frame`).

use std::sync::Arc;

use crate::model::advice::{AdvicePhase, ParamBinding};
use crate::model::aspect::AspectId;
use crate::model::descriptor::{OperationDescriptor, OperationKind};
use crate::model::types::TypeId;

use super::environment::Environment;
use super::extent::{self, ExtentId};
use super::frame::Frame;

/// How an advice's aspect instance is acquired at dispatch time.
#[derive(Debug, Clone)]
pub enum AspectFetch {
    /// Index into the routine's static slot table (global / per-owner-type).
    Slot(usize),
    /// Get-or-create through the caller instance's side-table entry.
    CallerLocal { qualifier: Arc<str> },
    /// Get-or-create through the callee instance's side-table entry.
    CalleeLocal { qualifier: Arc<str> },
}

/// Initialization recipe for one static aspect slot. Slots are initialized
/// together, in declaration order, the first time the routine runs.
#[derive(Debug, Clone, Copy)]
pub enum SlotInit {
    Global(AspectId),
    OwnerType(AspectId, TypeId),
}

/// A compiled residual check: the runtime part of a guard that could not be
/// decided at synthesis time. Gates exactly one advice invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    CalleeIs(TypeId),
    CallerIs(TypeId),
    ArgIs(usize, TypeId),
    InExtent(ExtentId),
    Not(Box<Guard>),
    All(Vec<Guard>),
    Any(Vec<Guard>),
}

impl Guard {
    pub fn eval(&self, env: &Environment, frame: &Frame) -> bool {
        match self {
            Guard::CalleeIs(ty) => frame
                .callee
                .as_ref()
                .is_some_and(|v| env.types.is_assignable(v.type_id(), *ty)),
            Guard::CallerIs(ty) => frame
                .caller
                .as_ref()
                .is_some_and(|v| env.types.is_assignable(v.type_id(), *ty)),
            Guard::ArgIs(index, ty) => frame
                .args
                .get(*index)
                .is_some_and(|v| env.types.is_assignable(v.type_id(), *ty)),
            Guard::InExtent(id) => extent::active(*id),
            Guard::Not(inner) => !inner.eval(env, frame),
            Guard::All(parts) => parts.iter().all(|g| g.eval(env, frame)),
            Guard::Any(parts) => parts.iter().any(|g| g.eval(env, frame)),
        }
    }
}

/// One fully-compiled advice invocation.
#[derive(Debug, Clone)]
pub struct AdviceCall {
    pub aspect: AspectId,
    /// Index into the owning aspect's advice table.
    pub advice: usize,
    pub phase: AdvicePhase,
    /// `Aspect.advice`, for traces and dumps.
    pub label: String,
    pub fetch: AspectFetch,
    pub guard: Option<Guard>,
    pub params: Vec<ParamBinding>,
    /// After-phase narrowing against the observed value's runtime type.
    pub narrowing: Option<TypeId>,
}

/// How the real operation is ultimately invoked once the around chain is
/// exhausted. The four structural variants differ only here, in argument
/// shape, and in what introspection reports.
#[derive(Debug, Clone)]
pub enum Invoker {
    /// Host-registered method body, looked up by operation id.
    Method { operation_id: u64 },
    /// Host-registered allocation step; the new instance is the result.
    Constructor { operation_id: u64 },
    /// Direct read of the descriptor's member field.
    FieldRead,
    /// Direct write of the first argument into the member field.
    FieldWrite,
    /// A handler has no operation to proceed to; its continuation is a
    /// no-op returning `Nil`.
    Handler,
}

impl Invoker {
    pub fn label(&self) -> &'static str {
        match self {
            Invoker::Method { .. } => "host method",
            Invoker::Constructor { .. } => "host constructor",
            Invoker::FieldRead => "field read",
            Invoker::FieldWrite => "field write",
            Invoker::Handler => "no-op handler continuation",
        }
    }
}

/// The synthesized artifact body: per-phase advice calls, the real-operation
/// invoker, static slot layout, and extent boundaries.
#[derive(Debug, Clone)]
pub struct RoutinePlan {
    pub descriptor: OperationDescriptor,
    /// Declaration order.
    pub before: Vec<AdviceCall>,
    /// Declaration order; chained via the position counter.
    pub around: Vec<AdviceCall>,
    /// Reverse declaration order (baked at synthesis).
    pub after_returning: Vec<AdviceCall>,
    /// Reverse declaration order (baked at synthesis).
    pub after_throwing: Vec<AdviceCall>,
    /// Reverse declaration order (baked at synthesis).
    pub after_finally: Vec<AdviceCall>,
    pub invoker: Invoker,
    pub static_slots: Vec<SlotInit>,
    pub extents: Vec<ExtentId>,
    /// No around advice and no instance-scoped data: skip continuation
    /// machinery entirely.
    pub fast_path: bool,
}

impl RoutinePlan {
    pub fn advice_count(&self) -> usize {
        self.before.len()
            + self.around.len()
            + self.after_returning.len()
            + self.after_throwing.len()
            + self.after_finally.len()
    }

    /// A trivial plan has nothing to do besides the real operation.
    pub fn is_trivial(&self) -> bool {
        self.advice_count() == 0 && self.extents.is_empty()
    }

    pub fn kind(&self) -> OperationKind {
        self.descriptor.kind
    }

    /// Phase lists with labels, in execution order, for dumps.
    pub fn phases(&self) -> [(&'static str, &[AdviceCall]); 5] {
        [
            ("before", self.before.as_slice()),
            ("around", self.around.as_slice()),
            ("after-returning", self.after_returning.as_slice()),
            ("after-throwing", self.after_throwing.as_slice()),
            ("after-finally", self.after_finally.as_slice()),
        ]
    }
}
