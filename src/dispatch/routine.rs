//! The synthesized dispatch artifact.
//!
//! A routine is immutable after its static setup: the plan is shared data,
//! static aspect slots are initialized exactly once, and every logical
//! invocation gets its own frame. The entry point's parameter shape is
//! (callee-if-instance, operation arguments…, caller).

use std::sync::{Arc, OnceLock};

use crate::model::aspect::AspectInstance;
use crate::model::descriptor::OperationKind;
use crate::model::value::{Thrown, Value};

use super::environment::Environment;
use super::plan::{RoutinePlan, SlotInit};
use super::run::Run;

/// Distinguishable identity of one registered artifact. Re-synthesis for
/// the same operation produces a new epoch, so linked call sites can tell
/// the generations apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId {
    pub operation_id: u64,
    pub epoch: u64,
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}@{}", self.operation_id, self.epoch)
    }
}

/// A synthesized dispatch routine for one intercepted operation.
#[derive(Debug)]
pub struct DispatchRoutine {
    plan: RoutinePlan,
    /// Global / per-owner-type aspect instances, initialized together in
    /// declaration order the first time the routine runs.
    slots: OnceLock<Vec<Arc<AspectInstance>>>,
    trace: bool,
}

impl DispatchRoutine {
    pub(crate) fn new(plan: RoutinePlan, trace: bool) -> Self {
        Self {
            plan,
            slots: OnceLock::new(),
            trace,
        }
    }

    pub fn operation_id(&self) -> u64 {
        self.plan.descriptor.operation_id
    }

    pub fn signature(&self) -> &str {
        &self.plan.descriptor.signature
    }

    pub fn plan(&self) -> &RoutinePlan {
        &self.plan
    }

    pub fn is_fast_path(&self) -> bool {
        self.plan.fast_path
    }

    fn static_setup(&self, env: &Environment) -> &[Arc<AspectInstance>] {
        self.slots.get_or_init(|| {
            self.plan
                .static_slots
                .iter()
                .map(|slot| match *slot {
                    SlotInit::Global(aspect) => env.global_aspect(aspect),
                    SlotInit::OwnerType(aspect, owner) => env.owner_aspect(aspect, owner),
                })
                .collect()
        })
    }

    /// Dispatch one logical invocation.
    ///
    /// `callee` must be present for instance operations (and absent for
    /// static ones, constructors, and static handlers); `args` must match
    /// the descriptor's arity. Violations are host contract faults, raised
    /// as `Thrown`, never silently substituted.
    pub fn dispatch(
        &self,
        env: &Environment,
        callee: Option<Value>,
        args: &[Value],
        caller: Option<Value>,
    ) -> Result<Value, Thrown> {
        let descriptor = &self.plan.descriptor;
        if args.len() != descriptor.arg_types.len() {
            return Err(Thrown::fault(&format!(
                "{} expects {} arguments, got {}",
                descriptor.signature,
                descriptor.arg_types.len(),
                args.len()
            )));
        }
        let needs_callee = !descriptor.is_static
            && !descriptor.kind.is_constructor()
            && descriptor.kind != OperationKind::HandleException;
        if needs_callee && callee.is_none() {
            return Err(Thrown::fault(&format!(
                "{} requires a callee reference",
                descriptor.signature
            )));
        }

        let slots = self.static_setup(env);
        Run {
            env,
            plan: &self.plan,
            slots,
            trace: self.trace,
        }
        .execute(callee, args, caller)
    }
}
