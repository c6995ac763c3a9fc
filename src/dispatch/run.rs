//! The phase state machine for synthesized dispatch routines.
//!
//! States: entered -> before done -> (continuation 0..N -> real operation)
//! -> after-returning or after-throwing -> after-finally -> exited. The
//! around chain is driven by the frame's position counter: every entry
//! (including each `proceed`) increments it and dispatches on the new value,
//! so each position is consumed at most once per logical invocation.

use std::sync::Arc;

use crate::model::advice::ParamBinding;
use crate::model::aspect::AspectInstance;
use crate::model::descriptor::OperationKind;
use crate::model::types::builtin;
use crate::model::value::{Instance, Thrown, Value};

use super::environment::{Environment, HostOperation};
use super::extent;
use super::frame::{Frame, JoinPointSnapshot};
use super::plan::{AdviceCall, AspectFetch, Invoker, RoutinePlan};

/// Immutable per-dispatch context: environment, plan, initialized static
/// slots. Copied freely; all mutable state lives in the `Frame`.
#[derive(Clone, Copy)]
pub(crate) struct Run<'a> {
    pub env: &'a Environment,
    pub plan: &'a RoutinePlan,
    pub slots: &'a [Arc<AspectInstance>],
    pub trace: bool,
}

impl<'a> Run<'a> {
    pub fn execute(
        self,
        callee: Option<Value>,
        args: &[Value],
        caller: Option<Value>,
    ) -> Result<Value, Thrown> {
        for &id in &self.plan.extents {
            extent::enter(id);
        }
        let outcome = self.run(callee, args, caller);
        for &id in self.plan.extents.iter().rev() {
            extent::exit(id);
        }
        outcome
    }

    fn run(
        self,
        callee: Option<Value>,
        args: &[Value],
        caller: Option<Value>,
    ) -> Result<Value, Thrown> {
        if self.plan.advice_count() == 0 {
            // Nothing to gate or observe: invoke in place, no frame.
            return self.invoke_with(callee.as_ref(), args);
        }

        let mut frame = Frame::new(args.to_vec(), callee, caller);

        let mut before_failure = None;
        for call in &self.plan.before {
            if !self.guard_passes(call, &frame) {
                continue;
            }
            if let Err(thrown) = self.invoke_advice(call, &mut frame, false) {
                // Remaining before advice and the whole guarded phase are
                // skipped; after-throwing and after-finally still run.
                before_failure = Some(thrown);
                break;
            }
        }

        let outcome = match before_failure {
            Some(thrown) => Err(thrown),
            None if self.plan.fast_path => {
                if self.trace {
                    eprintln!(
                        "[dispatch] invoke (fast) {}",
                        self.plan.descriptor.signature
                    );
                }
                self.invoke_with(frame.callee.as_ref(), &frame.args)
            }
            None => self.continue_chain(&mut frame),
        };

        self.run_afters(&mut frame, outcome)
    }

    /// The continuation entry point: the only recursive entry into the
    /// chain. Each entry consumes one position.
    pub(crate) fn continue_chain(self, frame: &mut Frame) -> Result<Value, Thrown> {
        frame.position += 1;
        let position = frame.position as usize;
        let around_count = self.plan.around.len();

        if position < around_count {
            let call = &self.plan.around[position];
            if !self.guard_passes(call, frame) {
                // A runtime-false guard skips this one advice transparently;
                // the position is still consumed.
                return self.continue_chain(frame);
            }
            self.invoke_advice(call, frame, true)
        } else if position == around_count {
            if self.trace {
                eprintln!("[dispatch] invoke {}", self.plan.descriptor.signature);
            }
            self.invoke_with(frame.callee.as_ref(), &frame.args)
        } else {
            Err(Thrown::proceed_exhausted(&self.plan.descriptor.signature))
        }
    }

    fn run_afters(
        self,
        frame: &mut Frame,
        outcome: Result<Value, Thrown>,
    ) -> Result<Value, Thrown> {
        frame.outcome = Some(outcome.clone());
        let mut outcome = outcome;

        match outcome.clone() {
            Ok(returned) => {
                let returned_ty = returned.type_id();
                for call in &self.plan.after_returning {
                    if let Some(narrow) = call.narrowing {
                        if !self.env.types.is_assignable(returned_ty, narrow) {
                            continue;
                        }
                    }
                    if !self.guard_passes(call, frame) {
                        continue;
                    }
                    if let Err(thrown) = self.invoke_advice(call, frame, false) {
                        outcome = Err(thrown);
                        frame.outcome = Some(outcome.clone());
                        break;
                    }
                }
            }
            Err(escaping) => {
                let thrown_ty = escaping.type_id();
                for call in &self.plan.after_throwing {
                    if let Some(narrow) = call.narrowing {
                        if !self.env.types.is_assignable(thrown_ty, narrow) {
                            continue;
                        }
                    }
                    if !self.guard_passes(call, frame) {
                        continue;
                    }
                    // Observers only: every entry observes the operation's
                    // own exception (narrowing and thrown-value binding both
                    // use it), even after an earlier observer raised a
                    // replacement. A clean return leaves the original
                    // propagating; the latest replacement wins.
                    if let Err(thrown) = self.invoke_advice(call, frame, false) {
                        outcome = Err(thrown);
                    }
                }
                frame.outcome = Some(outcome.clone());
            }
        }

        for call in &self.plan.after_finally {
            if !self.guard_passes(call, frame) {
                continue;
            }
            // Every finally entry runs exactly once even when an earlier one
            // raised; the latest raise wins, as with a throw inside finally.
            if let Err(thrown) = self.invoke_advice(call, frame, false) {
                outcome = Err(thrown);
                frame.outcome = Some(outcome.clone());
            }
        }

        outcome
    }

    fn guard_passes(self, call: &AdviceCall, frame: &Frame) -> bool {
        match &call.guard {
            None => true,
            Some(guard) => {
                let pass = guard.eval(self.env, frame);
                if self.trace && !pass {
                    eprintln!(
                        "[dispatch] guard skipped {} {}",
                        call.phase.label(),
                        call.label
                    );
                }
                pass
            }
        }
    }

    fn invoke_advice(
        self,
        call: &AdviceCall,
        frame: &mut Frame,
        can_proceed: bool,
    ) -> Result<Value, Thrown> {
        let aspect = self.fetch_aspect(call, frame)?;
        let params = self.bind_params(call, frame)?;
        if self.trace {
            eprintln!(
                "[dispatch] {} {} @ {}",
                call.phase.label(),
                call.label,
                self.plan.descriptor.signature
            );
        }
        let body = self.env.aspect(call.aspect).advice[call.advice].body.clone();
        let mut cx = AdviceCx {
            run: self,
            frame,
            params,
            can_proceed,
        };
        body(&aspect, &mut cx)
    }

    fn fetch_aspect(self, call: &AdviceCall, frame: &Frame) -> Result<Arc<AspectInstance>, Thrown> {
        match &call.fetch {
            AspectFetch::Slot(index) => Ok(self.slots[*index].clone()),
            AspectFetch::CallerLocal { qualifier } => {
                let caller = frame
                    .caller
                    .as_ref()
                    .and_then(|v| v.as_obj())
                    .ok_or_else(|| {
                        Thrown::fault(&format!(
                            "caller reference unavailable for per-caller aspect in {}",
                            call.label
                        ))
                    })?;
                Ok(self.env.instance_aspect(caller, call.aspect, qualifier))
            }
            AspectFetch::CalleeLocal { qualifier } => {
                let callee = frame
                    .callee
                    .as_ref()
                    .and_then(|v| v.as_obj())
                    .ok_or_else(|| {
                        Thrown::fault(&format!(
                            "callee reference unavailable for per-callee aspect in {}",
                            call.label
                        ))
                    })?;
                Ok(self.env.instance_aspect(callee, call.aspect, qualifier))
            }
        }
    }

    fn bind_params(self, call: &AdviceCall, frame: &Frame) -> Result<Vec<Value>, Thrown> {
        call.params
            .iter()
            .map(|binding| match binding {
                ParamBinding::Arg(index) => frame.args.get(*index).cloned().ok_or_else(|| {
                    Thrown::fault(&format!(
                        "argument {} missing at dispatch of {}",
                        index, self.plan.descriptor.signature
                    ))
                }),
                ParamBinding::Caller => frame.caller.clone().ok_or_else(|| {
                    Thrown::fault(&format!(
                        "caller reference missing at dispatch of {}",
                        self.plan.descriptor.signature
                    ))
                }),
                ParamBinding::Callee => frame.callee.clone().ok_or_else(|| {
                    Thrown::fault(&format!(
                        "callee reference missing at dispatch of {}",
                        self.plan.descriptor.signature
                    ))
                }),
                ParamBinding::JoinPoint => Ok(self.join_point_token()),
                ParamBinding::ReturnValue => match &frame.outcome {
                    Some(Ok(value)) => Ok(value.clone()),
                    _ => Err(Thrown::fault("return value unavailable")),
                },
                ParamBinding::ThrownValue => match &frame.outcome {
                    Some(Err(thrown)) => Ok(thrown.value().clone()),
                    _ => Err(Thrown::fault("thrown value unavailable")),
                },
            })
            .collect()
    }

    /// Reflective token for the join-point-self parameter binding.
    fn join_point_token(self) -> Value {
        let descriptor = &self.plan.descriptor;
        let token = Instance::new(builtin::JOIN_POINT);
        token.set_field("signature", Value::str(&descriptor.signature));
        token.set_field("kind", Value::str(descriptor.kind.label()));
        token.set_field("operation-id", Value::Int(descriptor.operation_id as i64));
        Value::Obj(token)
    }

    fn invoke_with(self, callee: Option<&Value>, args: &[Value]) -> Result<Value, Thrown> {
        let descriptor = &self.plan.descriptor;
        match &self.plan.invoker {
            Invoker::Method { operation_id } => match self.env.operation_body(*operation_id) {
                Some(HostOperation::Method(body)) => body(self.env, callee, args),
                _ => Err(Thrown::fault(&format!(
                    "no host method registered for {}",
                    descriptor.signature
                ))),
            },
            Invoker::Constructor { operation_id } => match self.env.operation_body(*operation_id) {
                Some(HostOperation::Constructor(body)) => body(self.env, args),
                _ => Err(Thrown::fault(&format!(
                    "no host constructor registered for {}",
                    descriptor.signature
                ))),
            },
            Invoker::FieldRead => {
                if descriptor.is_static {
                    Ok(self.env.static_field(descriptor.owner_type, &descriptor.member))
                } else {
                    let target = callee.and_then(|v| v.as_obj()).ok_or_else(|| {
                        Thrown::fault(&format!("field read on missing callee: {}", descriptor.signature))
                    })?;
                    Ok(target.get_field(&descriptor.member))
                }
            }
            Invoker::FieldWrite => {
                let value = args.first().cloned().unwrap_or(Value::Nil);
                if descriptor.is_static {
                    self.env
                        .set_static_field(descriptor.owner_type, &descriptor.member, value);
                } else {
                    let target = callee.and_then(|v| v.as_obj()).ok_or_else(|| {
                        Thrown::fault(&format!("field write on missing callee: {}", descriptor.signature))
                    })?;
                    target.set_field(&descriptor.member, value);
                }
                Ok(Value::Nil)
            }
            Invoker::Handler => Ok(Value::Nil),
        }
    }
}

/// The advice-facing view of one in-progress invocation: bound parameters,
/// join-point introspection, per-invocation metadata, and (for around
/// advice) the continuation.
pub struct AdviceCx<'a> {
    run: Run<'a>,
    frame: &'a mut Frame,
    params: Vec<Value>,
    can_proceed: bool,
}

impl<'a> AdviceCx<'a> {
    /// Resume the remaining around chain, or the real operation once the
    /// chain is exhausted. Only valid inside around advice; each position
    /// can be consumed once per logical invocation.
    pub fn proceed(&mut self) -> Result<Value, Thrown> {
        if !self.can_proceed {
            return Err(Thrown::fault(&format!(
                "proceed outside around advice in {}",
                self.signature()
            )));
        }
        self.frame.proceed_calls += 1;
        self.run.continue_chain(self.frame)
    }

    pub fn can_proceed(&self) -> bool {
        self.can_proceed
    }

    /// Number of call-throughs attempted so far in this logical invocation,
    /// counting exhausted ones.
    pub fn proceed_calls(&self) -> u32 {
        self.frame.proceed_calls
    }

    /// A bound advice parameter by position; `Nil` past the end.
    pub fn param(&self, index: usize) -> Value {
        self.params.get(index).cloned().unwrap_or(Value::Nil)
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn arg(&self, index: usize) -> Value {
        self.frame.args.get(index).cloned().unwrap_or(Value::Nil)
    }

    pub fn args(&self) -> &[Value] {
        &self.frame.args
    }

    pub fn caller(&self) -> Option<Value> {
        self.frame.caller.clone()
    }

    pub fn callee(&self) -> Option<Value> {
        self.frame.callee.clone()
    }

    pub fn signature(&self) -> &str {
        &self.run.plan.descriptor.signature
    }

    pub fn enclosing_signature(&self) -> Option<&str> {
        self.run.plan.descriptor.enclosing_signature.as_deref()
    }

    pub fn kind(&self) -> OperationKind {
        self.run.plan.descriptor.kind
    }

    pub fn operation_id(&self) -> u64 {
        self.run.plan.descriptor.operation_id
    }

    pub fn get_meta(&self, key: &str) -> Value {
        self.frame.metadata.get(key).cloned().unwrap_or(Value::Nil)
    }

    pub fn set_meta(&mut self, key: &str, value: Value) {
        self.frame.metadata.insert(key.to_string(), value);
    }

    pub fn env(&self) -> &Environment {
        self.run.env
    }

    /// A stable detached copy of this invocation's join point.
    pub fn snapshot(&self) -> JoinPointSnapshot {
        self.frame.snapshot(&self.run.plan.descriptor)
    }
}
