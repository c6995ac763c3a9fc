//! Residual check synthesis: three-valued folding of guard expressions.
//!
//! Sub-expressions decidable from the operation's static types are folded
//! away; what remains compiles to a runtime `Guard` fragment gating exactly
//! one advice invocation. Undetermined results follow Kleene strong logic:
//! AND with any false operand is false regardless of undetermined siblings,
//! OR with any true operand is true, and a fully undetermined expression
//! always compiles to a runtime check — it is never assumed true.

use crate::dispatch::plan::Guard;
use crate::dispatch::Environment;
use crate::model::advice::GuardExpr;
use crate::model::descriptor::OperationDescriptor;
use crate::model::types::TypeId;

use super::SynthesisError;

/// Three-valued synthesis result for one guard expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tri {
    True,
    False,
    Check(Guard),
}

pub(crate) fn fold(
    env: &Environment,
    descriptor: &OperationDescriptor,
    advice: &str,
    expr: &GuardExpr,
) -> Result<Tri, SynthesisError> {
    match expr {
        GuardExpr::Const(true) => Ok(Tri::True),
        GuardExpr::Const(false) => Ok(Tri::False),

        GuardExpr::CalleeInstanceOf(name) => {
            let tested = lookup_type(env, descriptor, advice, name)?;
            if descriptor.is_static || descriptor.kind.is_constructor() {
                return Err(SynthesisError::GuardSubjectUnavailable {
                    operation: descriptor.signature.clone(),
                    advice: advice.to_string(),
                    subject: "callee",
                });
            }
            Ok(decide(env, descriptor.owner_type, tested, Guard::CalleeIs(tested)))
        }

        GuardExpr::CallerInstanceOf(name) => {
            let tested = lookup_type(env, descriptor, advice, name)?;
            let Some(static_ty) = descriptor.caller_type else {
                return Err(SynthesisError::GuardSubjectUnavailable {
                    operation: descriptor.signature.clone(),
                    advice: advice.to_string(),
                    subject: "caller",
                });
            };
            Ok(decide(env, static_ty, tested, Guard::CallerIs(tested)))
        }

        GuardExpr::ArgInstanceOf(index, name) => {
            let tested = lookup_type(env, descriptor, advice, name)?;
            let Some(&static_ty) = descriptor.arg_types.get(*index) else {
                return Err(SynthesisError::ArgumentOutOfRange {
                    operation: descriptor.signature.clone(),
                    advice: advice.to_string(),
                    index: *index,
                    arity: descriptor.arg_types.len(),
                });
            };
            Ok(decide(env, static_ty, tested, Guard::ArgIs(*index, tested)))
        }

        GuardExpr::InExtent { aspect, extent } => {
            let Some(aspect_id) = env.aspect_id(aspect) else {
                return Err(SynthesisError::UnknownAspect {
                    operation: descriptor.signature.clone(),
                    name: aspect.clone(),
                });
            };
            let Some(extent_id) = env.extent_id(aspect_id, extent) else {
                return Err(SynthesisError::UnknownExtent {
                    operation: descriptor.signature.clone(),
                    advice: advice.to_string(),
                    aspect: aspect.clone(),
                    extent: extent.clone(),
                });
            };
            // Never decidable ahead of time: a simple nonzero depth test.
            Ok(Tri::Check(Guard::InExtent(extent_id)))
        }

        GuardExpr::Not(inner) => Ok(match fold(env, descriptor, advice, inner)? {
            Tri::True => Tri::False,
            Tri::False => Tri::True,
            Tri::Check(guard) => Tri::Check(Guard::Not(Box::new(guard))),
        }),

        GuardExpr::And(parts) => {
            let mut residual = Vec::new();
            for part in parts {
                match fold(env, descriptor, advice, part)? {
                    Tri::False => return Ok(Tri::False),
                    Tri::True => {}
                    Tri::Check(guard) => residual.push(guard),
                }
            }
            Ok(combine(residual, Guard::All, Tri::True))
        }

        GuardExpr::Or(parts) => {
            let mut residual = Vec::new();
            for part in parts {
                match fold(env, descriptor, advice, part)? {
                    Tri::True => return Ok(Tri::True),
                    Tri::False => {}
                    Tri::Check(guard) => residual.push(guard),
                }
            }
            Ok(combine(residual, Guard::Any, Tri::False))
        }
    }
}

/// A subject whose static type is already assignable to the tested type
/// passes unconditionally; anything else stays a runtime check. Unrelated
/// static types are never folded to false — a runtime subtype could still
/// satisfy the test.
fn decide(env: &Environment, static_ty: TypeId, tested: TypeId, residual: Guard) -> Tri {
    if env.types.is_assignable(static_ty, tested) {
        Tri::True
    } else {
        Tri::Check(residual)
    }
}

fn combine(mut residual: Vec<Guard>, wrap: fn(Vec<Guard>) -> Guard, empty: Tri) -> Tri {
    match residual.len() {
        0 => empty,
        1 => Tri::Check(residual.pop().unwrap()),
        _ => Tri::Check(wrap(residual)),
    }
}

fn lookup_type(
    env: &Environment,
    descriptor: &OperationDescriptor,
    advice: &str,
    name: &str,
) -> Result<TypeId, SynthesisError> {
    env.types
        .lookup(name)
        .ok_or_else(|| SynthesisError::UnknownType {
            operation: descriptor.signature.clone(),
            advice: advice.to_string(),
            name: name.to_string(),
        })
}
