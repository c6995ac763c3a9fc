//! The core emitter: assembles binding fragments, residual guards, and
//! parameter plans into a complete routine plan, specialized per operation
//! kind.

use crate::config::DispatchConfig;
use crate::dispatch::plan::{AdviceCall, Invoker, RoutinePlan};
use crate::dispatch::{Environment, ExtentId, HostOperation};
use crate::model::advice::{AdviceCatalog, AdvicePhase, AdviceSpec, ParamBinding};
use crate::model::descriptor::{OperationDescriptor, OperationKind};
use crate::model::types::TypeId;

use super::binding::SlotTable;
use super::residual::{self, Tri};
use super::SynthesisError;

pub(crate) fn emit_plan(
    env: &Environment,
    config: &DispatchConfig,
    descriptor: &OperationDescriptor,
    catalog: &AdviceCatalog,
) -> Result<RoutinePlan, SynthesisError> {
    let mut slots = SlotTable::new();
    let mut before = Vec::new();
    let mut around = Vec::new();
    let mut after_returning = Vec::new();
    let mut after_throwing = Vec::new();
    let mut after_finally = Vec::new();

    for spec in &catalog.entries {
        let Some(def) = env.aspect_def(spec.aspect) else {
            return Err(SynthesisError::UnknownAspect {
                operation: descriptor.signature.clone(),
                name: format!("#{}", spec.aspect.0),
            });
        };
        let Some(advice_index) = def.advice_index(&spec.advice) else {
            return Err(SynthesisError::UnknownAdvice {
                operation: descriptor.signature.clone(),
                aspect: def.name.clone(),
                advice: spec.advice.clone(),
            });
        };
        let label = format!("{}.{}", def.name, spec.advice);

        validate_params(descriptor, spec, &label)?;
        let narrowing = resolve_narrowing(env, descriptor, spec, &label)?;

        let guard = match &spec.guard {
            None => None,
            Some(expr) => match residual::fold(env, descriptor, &label, expr)? {
                Tri::True => None,
                Tri::False => {
                    // Statically inapplicable: the entry vanishes from the
                    // routine entirely.
                    if config.trace_synthesis {
                        eprintln!(
                            "[synth] {} dropped {} (guard folds false)",
                            descriptor.signature, label
                        );
                    }
                    continue;
                }
                Tri::Check(guard) => Some(guard),
            },
        };

        let fetch = slots.resolve(def, descriptor, &label, spec)?;
        let call = AdviceCall {
            aspect: spec.aspect,
            advice: advice_index,
            phase: spec.phase,
            label,
            fetch,
            guard,
            params: spec.params.clone(),
            narrowing,
        };
        match spec.phase {
            AdvicePhase::Before => before.push(call),
            AdvicePhase::Around => around.push(call),
            AdvicePhase::AfterReturning => after_returning.push(call),
            AdvicePhase::AfterThrowing => after_throwing.push(call),
            AdvicePhase::AfterFinally => after_finally.push(call),
        }
    }

    // After-phases observe outcomes in reverse registration order.
    after_returning.reverse();
    after_throwing.reverse();
    after_finally.reverse();

    let extents = resolve_extents(env, descriptor, catalog)?;
    let invoker = select_invoker(env, descriptor)?;

    let uses_join_point = [
        &before,
        &around,
        &after_returning,
        &after_throwing,
        &after_finally,
    ]
    .iter()
    .any(|phase| {
        phase
            .iter()
            .any(|call| call.params.contains(&ParamBinding::JoinPoint))
    });
    let fast_path = around.is_empty() && !uses_join_point && !config.force_general_path;

    Ok(RoutinePlan {
        descriptor: descriptor.clone(),
        before,
        around,
        after_returning,
        after_throwing,
        after_finally,
        invoker,
        static_slots: slots.into_inits(),
        extents,
        fast_path,
    })
}

fn validate_params(
    descriptor: &OperationDescriptor,
    spec: &AdviceSpec,
    label: &str,
) -> Result<(), SynthesisError> {
    for binding in &spec.params {
        match binding {
            ParamBinding::Arg(index) => {
                if *index >= descriptor.arg_types.len() {
                    return Err(SynthesisError::ArgumentOutOfRange {
                        operation: descriptor.signature.clone(),
                        advice: label.to_string(),
                        index: *index,
                        arity: descriptor.arg_types.len(),
                    });
                }
            }
            ParamBinding::Caller => {
                if descriptor.caller_type.is_none() {
                    return Err(SynthesisError::UnboundParameter {
                        operation: descriptor.signature.clone(),
                        advice: label.to_string(),
                        param: "caller",
                        reason: "caller is a static context",
                    });
                }
            }
            ParamBinding::Callee => {
                if descriptor.kind.is_constructor() {
                    return Err(SynthesisError::UnboundParameter {
                        operation: descriptor.signature.clone(),
                        advice: label.to_string(),
                        param: "callee",
                        reason: "callee does not exist before construction",
                    });
                }
                if descriptor.is_static {
                    return Err(SynthesisError::UnboundParameter {
                        operation: descriptor.signature.clone(),
                        advice: label.to_string(),
                        param: "callee",
                        reason: "callee is a static context",
                    });
                }
            }
            ParamBinding::JoinPoint => {}
            ParamBinding::ReturnValue => {
                if spec.phase != AdvicePhase::AfterReturning {
                    return Err(SynthesisError::UnboundParameter {
                        operation: descriptor.signature.clone(),
                        advice: label.to_string(),
                        param: "return-value",
                        reason: "only bindable in the after-returning phase",
                    });
                }
            }
            ParamBinding::ThrownValue => {
                if spec.phase != AdvicePhase::AfterThrowing {
                    return Err(SynthesisError::UnboundParameter {
                        operation: descriptor.signature.clone(),
                        advice: label.to_string(),
                        param: "thrown-value",
                        reason: "only bindable in the after-throwing phase",
                    });
                }
            }
        }
    }
    Ok(())
}

fn resolve_narrowing(
    env: &Environment,
    descriptor: &OperationDescriptor,
    spec: &AdviceSpec,
    label: &str,
) -> Result<Option<TypeId>, SynthesisError> {
    let Some(name) = &spec.narrowing else {
        return Ok(None);
    };
    if !matches!(
        spec.phase,
        AdvicePhase::AfterReturning | AdvicePhase::AfterThrowing
    ) {
        return Err(SynthesisError::NarrowingUnsupported {
            operation: descriptor.signature.clone(),
            advice: label.to_string(),
            phase: spec.phase,
        });
    }
    match env.types.lookup(name) {
        Some(ty) => Ok(Some(ty)),
        None => Err(SynthesisError::UnknownType {
            operation: descriptor.signature.clone(),
            advice: label.to_string(),
            name: name.clone(),
        }),
    }
}

fn resolve_extents(
    env: &Environment,
    descriptor: &OperationDescriptor,
    catalog: &AdviceCatalog,
) -> Result<Vec<ExtentId>, SynthesisError> {
    catalog
        .extent_boundaries
        .iter()
        .map(|(aspect, extent)| {
            let Some(def) = env.aspect_def(*aspect) else {
                return Err(SynthesisError::UnknownAspect {
                    operation: descriptor.signature.clone(),
                    name: format!("#{}", aspect.0),
                });
            };
            env.extent_id(*aspect, extent)
                .ok_or_else(|| SynthesisError::UnknownExtent {
                    operation: descriptor.signature.clone(),
                    advice: "extent-boundary".to_string(),
                    aspect: def.name.clone(),
                    extent: extent.clone(),
                })
        })
        .collect()
}

/// Per-kind selection of the real-operation invocation. The state machine
/// is shared verbatim; only this step differs structurally.
fn select_invoker(
    env: &Environment,
    descriptor: &OperationDescriptor,
) -> Result<Invoker, SynthesisError> {
    match descriptor.kind {
        OperationKind::CallMethod | OperationKind::ExecuteMethod => {
            match env.operation_body(descriptor.operation_id) {
                Some(HostOperation::Method(_)) => Ok(Invoker::Method {
                    operation_id: descriptor.operation_id,
                }),
                _ => Err(SynthesisError::MissingOperationBody {
                    operation: descriptor.signature.clone(),
                    expected: "method",
                }),
            }
        }
        OperationKind::CallConstructor | OperationKind::ExecuteConstructor => {
            match env.operation_body(descriptor.operation_id) {
                Some(HostOperation::Constructor(_)) => Ok(Invoker::Constructor {
                    operation_id: descriptor.operation_id,
                }),
                _ => Err(SynthesisError::MissingOperationBody {
                    operation: descriptor.signature.clone(),
                    expected: "constructor",
                }),
            }
        }
        OperationKind::ReadField => Ok(Invoker::FieldRead),
        OperationKind::WriteField => Ok(Invoker::FieldWrite),
        OperationKind::HandleException => Ok(Invoker::Handler),
    }
}
