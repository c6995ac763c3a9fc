//! Synthesis: compiling an operation descriptor plus its advice catalog
//! into an executable dispatch routine.
//!
//! Synthesis failures are fatal for the one operation being compiled and
//! carry the operation and advice identity; they never abort synthesis of
//! unrelated operations.

mod binding;
mod emit;
mod residual;

use crate::config::DispatchConfig;
use crate::dispatch::routine::DispatchRoutine;
use crate::dispatch::Environment;
use crate::model::advice::{AdviceCatalog, AdvicePhase};
use crate::model::aspect::BindingModel;
use crate::model::descriptor::OperationDescriptor;

/// A synthesis-time failure, reported with the operation identity and the
/// failing advice identity.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// The catalog references an aspect the environment does not know.
    UnknownAspect { operation: String, name: String },
    /// The aspect exists but declares no advice with this name.
    UnknownAdvice {
        operation: String,
        aspect: String,
        advice: String,
    },
    /// A guard or narrowing names an unregistered type.
    UnknownType {
        operation: String,
        advice: String,
        name: String,
    },
    /// A guard or boundary names an extent its aspect does not declare.
    UnknownExtent {
        operation: String,
        advice: String,
        aspect: String,
        extent: String,
    },
    /// An argument index is outside the operation's arity.
    ArgumentOutOfRange {
        operation: String,
        advice: String,
        index: usize,
        arity: usize,
    },
    /// A parameter binding has no available source on this operation.
    UnboundParameter {
        operation: String,
        advice: String,
        param: &'static str,
        reason: &'static str,
    },
    /// A guard tests a participant reference this operation cannot supply.
    GuardSubjectUnavailable {
        operation: String,
        advice: String,
        subject: &'static str,
    },
    /// The aspect's binding model needs a participant reference that is
    /// statically known to be unavailable here.
    BindingUnavailable {
        operation: String,
        advice: String,
        model: BindingModel,
        reason: &'static str,
    },
    /// A method or constructor kind has no host body registered.
    MissingOperationBody {
        operation: String,
        expected: &'static str,
    },
    /// Narrowing is only meaningful on the two observing after-phases.
    NarrowingUnsupported {
        operation: String,
        advice: String,
        phase: AdvicePhase,
    },
}

impl std::fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisError::UnknownAspect { operation, name } => {
                write!(f, "{}: unknown aspect `{}`", operation, name)
            }
            SynthesisError::UnknownAdvice {
                operation,
                aspect,
                advice,
            } => write!(
                f,
                "{}: aspect `{}` has no advice named `{}`",
                operation, aspect, advice
            ),
            SynthesisError::UnknownType {
                operation,
                advice,
                name,
            } => write!(f, "{}: {}: unknown type `{}`", operation, advice, name),
            SynthesisError::UnknownExtent {
                operation,
                advice,
                aspect,
                extent,
            } => write!(
                f,
                "{}: {}: aspect `{}` declares no extent `{}`",
                operation, advice, aspect, extent
            ),
            SynthesisError::ArgumentOutOfRange {
                operation,
                advice,
                index,
                arity,
            } => write!(
                f,
                "{}: {}: argument index {} out of range (arity {})",
                operation, advice, index, arity
            ),
            SynthesisError::UnboundParameter {
                operation,
                advice,
                param,
                reason,
            } => write!(
                f,
                "{}: {}: cannot bind `{}` parameter: {}",
                operation, advice, param, reason
            ),
            SynthesisError::GuardSubjectUnavailable {
                operation,
                advice,
                subject,
            } => write!(
                f,
                "{}: {}: guard tests `{}`, which this operation cannot supply",
                operation, advice, subject
            ),
            SynthesisError::BindingUnavailable {
                operation,
                advice,
                model,
                reason,
            } => write!(
                f,
                "{}: {}: `{}` binding unavailable: {}",
                operation,
                advice,
                model.label(),
                reason
            ),
            SynthesisError::MissingOperationBody { operation, expected } => {
                write!(f, "{}: no host {} body registered", operation, expected)
            }
            SynthesisError::NarrowingUnsupported {
                operation,
                advice,
                phase,
            } => write!(
                f,
                "{}: {}: narrowing is not supported in the {} phase",
                operation,
                advice,
                phase.label()
            ),
        }
    }
}

impl std::error::Error for SynthesisError {}

/// The synthesis entry point.
pub struct Synthesizer<'e> {
    env: &'e Environment,
    config: DispatchConfig,
}

impl<'e> Synthesizer<'e> {
    pub fn new(env: &'e Environment, config: &DispatchConfig) -> Self {
        Self {
            env,
            config: config.clone(),
        }
    }

    /// Synthesize the dispatch routine for one operation. Idempotent for
    /// identical inputs: the emitted plan is a pure function of the
    /// descriptor, the catalog, and the registered definitions.
    pub fn synthesize(
        &self,
        descriptor: &OperationDescriptor,
        catalog: &AdviceCatalog,
    ) -> Result<DispatchRoutine, SynthesisError> {
        if self.config.trace_synthesis {
            eprintln!(
                "[synth] {} [{}] with {} advice entries",
                descriptor.signature,
                descriptor.kind.label(),
                catalog.entries.len()
            );
        }
        let plan = emit::emit_plan(self.env, &self.config, descriptor, catalog)?;
        if self.config.trace_synthesis {
            eprintln!(
                "[synth] {} -> {} calls, {} static slots, {} path",
                descriptor.signature,
                plan.advice_count(),
                plan.static_slots.len(),
                if plan.fast_path { "fast" } else { "general" }
            );
        }
        Ok(DispatchRoutine::new(plan, self.config.trace_dispatch))
    }
}
