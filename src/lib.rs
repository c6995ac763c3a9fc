//! Weft — join-point synthesis and advice dispatch.
//!
//! Given an immutable description of an intercepted operation and the
//! ordered advice that applies to it, weft synthesizes a self-contained
//! dispatch routine and executes it with well-defined ordering, exception,
//! and reentrancy semantics.

pub mod config;
pub mod dispatch;
pub mod dump;
pub mod model;
pub mod scenario;
pub mod synth;

// Re-export commonly used types
pub use config::DispatchConfig;
pub use dispatch::{
    AdviceCx, ArtifactId, DispatchRoutine, Environment, HostOperation, JoinPointSnapshot,
    RoutineRegistry,
};
pub use model::{
    AdviceCatalog, AdvicePhase, AdviceSpec, AspectDef, AspectId, AspectInstance, BindingModel,
    GuardExpr, Instance, OperationDescriptor, OperationKind, ParamBinding, Thrown, TypeId, Value,
};
pub use synth::{SynthesisError, Synthesizer};
