//! The dispatch runtime: compiled plans, per-invocation frames, the phase
//! state machine, the shared environment, and artifact registration.

pub mod environment;
pub mod extent;
pub mod frame;
pub mod plan;
pub mod registry;
pub mod routine;
pub mod run;

pub use environment::{ConstructorBody, Environment, HostOperation, MethodBody};
pub use extent::ExtentId;
pub use frame::{Frame, JoinPointSnapshot};
pub use plan::{AdviceCall, AspectFetch, Guard, Invoker, RoutinePlan, SlotInit};
pub use registry::RoutineRegistry;
pub use routine::{ArtifactId, DispatchRoutine};
pub use run::AdviceCx;
