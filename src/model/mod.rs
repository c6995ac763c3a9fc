//! Leaf data model: types, values, operation descriptors, advice catalogs,
//! and aspect definitions.

pub mod advice;
pub mod aspect;
pub mod descriptor;
pub mod types;
pub mod value;

pub use advice::{AdviceCatalog, AdvicePhase, AdviceSpec, GuardExpr, ParamBinding};
pub use aspect::{AdviceBody, AspectDef, AspectId, AspectInstance, BindingModel};
pub use descriptor::{OperationDescriptor, OperationKind, operation_id};
pub use types::{TypeId, TypeRegistry, builtin};
pub use value::{Instance, ObjRef, Thrown, Value};
