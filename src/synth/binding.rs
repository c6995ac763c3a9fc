//! Binding resolution: translating an aspect's binding model into the
//! acquisition fragment the dispatch runtime executes.
//!
//! Global and per-owner-type aspects resolve to static slots, laid out in
//! first-reference order so initialization order matches declaration order.
//! Per-instance models resolve through the environment's side table. A
//! binding whose participant reference is statically unavailable is a
//! synthesis error — never a silent null.

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::plan::{AspectFetch, SlotInit};
use crate::model::advice::AdviceSpec;
use crate::model::aspect::{AspectDef, BindingModel};
use crate::model::descriptor::OperationDescriptor;
use crate::model::types::TypeId;

use super::SynthesisError;

/// Static slot layout for one routine under construction.
pub(crate) struct SlotTable {
    inits: Vec<SlotInit>,
    index: HashMap<(u32, Option<TypeId>), usize>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            inits: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn into_inits(self) -> Vec<SlotInit> {
        self.inits
    }

    fn slot(&mut self, key: (u32, Option<TypeId>), init: SlotInit) -> usize {
        if let Some(&index) = self.index.get(&key) {
            return index;
        }
        let index = self.inits.len();
        self.inits.push(init);
        self.index.insert(key, index);
        index
    }

    /// Resolve the acquisition fragment for one advice entry.
    pub fn resolve(
        &mut self,
        def: &AspectDef,
        descriptor: &OperationDescriptor,
        advice_label: &str,
        spec: &AdviceSpec,
    ) -> Result<AspectFetch, SynthesisError> {
        let qualifier: Arc<str> = Arc::from(spec.qualifier.as_deref().unwrap_or(""));
        match def.deployment {
            BindingModel::Global => {
                let index = self.slot((spec.aspect.0, None), SlotInit::Global(spec.aspect));
                Ok(AspectFetch::Slot(index))
            }
            BindingModel::PerOwnerType => {
                let owner = descriptor.owner_type;
                let index = self.slot(
                    (spec.aspect.0, Some(owner)),
                    SlotInit::OwnerType(spec.aspect, owner),
                );
                Ok(AspectFetch::Slot(index))
            }
            BindingModel::PerCallerInstance => {
                if descriptor.caller_type.is_none() {
                    return Err(SynthesisError::BindingUnavailable {
                        operation: descriptor.signature.clone(),
                        advice: advice_label.to_string(),
                        model: def.deployment,
                        reason: "caller is a static context",
                    });
                }
                Ok(AspectFetch::CallerLocal { qualifier })
            }
            BindingModel::PerCalleeInstance => {
                if descriptor.kind.is_constructor() {
                    return Err(SynthesisError::BindingUnavailable {
                        operation: descriptor.signature.clone(),
                        advice: advice_label.to_string(),
                        model: def.deployment,
                        reason: "callee does not exist before construction",
                    });
                }
                if descriptor.is_static {
                    return Err(SynthesisError::BindingUnavailable {
                        operation: descriptor.signature.clone(),
                        advice: advice_label.to_string(),
                        model: def.deployment,
                        reason: "callee is a static context",
                    });
                }
                Ok(AspectFetch::CalleeLocal { qualifier })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::advice::{AdvicePhase, AdviceSpec};
    use crate::model::aspect::AspectId;
    use crate::model::descriptor::OperationKind;
    use crate::model::types::builtin;

    fn spec(aspect: AspectId) -> AdviceSpec {
        AdviceSpec::new(aspect, "a", AdvicePhase::Before)
    }

    #[test]
    fn test_same_global_aspect_shares_one_slot() {
        let mut table = SlotTable::new();
        let def = AspectDef::new("Log", BindingModel::Global);
        let descriptor = OperationDescriptor::new(
            OperationKind::CallMethod,
            "T.m()",
            "m",
            builtin::STRING,
        );
        let a = table
            .resolve(&def, &descriptor, "Log.a", &spec(AspectId(0)))
            .unwrap();
        let b = table
            .resolve(&def, &descriptor, "Log.b", &spec(AspectId(0)))
            .unwrap();
        assert!(matches!(a, AspectFetch::Slot(0)));
        assert!(matches!(b, AspectFetch::Slot(0)));
        assert_eq!(table.into_inits().len(), 1);
    }

    #[test]
    fn test_per_callee_on_constructor_is_rejected() {
        let mut table = SlotTable::new();
        let def = AspectDef::new("Audit", BindingModel::PerCalleeInstance);
        let descriptor = OperationDescriptor::new(
            OperationKind::CallConstructor,
            "T.new()",
            "new",
            builtin::STRING,
        );
        let err = table
            .resolve(&def, &descriptor, "Audit.a", &spec(AspectId(0)))
            .unwrap_err();
        assert!(matches!(err, SynthesisError::BindingUnavailable { .. }));
    }

    #[test]
    fn test_per_caller_requires_caller_context() {
        let mut table = SlotTable::new();
        let def = AspectDef::new("Audit", BindingModel::PerCallerInstance);
        let descriptor = OperationDescriptor::new(
            OperationKind::CallMethod,
            "T.m()",
            "m",
            builtin::STRING,
        );
        assert!(table
            .resolve(&def, &descriptor, "Audit.a", &spec(AspectId(0)))
            .is_err());
        let with_caller = descriptor.with_caller(builtin::STRING);
        assert!(table
            .resolve(&def, &with_caller, "Audit.a", &spec(AspectId(0)))
            .is_ok());
    }
}
