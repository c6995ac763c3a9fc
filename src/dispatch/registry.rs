//! Registration of synthesized routines, keyed by operation identity.
//!
//! Re-installing a routine for the same operation bumps its epoch so
//! already-linked call sites can detect the change and retarget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::routine::{ArtifactId, DispatchRoutine};

struct Registered {
    epoch: u64,
    routine: Arc<DispatchRoutine>,
}

/// Process-wide table of live dispatch routines.
#[derive(Default)]
pub struct RoutineRegistry {
    routines: Mutex<HashMap<u64, Registered>>,
}

impl RoutineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a routine, replacing any prior generation for the same
    /// operation. Returns the new distinguishable artifact identity.
    pub fn install(&self, routine: DispatchRoutine) -> (ArtifactId, Arc<DispatchRoutine>) {
        let operation_id = routine.operation_id();
        let routine = Arc::new(routine);
        let mut routines = self.routines.lock().unwrap();
        let epoch = routines.get(&operation_id).map(|r| r.epoch + 1).unwrap_or(0);
        routines.insert(
            operation_id,
            Registered {
                epoch,
                routine: routine.clone(),
            },
        );
        (ArtifactId { operation_id, epoch }, routine)
    }

    /// The current artifact for an operation, if any.
    pub fn lookup(&self, operation_id: u64) -> Option<(ArtifactId, Arc<DispatchRoutine>)> {
        self.routines.lock().unwrap().get(&operation_id).map(|r| {
            (
                ArtifactId {
                    operation_id,
                    epoch: r.epoch,
                },
                r.routine.clone(),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.routines.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.lock().unwrap().is_empty()
    }
}
