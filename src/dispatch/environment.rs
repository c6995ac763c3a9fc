//! The shared runtime environment: registered types, aspects, host
//! operation bodies, aspect instance caches, and static field storage.
//!
//! Registration happens through `&mut self` during setup; dispatch-time
//! access is `&self` with interior locks only on the instance caches, so an
//! `Arc<Environment>` is freely shared across threads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::aspect::{AspectDef, AspectId, AspectInstance};
use crate::model::types::{TypeId, TypeRegistry};
use crate::model::value::{ObjRef, Thrown, Value};

use super::extent::ExtentId;

/// A host-registered method or field-accessor-equivalent body.
pub type MethodBody =
    Arc<dyn Fn(&Environment, Option<&Value>, &[Value]) -> Result<Value, Thrown> + Send + Sync>;

/// A host-registered allocation step; must return the new instance.
pub type ConstructorBody =
    Arc<dyn Fn(&Environment, &[Value]) -> Result<Value, Thrown> + Send + Sync>;

/// The real operation behind an intercepted site, registered by the
/// rewriting pass under the operation id.
#[derive(Clone)]
pub enum HostOperation {
    Method(MethodBody),
    Constructor(ConstructorBody),
}

impl std::fmt::Debug for HostOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl HostOperation {
    pub fn label(&self) -> &'static str {
        match self {
            HostOperation::Method(_) => "method",
            HostOperation::Constructor(_) => "constructor",
        }
    }
}

/// Process-wide runtime state shared by all synthesized routines.
#[derive(Debug)]
pub struct Environment {
    pub types: TypeRegistry,
    aspects: Vec<AspectDef>,
    extents: Vec<(AspectId, String)>,
    extent_index: HashMap<(AspectId, String), ExtentId>,
    operations: HashMap<u64, HostOperation>,
    global_aspects: Mutex<HashMap<AspectId, Arc<AspectInstance>>>,
    owner_aspects: Mutex<HashMap<(AspectId, TypeId), Arc<AspectInstance>>>,
    /// Per-participant lazy aspect storage, keyed by (participant identity,
    /// aspect identity, qualifier). An explicit side table: participants are
    /// never made to carry aspect state themselves.
    instance_aspects: Mutex<HashMap<(u64, AspectId, Arc<str>), Arc<AspectInstance>>>,
    static_fields: Mutex<HashMap<(TypeId, String), Value>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            types: TypeRegistry::new(),
            aspects: Vec::new(),
            extents: Vec::new(),
            extent_index: HashMap::new(),
            operations: HashMap::new(),
            global_aspects: Mutex::new(HashMap::new()),
            owner_aspects: Mutex::new(HashMap::new()),
            instance_aspects: Mutex::new(HashMap::new()),
            static_fields: Mutex::new(HashMap::new()),
        }
    }

    /// Register an aspect definition, assigning ids to its declared extents.
    pub fn register_aspect(&mut self, def: AspectDef) -> AspectId {
        let id = AspectId(self.aspects.len() as u32);
        for extent in &def.extents {
            let extent_id = ExtentId(self.extents.len() as u32);
            self.extents.push((id, extent.clone()));
            self.extent_index.insert((id, extent.clone()), extent_id);
        }
        self.aspects.push(def);
        id
    }

    pub fn aspect(&self, id: AspectId) -> &AspectDef {
        &self.aspects[id.0 as usize]
    }

    pub fn aspect_def(&self, id: AspectId) -> Option<&AspectDef> {
        self.aspects.get(id.0 as usize)
    }

    pub fn aspect_id(&self, name: &str) -> Option<AspectId> {
        self.aspects
            .iter()
            .position(|a| a.name == name)
            .map(|i| AspectId(i as u32))
    }

    pub fn extent_id(&self, aspect: AspectId, extent: &str) -> Option<ExtentId> {
        self.extent_index
            .get(&(aspect, extent.to_string()))
            .copied()
    }

    pub fn extent_label(&self, id: ExtentId) -> String {
        match self.extents.get(id.0 as usize) {
            Some((aspect, name)) => {
                format!("{}.{}", self.aspect(*aspect).name, name)
            }
            None => format!("extent#{}", id.0),
        }
    }

    /// Register the real operation body for an intercepted site.
    pub fn register_operation(&mut self, operation_id: u64, body: HostOperation) {
        self.operations.insert(operation_id, body);
    }

    pub fn operation_body(&self, operation_id: u64) -> Option<&HostOperation> {
        self.operations.get(&operation_id)
    }

    /// The process-wide instance of a global aspect, created on first use.
    pub fn global_aspect(&self, id: AspectId) -> Arc<AspectInstance> {
        self.global_aspects
            .lock()
            .unwrap()
            .entry(id)
            .or_insert_with(|| Arc::new(AspectInstance::new(id)))
            .clone()
    }

    /// The shared instance of a per-owner-type aspect for one owner type.
    pub fn owner_aspect(&self, id: AspectId, owner: TypeId) -> Arc<AspectInstance> {
        self.owner_aspects
            .lock()
            .unwrap()
            .entry((id, owner))
            .or_insert_with(|| Arc::new(AspectInstance::new(id)))
            .clone()
    }

    /// Get-or-create the aspect instance owned by one participant.
    ///
    /// Races between threads initializing the same entry are serialized by
    /// the table lock; the first writer wins and both see one instance.
    pub fn instance_aspect(
        &self,
        participant: &ObjRef,
        id: AspectId,
        qualifier: &Arc<str>,
    ) -> Arc<AspectInstance> {
        self.instance_aspects
            .lock()
            .unwrap()
            .entry((participant.id(), id, qualifier.clone()))
            .or_insert_with(|| Arc::new(AspectInstance::new(id)))
            .clone()
    }

    /// Number of live per-instance aspect entries (observability for tests
    /// and the CLI).
    pub fn instance_aspect_count(&self) -> usize {
        self.instance_aspects.lock().unwrap().len()
    }

    pub fn static_field(&self, owner: TypeId, name: &str) -> Value {
        self.static_fields
            .lock()
            .unwrap()
            .get(&(owner, name.to_string()))
            .cloned()
            .unwrap_or(Value::Nil)
    }

    pub fn set_static_field(&self, owner: TypeId, name: &str, value: Value) {
        self.static_fields
            .lock()
            .unwrap()
            .insert((owner, name.to_string()), value);
    }
}
