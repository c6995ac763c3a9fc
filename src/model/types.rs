//! Named type universe for participants, arguments, and exceptions.
//!
//! The engine is host-agnostic: it never sees real host classes, only
//! registered type names with declared supertypes. Assignability is the
//! reflexive-transitive closure over those declarations.

use std::collections::HashMap;

/// Interned identity of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Built-in types registered by every [`TypeRegistry`], with fixed ids.
pub mod builtin {
    use super::TypeId;

    pub const NIL: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const FLOAT: TypeId = TypeId(3);
    pub const STRING: TypeId = TypeId(4);
    /// Dispatch-machinery failures raised by the engine itself.
    pub const FAULT: TypeId = TypeId(5);
    /// Raised when a continuation position is consumed a second time.
    pub const PROCEED_EXHAUSTED: TypeId = TypeId(6);
    /// Runtime type of the reflective join-point parameter token.
    pub const JOIN_POINT: TypeId = TypeId(7);
}

#[derive(Debug)]
struct TypeInfo {
    name: String,
    supers: Vec<TypeId>,
}

/// Registry of named types and their declared supertypes.
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    by_name: HashMap<String, TypeId>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
        };
        // Order must match the `builtin` constants.
        registry.intern("nil", &[]);
        registry.intern("bool", &[]);
        registry.intern("int", &[]);
        registry.intern("float", &[]);
        registry.intern("string", &[]);
        registry.intern("weft.Fault", &[]);
        registry.intern("weft.ProceedExhausted", &[builtin::FAULT]);
        registry.intern("weft.JoinPoint", &[]);
        registry
    }

    fn intern(&mut self, name: &str, supers: &[TypeId]) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeInfo {
            name: name.to_string(),
            supers: supers.to_vec(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Register a new type with its declared supertypes.
    pub fn register(&mut self, name: &str, supers: &[TypeId]) -> Result<TypeId, String> {
        if self.by_name.contains_key(name) {
            return Err(format!("type `{}` is already registered", name));
        }
        for sup in supers {
            if sup.0 as usize >= self.types.len() {
                return Err(format!(
                    "type `{}` declares an unregistered supertype id {}",
                    name, sup.0
                ));
            }
        }
        Ok(self.intern(name, supers))
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: TypeId) -> &str {
        self.types
            .get(id.0 as usize)
            .map(|t| t.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// True when a value of type `sub` may stand wherever `sup` is expected.
    pub fn is_assignable(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        let Some(info) = self.types.get(sub.0 as usize) else {
            return false;
        };
        info.supers.iter().any(|&s| self.is_assignable(s, sup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_are_stable() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.lookup("nil"), Some(builtin::NIL));
        assert_eq!(reg.lookup("weft.ProceedExhausted"), Some(builtin::PROCEED_EXHAUSTED));
        assert!(reg.is_assignable(builtin::PROCEED_EXHAUSTED, builtin::FAULT));
    }

    #[test]
    fn test_transitive_assignability() {
        let mut reg = TypeRegistry::new();
        let animal = reg.register("Animal", &[]).unwrap();
        let pet = reg.register("Pet", &[]).unwrap();
        let dog = reg.register("Dog", &[animal, pet]).unwrap();
        let puppy = reg.register("Puppy", &[dog]).unwrap();

        assert!(reg.is_assignable(puppy, animal));
        assert!(reg.is_assignable(puppy, pet));
        assert!(!reg.is_assignable(animal, puppy));
        assert!(!reg.is_assignable(animal, pet));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut reg = TypeRegistry::new();
        reg.register("Account", &[]).unwrap();
        assert!(reg.register("Account", &[]).is_err());
    }
}
