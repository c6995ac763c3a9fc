//! Immutable metadata for one intercepted operation.
//!
//! A descriptor is created once per distinct intercepted site by the
//! upstream matcher and never mutated. Its `operation_id` is a stable FNV-1a
//! hash of the kind and signature, so the same site hashes identically
//! across processes and re-synthesis rounds.

use super::types::TypeId;

/// The structural shape of an intercepted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CallMethod,
    ExecuteMethod,
    CallConstructor,
    ExecuteConstructor,
    ReadField,
    WriteField,
    HandleException,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::CallMethod => "call-method",
            OperationKind::ExecuteMethod => "execute-method",
            OperationKind::CallConstructor => "call-constructor",
            OperationKind::ExecuteConstructor => "execute-constructor",
            OperationKind::ReadField => "read-field",
            OperationKind::WriteField => "write-field",
            OperationKind::HandleException => "handle-exception",
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(
            self,
            OperationKind::CallConstructor | OperationKind::ExecuteConstructor
        )
    }

    pub fn is_field(&self) -> bool {
        matches!(self, OperationKind::ReadField | OperationKind::WriteField)
    }
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Stable numeric identity for an intercepted site.
pub fn operation_id(kind: OperationKind, signature: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in kind.label().bytes().chain([b':']).chain(signature.bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Immutable description of one intercepted operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    pub operation_id: u64,
    /// Human-readable signature, e.g. `Account.withdraw(int)`.
    pub signature: String,
    /// Signature of the operation lexically enclosing the intercepted site.
    pub enclosing_signature: Option<String>,
    /// Method or field name; unused for exception handlers.
    pub member: String,
    pub arg_types: Vec<TypeId>,
    pub return_type: TypeId,
    pub is_static: bool,
    /// Declarer of the invoked entity (callee side).
    pub owner_type: TypeId,
    /// Static type of the invoking context; `None` for a static caller.
    pub caller_type: Option<TypeId>,
}

impl OperationDescriptor {
    pub fn new(kind: OperationKind, signature: &str, member: &str, owner_type: TypeId) -> Self {
        Self {
            kind,
            operation_id: operation_id(kind, signature),
            signature: signature.to_string(),
            enclosing_signature: None,
            member: member.to_string(),
            arg_types: Vec::new(),
            return_type: super::types::builtin::NIL,
            is_static: false,
            owner_type,
            caller_type: None,
        }
    }

    pub fn with_args(mut self, args: &[TypeId]) -> Self {
        self.arg_types = args.to_vec();
        self
    }

    pub fn returning(mut self, ty: TypeId) -> Self {
        self.return_type = ty;
        self
    }

    pub fn with_caller(mut self, ty: TypeId) -> Self {
        self.caller_type = Some(ty);
        self
    }

    pub fn with_enclosing(mut self, signature: &str) -> Self {
        self.enclosing_signature = Some(signature.to_string());
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }
}
