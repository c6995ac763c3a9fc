//! The advice catalog: which behaviors apply to one operation, in what
//! phase, with what parameter bindings and residual guards.
//!
//! Entries arrive fully matched from upstream; ordering within a phase is
//! declaration order and is significant. The three after-phases are applied
//! in reverse declaration order (last registered observes the outcome
//! first); that reversal is baked in at synthesis time, not here.

use super::aspect::AspectId;

/// The five dispatch phases an advice can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvicePhase {
    Before,
    Around,
    AfterReturning,
    AfterFinally,
    AfterThrowing,
}

impl AdvicePhase {
    pub fn label(&self) -> &'static str {
        match self {
            AdvicePhase::Before => "before",
            AdvicePhase::Around => "around",
            AdvicePhase::AfterReturning => "after-returning",
            AdvicePhase::AfterFinally => "after-finally",
            AdvicePhase::AfterThrowing => "after-throwing",
        }
    }
}

/// How one advice parameter is filled at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamBinding {
    /// An operation argument by index.
    Arg(usize),
    /// The invoking context reference.
    Caller,
    /// The invoked entity reference.
    Callee,
    /// A reflective token for the dispatch routine itself.
    JoinPoint,
    /// The returned value (after-returning only).
    ReturnValue,
    /// The escaping exception (after-throwing only).
    ThrownValue,
}

impl ParamBinding {
    pub fn label(&self) -> &'static str {
        match self {
            ParamBinding::Arg(_) => "arg",
            ParamBinding::Caller => "caller",
            ParamBinding::Callee => "callee",
            ParamBinding::JoinPoint => "join-point",
            ParamBinding::ReturnValue => "return-value",
            ParamBinding::ThrownValue => "thrown-value",
        }
    }
}

/// A residual applicability test in descriptor form (type names, not ids).
///
/// Synthesis folds this over three-valued logic: sub-expressions decidable
/// from static types disappear, the rest compile to a runtime check.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardExpr {
    Const(bool),
    CalleeInstanceOf(String),
    CallerInstanceOf(String),
    ArgInstanceOf(usize, String),
    /// True while the named dynamic extent is active on this thread.
    InExtent { aspect: String, extent: String },
    Not(Box<GuardExpr>),
    And(Vec<GuardExpr>),
    Or(Vec<GuardExpr>),
}

/// One matched (operation, advice) pair as produced by the upstream matcher.
#[derive(Debug, Clone)]
pub struct AdviceSpec {
    pub aspect: AspectId,
    /// Advice name within the owning aspect.
    pub advice: String,
    pub phase: AdvicePhase,
    pub params: Vec<ParamBinding>,
    pub guard: Option<GuardExpr>,
    /// Type name narrowing the observed value (after-returning: the actual
    /// returned value; after-throwing: the thrown value).
    pub narrowing: Option<String>,
    /// Disambiguates multiple bindings of the same aspect in per-instance
    /// storage.
    pub qualifier: Option<String>,
}

impl AdviceSpec {
    pub fn new(aspect: AspectId, advice: &str, phase: AdvicePhase) -> Self {
        Self {
            aspect,
            advice: advice.to_string(),
            phase,
            params: Vec::new(),
            guard: None,
            narrowing: None,
            qualifier: None,
        }
    }

    pub fn with_params(mut self, params: &[ParamBinding]) -> Self {
        self.params = params.to_vec();
        self
    }

    pub fn with_guard(mut self, guard: GuardExpr) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn narrowed_to(mut self, type_name: &str) -> Self {
        self.narrowing = Some(type_name.to_string());
        self
    }

    pub fn qualified(mut self, qualifier: &str) -> Self {
        self.qualifier = Some(qualifier.to_string());
        self
    }
}

/// Everything the matcher decided about one operation: the ordered advice
/// entries plus the dynamic extents the operation is a boundary of.
#[derive(Debug, Clone, Default)]
pub struct AdviceCatalog {
    /// Declaration order across all phases.
    pub entries: Vec<AdviceSpec>,
    /// Extents entered when this operation starts and exited when it ends,
    /// named as (aspect name, extent name).
    pub extent_boundaries: Vec<(AspectId, String)>,
}

impl AdviceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: AdviceSpec) -> &mut Self {
        self.entries.push(spec);
        self
    }

    pub fn boundary(&mut self, aspect: AspectId, extent: &str) -> &mut Self {
        self.extent_boundaries.push((aspect, extent.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.extent_boundaries.is_empty()
    }
}
