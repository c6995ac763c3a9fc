//! Scenario documents: declarative weaving setups for the CLI and tests.
//!
//! A scenario is a JSON file declaring a type universe, aspects with
//! scripted advice behaviors, intercepted operations with built-in host
//! bodies, the advice bindings between them, and a list of invocations to
//! execute. It exists so dispatch semantics can be exercised end to end
//! without a host program.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::DispatchConfig;
use crate::dispatch::{DispatchRoutine, Environment, HostOperation, RoutineRegistry};
use crate::model::advice::{AdviceCatalog, AdvicePhase, AdviceSpec, GuardExpr, ParamBinding};
use crate::model::aspect::{AdviceBody, AspectDef, BindingModel};
use crate::model::descriptor::{OperationDescriptor, OperationKind};
use crate::model::types::TypeId;
use crate::model::value::{Instance, Thrown, Value};
use crate::synth::{SynthesisError, Synthesizer};

#[derive(Debug, Deserialize)]
struct ScenarioDoc {
    #[serde(default)]
    types: Vec<TypeDecl>,
    #[serde(default)]
    aspects: Vec<AspectDecl>,
    #[serde(default)]
    operations: Vec<OperationDecl>,
    #[serde(default)]
    bindings: Vec<BindingDecl>,
    #[serde(default)]
    invocations: Vec<InvocationDecl>,
}

#[derive(Debug, Deserialize)]
struct TypeDecl {
    name: String,
    #[serde(default)]
    extends: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AspectDecl {
    name: String,
    #[serde(default = "default_deployment")]
    deployment: DeploymentDecl,
    #[serde(default)]
    advice: Vec<AdviceDeclDoc>,
    #[serde(default)]
    extents: Vec<String>,
}

fn default_deployment() -> DeploymentDecl {
    DeploymentDecl::Global
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DeploymentDecl {
    Global,
    PerOwnerType,
    PerCallerInstance,
    PerCalleeInstance,
}

impl From<DeploymentDecl> for BindingModel {
    fn from(decl: DeploymentDecl) -> Self {
        match decl {
            DeploymentDecl::Global => BindingModel::Global,
            DeploymentDecl::PerOwnerType => BindingModel::PerOwnerType,
            DeploymentDecl::PerCallerInstance => BindingModel::PerCallerInstance,
            DeploymentDecl::PerCalleeInstance => BindingModel::PerCalleeInstance,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AdviceDeclDoc {
    name: String,
    behavior: BehaviorDecl,
}

/// Scripted advice behaviors, rich enough to observe every phase.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BehaviorDecl {
    /// Print the advice label and signature, then call through if around.
    Trace { message: Option<String> },
    /// Bump a counter in the aspect instance's state, then call through.
    Count { key: String },
    /// Set per-invocation metadata, then call through.
    SetMetadata {
        key: String,
        value: serde_json::Value,
    },
    /// Around: call through once and return the result.
    Proceed,
    /// Around: do not call through; return a constant instead.
    SkipWith { value: serde_json::Value },
    /// Raise a typed exception.
    Throw {
        #[serde(rename = "type")]
        type_name: String,
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct OperationDecl {
    kind: KindDecl,
    signature: String,
    member: String,
    owner: String,
    #[serde(default)]
    caller: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    returns: Option<String>,
    #[serde(default, rename = "static")]
    is_static: bool,
    #[serde(default)]
    enclosing: Option<String>,
    #[serde(default)]
    body: Option<BodyDecl>,
    #[serde(default)]
    extent_boundaries: Vec<ExtentBoundaryDecl>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum KindDecl {
    CallMethod,
    ExecuteMethod,
    CallConstructor,
    ExecuteConstructor,
    ReadField,
    WriteField,
    HandleException,
}

impl From<KindDecl> for OperationKind {
    fn from(decl: KindDecl) -> Self {
        match decl {
            KindDecl::CallMethod => OperationKind::CallMethod,
            KindDecl::ExecuteMethod => OperationKind::ExecuteMethod,
            KindDecl::CallConstructor => OperationKind::CallConstructor,
            KindDecl::ExecuteConstructor => OperationKind::ExecuteConstructor,
            KindDecl::ReadField => OperationKind::ReadField,
            KindDecl::WriteField => OperationKind::WriteField,
            KindDecl::HandleException => OperationKind::HandleException,
        }
    }
}

/// Built-in host operation bodies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BodyDecl {
    /// Return the first argument (or nil).
    Echo,
    /// Integer sum of all arguments.
    Sum,
    /// String concatenation of all arguments.
    Concat,
    /// Return nil.
    Nil,
    /// Constructor kinds: allocate an instance of the owner type.
    Allocate,
    /// Raise a typed exception.
    Throw {
        #[serde(rename = "type")]
        type_name: String,
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct ExtentBoundaryDecl {
    aspect: String,
    extent: String,
}

#[derive(Debug, Deserialize)]
struct BindingDecl {
    operation: String,
    aspect: String,
    advice: String,
    phase: PhaseDecl,
    #[serde(default)]
    params: Vec<ParamDecl>,
    #[serde(default)]
    guard: Option<GuardDecl>,
    #[serde(default)]
    narrowing: Option<String>,
    #[serde(default)]
    qualifier: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PhaseDecl {
    Before,
    Around,
    AfterReturning,
    AfterThrowing,
    AfterFinally,
}

impl From<PhaseDecl> for AdvicePhase {
    fn from(decl: PhaseDecl) -> Self {
        match decl {
            PhaseDecl::Before => AdvicePhase::Before,
            PhaseDecl::Around => AdvicePhase::Around,
            PhaseDecl::AfterReturning => AdvicePhase::AfterReturning,
            PhaseDecl::AfterThrowing => AdvicePhase::AfterThrowing,
            PhaseDecl::AfterFinally => AdvicePhase::AfterFinally,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ParamDecl {
    Arg(usize),
    Caller,
    Callee,
    JoinPoint,
    ReturnValue,
    ThrownValue,
}

impl From<&ParamDecl> for ParamBinding {
    fn from(decl: &ParamDecl) -> Self {
        match decl {
            ParamDecl::Arg(index) => ParamBinding::Arg(*index),
            ParamDecl::Caller => ParamBinding::Caller,
            ParamDecl::Callee => ParamBinding::Callee,
            ParamDecl::JoinPoint => ParamBinding::JoinPoint,
            ParamDecl::ReturnValue => ParamBinding::ReturnValue,
            ParamDecl::ThrownValue => ParamBinding::ThrownValue,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum GuardDecl {
    Const(bool),
    CalleeInstanceOf(String),
    CallerInstanceOf(String),
    ArgInstanceOf(usize, String),
    InExtent { aspect: String, extent: String },
    Not(Box<GuardDecl>),
    And(Vec<GuardDecl>),
    Or(Vec<GuardDecl>),
}

impl From<&GuardDecl> for GuardExpr {
    fn from(decl: &GuardDecl) -> Self {
        match decl {
            GuardDecl::Const(b) => GuardExpr::Const(*b),
            GuardDecl::CalleeInstanceOf(name) => GuardExpr::CalleeInstanceOf(name.clone()),
            GuardDecl::CallerInstanceOf(name) => GuardExpr::CallerInstanceOf(name.clone()),
            GuardDecl::ArgInstanceOf(index, name) => GuardExpr::ArgInstanceOf(*index, name.clone()),
            GuardDecl::InExtent { aspect, extent } => GuardExpr::InExtent {
                aspect: aspect.clone(),
                extent: extent.clone(),
            },
            GuardDecl::Not(inner) => GuardExpr::Not(Box::new(inner.as_ref().into())),
            GuardDecl::And(parts) => GuardExpr::And(parts.iter().map(Into::into).collect()),
            GuardDecl::Or(parts) => GuardExpr::Or(parts.iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InvocationDecl {
    operation: String,
    #[serde(default)]
    callee: Option<ObjLiteral>,
    #[serde(default)]
    args: Vec<serde_json::Value>,
    #[serde(default)]
    caller: Option<ObjLiteral>,
}

#[derive(Debug, Deserialize)]
struct ObjLiteral {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug)]
struct PlannedObj {
    type_id: TypeId,
    fields: Vec<(String, Value)>,
}

impl PlannedObj {
    fn materialize(&self) -> Value {
        let obj = Instance::new(self.type_id);
        for (name, value) in &self.fields {
            obj.set_field(name, value.clone());
        }
        Value::Obj(obj)
    }
}

#[derive(Debug)]
struct PlannedInvocation {
    operation: usize,
    callee: Option<PlannedObj>,
    args: Vec<Value>,
    caller: Option<PlannedObj>,
}

/// A fully-built scenario: environment, operations with catalogs, and the
/// invocations to execute.
#[derive(Debug)]
pub struct Scenario {
    pub env: Environment,
    operations: Vec<(OperationDescriptor, AdviceCatalog)>,
    index: HashMap<String, usize>,
    invocations: Vec<PlannedInvocation>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let doc: ScenarioDoc =
            serde_json::from_str(content).map_err(|e| format!("failed to parse scenario: {}", e))?;
        Self::build(doc)
    }

    fn build(doc: ScenarioDoc) -> Result<Self, String> {
        let mut env = Environment::new();

        // Types first; supertypes must be declared before their subtypes.
        for decl in &doc.types {
            let supers = decl
                .extends
                .iter()
                .map(|name| {
                    env.types
                        .lookup(name)
                        .ok_or_else(|| format!("type `{}` extends undeclared `{}`", decl.name, name))
                })
                .collect::<Result<Vec<_>, _>>()?;
            env.types.register(&decl.name, &supers)?;
        }

        for decl in &doc.aspects {
            let mut def = AspectDef::new(&decl.name, decl.deployment.into());
            for advice in &decl.advice {
                let label = format!("{}.{}", decl.name, advice.name);
                let body = behavior_body(&env, &label, &advice.behavior)?;
                def.advice.push(crate::model::aspect::AdviceDecl {
                    name: advice.name.clone(),
                    body,
                });
            }
            for extent in &decl.extents {
                def.extents.push(extent.clone());
            }
            env.register_aspect(def);
        }

        let mut operations = Vec::new();
        let mut index = HashMap::new();
        for decl in &doc.operations {
            let kind: OperationKind = decl.kind.into();
            let owner = env
                .types
                .lookup(&decl.owner)
                .ok_or_else(|| format!("{}: undeclared owner type `{}`", decl.signature, decl.owner))?;
            let mut descriptor = OperationDescriptor::new(kind, &decl.signature, &decl.member, owner);
            descriptor.is_static = decl.is_static;
            descriptor.enclosing_signature = decl.enclosing.clone();
            for arg in &decl.args {
                let ty = env
                    .types
                    .lookup(arg)
                    .ok_or_else(|| format!("{}: undeclared argument type `{}`", decl.signature, arg))?;
                descriptor.arg_types.push(ty);
            }
            if let Some(returns) = &decl.returns {
                descriptor.return_type = env
                    .types
                    .lookup(returns)
                    .ok_or_else(|| format!("{}: undeclared return type `{}`", decl.signature, returns))?;
            }
            if let Some(caller) = &decl.caller {
                descriptor.caller_type = Some(env.types.lookup(caller).ok_or_else(|| {
                    format!("{}: undeclared caller type `{}`", decl.signature, caller)
                })?);
            }

            register_body(&mut env, &descriptor, decl)?;

            let mut catalog = AdviceCatalog::new();
            for boundary in &decl.extent_boundaries {
                let aspect = env.aspect_id(&boundary.aspect).ok_or_else(|| {
                    format!("{}: undeclared aspect `{}`", decl.signature, boundary.aspect)
                })?;
                catalog.boundary(aspect, &boundary.extent);
            }

            if index.contains_key(&decl.signature) {
                return Err(format!("duplicate operation `{}`", decl.signature));
            }
            index.insert(decl.signature.clone(), operations.len());
            operations.push((descriptor, catalog));
        }

        for decl in &doc.bindings {
            let &op_index = index
                .get(&decl.operation)
                .ok_or_else(|| format!("binding references unknown operation `{}`", decl.operation))?;
            let aspect = env
                .aspect_id(&decl.aspect)
                .ok_or_else(|| format!("binding references unknown aspect `{}`", decl.aspect))?;
            let mut spec = AdviceSpec::new(aspect, &decl.advice, decl.phase.into());
            spec.params = decl.params.iter().map(Into::into).collect();
            spec.guard = decl.guard.as_ref().map(Into::into);
            spec.narrowing = decl.narrowing.clone();
            spec.qualifier = decl.qualifier.clone();
            operations[op_index].1.push(spec);
        }

        let mut invocations = Vec::new();
        for decl in &doc.invocations {
            let &op_index = index
                .get(&decl.operation)
                .ok_or_else(|| format!("invocation references unknown operation `{}`", decl.operation))?;
            invocations.push(PlannedInvocation {
                operation: op_index,
                callee: decl.callee.as_ref().map(|o| planned_obj(&env, o)).transpose()?,
                args: decl
                    .args
                    .iter()
                    .map(json_to_value)
                    .collect::<Result<Vec<_>, _>>()?,
                caller: decl.caller.as_ref().map(|o| planned_obj(&env, o)).transpose()?,
            });
        }

        Ok(Self {
            env,
            operations,
            index,
            invocations,
        })
    }

    pub fn operations(&self) -> &[(OperationDescriptor, AdviceCatalog)] {
        &self.operations
    }

    pub fn operation(&self, signature: &str) -> Option<&(OperationDescriptor, AdviceCatalog)> {
        self.index.get(signature).map(|&i| &self.operations[i])
    }

    /// Synthesize every declared operation, collecting per-operation
    /// results. One operation's failure never aborts the others.
    pub fn synthesize_all(
        &self,
        config: &DispatchConfig,
    ) -> Vec<(String, Result<DispatchRoutine, SynthesisError>)> {
        let synthesizer = Synthesizer::new(&self.env, config);
        self.operations
            .iter()
            .map(|(descriptor, catalog)| {
                (
                    descriptor.signature.clone(),
                    synthesizer.synthesize(descriptor, catalog),
                )
            })
            .collect()
    }

    /// Synthesize, register, and execute the scenario's invocation list,
    /// returning one printable line per invocation.
    pub fn run(&self, config: &DispatchConfig) -> Result<Vec<String>, String> {
        let registry = RoutineRegistry::new();
        for (signature, result) in self.synthesize_all(config) {
            let routine =
                result.map_err(|e| format!("synthesis of {} failed: {}", signature, e))?;
            registry.install(routine);
        }

        let mut lines = Vec::new();
        for invocation in &self.invocations {
            let (descriptor, _) = &self.operations[invocation.operation];
            let (_, routine) = registry
                .lookup(descriptor.operation_id)
                .ok_or_else(|| format!("no routine registered for {}", descriptor.signature))?;
            let callee = invocation.callee.as_ref().map(|o| o.materialize());
            let caller = invocation.caller.as_ref().map(|o| o.materialize());
            let line = match routine.dispatch(&self.env, callee, &invocation.args, caller) {
                Ok(value) => format!("{} -> {}", descriptor.signature, render(&self.env, &value)),
                Err(thrown) => format!(
                    "{} -> threw {}{}",
                    descriptor.signature,
                    self.env.types.name(thrown.type_id()),
                    thrown
                        .message()
                        .map(|m| format!(": {}", m))
                        .unwrap_or_default()
                ),
            };
            lines.push(line);
        }
        Ok(lines)
    }
}

fn render(env: &Environment, value: &Value) -> String {
    match value {
        Value::Obj(obj) => format!("{}#{}", env.types.name(obj.type_id()), obj.id()),
        other => other.to_string(),
    }
}

fn planned_obj(env: &Environment, literal: &ObjLiteral) -> Result<PlannedObj, String> {
    let type_id = env
        .types
        .lookup(&literal.type_name)
        .ok_or_else(|| format!("undeclared participant type `{}`", literal.type_name))?;
    let fields = literal
        .fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), json_to_value(value)?)))
        .collect::<Result<Vec<_>, String>>()?;
    Ok(PlannedObj { type_id, fields })
}

fn json_to_value(json: &serde_json::Value) -> Result<Value, String> {
    match json {
        serde_json::Value::Null => Ok(Value::Nil),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(format!("unrepresentable number: {}", n))
            }
        }
        serde_json::Value::String(s) => Ok(Value::str(s)),
        other => Err(format!("unsupported literal: {}", other)),
    }
}

/// Compile a scripted behavior into an advice body. Observing behaviors
/// call through when used as around advice and return nil otherwise.
fn behavior_body(
    env: &Environment,
    label: &str,
    behavior: &BehaviorDecl,
) -> Result<AdviceBody, String> {
    match behavior {
        BehaviorDecl::Trace { message } => {
            let label = label.to_string();
            let message = message.clone().unwrap_or_else(|| "trace".to_string());
            Ok(Arc::new(move |_aspect, cx| {
                println!("[advice] {} {} @ {}", label, message, cx.signature());
                call_through(cx)
            }))
        }
        BehaviorDecl::Count { key } => {
            let key = key.clone();
            Ok(Arc::new(move |aspect, cx| {
                aspect.bump(&key);
                call_through(cx)
            }))
        }
        BehaviorDecl::SetMetadata { key, value } => {
            let key = key.clone();
            let value = json_to_value(value)?;
            Ok(Arc::new(move |_aspect, cx| {
                cx.set_meta(&key, value.clone());
                call_through(cx)
            }))
        }
        BehaviorDecl::Proceed => Ok(Arc::new(|_aspect, cx| call_through(cx))),
        BehaviorDecl::SkipWith { value } => {
            let value = json_to_value(value)?;
            Ok(Arc::new(move |_aspect, _cx| Ok(value.clone())))
        }
        BehaviorDecl::Throw { type_name, message } => {
            let type_id = env
                .types
                .lookup(type_name)
                .ok_or_else(|| format!("{}: undeclared exception type `{}`", label, type_name))?;
            let message = message.clone();
            Ok(Arc::new(move |_aspect, _cx| {
                Err(Thrown::raise(type_id, &message))
            }))
        }
    }
}

fn call_through(cx: &mut crate::dispatch::AdviceCx<'_>) -> Result<Value, Thrown> {
    if cx.can_proceed() {
        cx.proceed()
    } else {
        Ok(Value::Nil)
    }
}

fn register_body(
    env: &mut Environment,
    descriptor: &OperationDescriptor,
    decl: &OperationDecl,
) -> Result<(), String> {
    let kind = descriptor.kind;
    let needs_body = matches!(
        kind,
        OperationKind::CallMethod
            | OperationKind::ExecuteMethod
            | OperationKind::CallConstructor
            | OperationKind::ExecuteConstructor
    );
    let Some(body) = &decl.body else {
        if needs_body {
            return Err(format!("{}: missing host body", descriptor.signature));
        }
        return Ok(());
    };
    if !needs_body {
        return Err(format!(
            "{}: {} operations take no host body",
            descriptor.signature,
            kind.label()
        ));
    }

    let host = if kind.is_constructor() {
        let owner = descriptor.owner_type;
        match body {
            BodyDecl::Allocate => HostOperation::Constructor(Arc::new(move |_env, _args| {
                Ok(Value::Obj(Instance::new(owner)))
            })),
            BodyDecl::Throw { type_name, message } => {
                let type_id = env.types.lookup(type_name).ok_or_else(|| {
                    format!("{}: undeclared exception type `{}`", descriptor.signature, type_name)
                })?;
                let message = message.clone();
                HostOperation::Constructor(Arc::new(move |_env, _args| {
                    Err(Thrown::raise(type_id, &message))
                }))
            }
            other => {
                return Err(format!(
                    "{}: body {:?} is not a constructor body",
                    descriptor.signature, other
                ));
            }
        }
    } else {
        match body {
            BodyDecl::Echo => HostOperation::Method(Arc::new(|_env, _callee, args| {
                Ok(args.first().cloned().unwrap_or(Value::Nil))
            })),
            BodyDecl::Sum => HostOperation::Method(Arc::new(|_env, _callee, args| {
                let mut total = 0i64;
                for arg in args {
                    total += arg
                        .as_int()
                        .ok_or_else(|| Thrown::fault("sum expects integer arguments"))?;
                }
                Ok(Value::Int(total))
            })),
            BodyDecl::Concat => HostOperation::Method(Arc::new(|_env, _callee, args| {
                let mut out = String::new();
                for arg in args {
                    out.push_str(&arg.to_string());
                }
                Ok(Value::str(&out))
            })),
            BodyDecl::Nil => HostOperation::Method(Arc::new(|_env, _callee, _args| Ok(Value::Nil))),
            BodyDecl::Throw { type_name, message } => {
                let type_id = env.types.lookup(type_name).ok_or_else(|| {
                    format!("{}: undeclared exception type `{}`", descriptor.signature, type_name)
                })?;
                let message = message.clone();
                HostOperation::Method(Arc::new(move |_env, _callee, _args| {
                    Err(Thrown::raise(type_id, &message))
                }))
            }
            BodyDecl::Allocate => {
                return Err(format!(
                    "{}: `allocate` is only valid for constructor kinds",
                    descriptor.signature
                ));
            }
        }
    };
    env.register_operation(descriptor.operation_id, host);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "types": [
            {"name": "Account"},
            {"name": "Teller"}
        ],
        "aspects": [
            {"name": "Logging", "deployment": "global",
             "advice": [{"name": "enter", "behavior": {"count": {"key": "calls"}}}]}
        ],
        "operations": [
            {"kind": "call_method", "signature": "Account.withdraw(int)",
             "member": "withdraw", "owner": "Account", "caller": "Teller",
             "args": ["int"], "returns": "int", "body": "echo"}
        ],
        "bindings": [
            {"operation": "Account.withdraw(int)", "aspect": "Logging",
             "advice": "enter", "phase": "before", "params": [{"arg": 0}]}
        ],
        "invocations": [
            {"operation": "Account.withdraw(int)",
             "callee": {"type": "Account"}, "args": [100],
             "caller": {"type": "Teller"}}
        ]
    }"#;

    #[test]
    fn test_minimal_scenario_builds_and_runs() {
        let scenario = Scenario::from_json(MINIMAL).unwrap();
        assert_eq!(scenario.operations().len(), 1);
        let lines = scenario.run(&DispatchConfig::default()).unwrap();
        assert_eq!(lines, vec!["Account.withdraw(int) -> 100".to_string()]);
    }

    #[test]
    fn test_unknown_operation_in_binding_is_an_error() {
        let doc = r#"{
            "types": [{"name": "A"}],
            "bindings": [{"operation": "missing", "aspect": "X", "advice": "a", "phase": "before"}]
        }"#;
        let err = Scenario::from_json(doc).unwrap_err();
        assert!(err.contains("unknown operation"), "{}", err);
    }

    #[test]
    fn test_method_without_body_is_an_error() {
        let doc = r#"{
            "types": [{"name": "A"}],
            "operations": [{"kind": "call_method", "signature": "A.m()",
                            "member": "m", "owner": "A"}]
        }"#;
        let err = Scenario::from_json(doc).unwrap_err();
        assert!(err.contains("missing host body"), "{}", err);
    }

    #[test]
    fn test_field_operation_rejects_body() {
        let doc = r#"{
            "types": [{"name": "A"}],
            "operations": [{"kind": "read_field", "signature": "A.balance",
                            "member": "balance", "owner": "A", "body": "echo"}]
        }"#;
        assert!(Scenario::from_json(doc).is_err());
    }
}
