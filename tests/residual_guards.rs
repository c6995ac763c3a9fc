//! Three-valued guard folding: statically-true tests vanish, statically
//! impossible entries are dropped, and everything else compiles to a
//! runtime residue.

use std::sync::{Arc, Mutex};

use weft::model::types::builtin;
use weft::{
    AdviceCatalog, AdvicePhase, AdviceSpec, AspectDef, BindingModel, DispatchConfig, Environment,
    GuardExpr, HostOperation, Instance, OperationDescriptor, OperationKind, SynthesisError,
    Synthesizer, Value,
};

type Log = Arc<Mutex<Vec<String>>>;

struct Fixture {
    env: Environment,
    descriptor: OperationDescriptor,
    aspect: weft::AspectId,
    savings: weft::TypeId,
    log: Log,
}

/// `Account.describe(Account)`: one argument typed as the base class, with
/// a `Savings` subtype available for runtime narrowing.
fn fixture() -> Fixture {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut env = Environment::new();
    let account = env.types.register("Account", &[]).unwrap();
    let savings = env.types.register("Savings", &[account]).unwrap();
    let descriptor = OperationDescriptor::new(
        OperationKind::CallMethod,
        "Account.describe(Account)",
        "describe",
        account,
    )
    .with_args(&[account])
    .returning(builtin::STRING);
    env.register_operation(
        descriptor.operation_id,
        HostOperation::Method(Arc::new(|_env, _callee, _args| Ok(Value::str("ok")))),
    );
    let advice_log = log.clone();
    let aspect = env.register_aspect(AspectDef::new("Audit", BindingModel::Global).with_advice(
        "seen",
        move |_aspect, _cx| {
            advice_log.lock().unwrap().push("seen".to_string());
            Ok(Value::Nil)
        },
    ));
    Fixture {
        env,
        descriptor,
        aspect,
        savings,
        log,
    }
}

fn synthesize(
    fx: &Fixture,
    guard: GuardExpr,
) -> Result<weft::DispatchRoutine, SynthesisError> {
    let mut catalog = AdviceCatalog::new();
    catalog.push(AdviceSpec::new(fx.aspect, "seen", AdvicePhase::Before).with_guard(guard));
    Synthesizer::new(&fx.env, &DispatchConfig::default()).synthesize(&fx.descriptor, &catalog)
}

#[test]
fn test_statically_true_guard_leaves_no_residue() {
    let fx = fixture();
    // The callee's static type is the owner; testing against it is decided
    // at synthesis time.
    let routine = synthesize(&fx, GuardExpr::CalleeInstanceOf("Account".to_string())).unwrap();
    assert_eq!(routine.plan().before.len(), 1);
    assert!(routine.plan().before[0].guard.is_none());
}

#[test]
fn test_const_false_conjunct_drops_the_entry() {
    let fx = fixture();
    let guard = GuardExpr::And(vec![
        GuardExpr::Const(false),
        GuardExpr::CalleeInstanceOf("Savings".to_string()),
    ]);
    let routine = synthesize(&fx, guard).unwrap();
    assert_eq!(routine.plan().advice_count(), 0);
    assert!(routine.is_fast_path());
}

#[test]
fn test_subtype_test_compiles_to_runtime_check() {
    let fx = fixture();
    let routine = synthesize(&fx, GuardExpr::CalleeInstanceOf("Savings".to_string())).unwrap();
    assert!(routine.plan().before[0].guard.is_some());

    // Skipped for a plain Account callee, taken for a Savings one.
    let account_callee = Value::Obj(Instance::new(fx.descriptor.owner_type));
    let arg = Value::Obj(Instance::new(fx.descriptor.owner_type));
    routine
        .dispatch(&fx.env, Some(account_callee), &[arg.clone()], None)
        .unwrap();
    assert!(fx.log.lock().unwrap().is_empty());

    let savings_callee = Value::Obj(Instance::new(fx.savings));
    routine
        .dispatch(&fx.env, Some(savings_callee), &[arg], None)
        .unwrap();
    assert_eq!(*fx.log.lock().unwrap(), vec!["seen"]);
}

#[test]
fn test_arg_test_narrows_at_runtime() {
    let fx = fixture();
    let routine = synthesize(&fx, GuardExpr::ArgInstanceOf(0, "Savings".to_string())).unwrap();
    assert!(routine.plan().before[0].guard.is_some());

    let callee = Value::Obj(Instance::new(fx.descriptor.owner_type));
    let plain = Value::Obj(Instance::new(fx.descriptor.owner_type));
    routine
        .dispatch(&fx.env, Some(callee.clone()), &[plain], None)
        .unwrap();
    assert!(fx.log.lock().unwrap().is_empty());

    let narrowed = Value::Obj(Instance::new(fx.savings));
    routine
        .dispatch(&fx.env, Some(callee), &[narrowed], None)
        .unwrap();
    assert_eq!(*fx.log.lock().unwrap(), vec!["seen"]);
}

#[test]
fn test_negated_true_drops_the_entry() {
    let fx = fixture();
    let guard = GuardExpr::Not(Box::new(GuardExpr::Const(true)));
    let routine = synthesize(&fx, guard).unwrap();
    assert_eq!(routine.plan().advice_count(), 0);
}

#[test]
fn test_true_disjunct_absorbs_residue() {
    let fx = fixture();
    let guard = GuardExpr::Or(vec![
        GuardExpr::CalleeInstanceOf("Savings".to_string()),
        GuardExpr::Const(true),
    ]);
    let routine = synthesize(&fx, guard).unwrap();
    assert_eq!(routine.plan().before.len(), 1);
    assert!(routine.plan().before[0].guard.is_none());
}

#[test]
fn test_unknown_type_in_guard_fails_synthesis() {
    let fx = fixture();
    let err = synthesize(&fx, GuardExpr::CalleeInstanceOf("Missing".to_string())).unwrap_err();
    assert!(matches!(err, SynthesisError::UnknownType { .. }));
}

#[test]
fn test_guard_out_of_range_argument_fails_synthesis() {
    let fx = fixture();
    let err = synthesize(&fx, GuardExpr::ArgInstanceOf(3, "Savings".to_string())).unwrap_err();
    assert!(matches!(err, SynthesisError::ArgumentOutOfRange { .. }));
}
