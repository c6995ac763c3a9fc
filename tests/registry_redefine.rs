//! Artifact registration, redefinition epochs, and idempotent re-synthesis.

use std::sync::{Arc, Mutex};

use weft::dump::dump_routine;
use weft::model::types::builtin;
use weft::{
    AdviceCatalog, AdvicePhase, AdviceSpec, AspectDef, BindingModel, DispatchConfig, Environment,
    HostOperation, Instance, OperationDescriptor, OperationKind, RoutineRegistry, Synthesizer,
    Value,
};

fn echo_env() -> (Environment, OperationDescriptor) {
    let mut env = Environment::new();
    let account = env.types.register("Account", &[]).unwrap();
    let descriptor = OperationDescriptor::new(
        OperationKind::CallMethod,
        "Account.echo(int)",
        "echo",
        account,
    )
    .with_args(&[builtin::INT])
    .returning(builtin::INT);
    env.register_operation(
        descriptor.operation_id,
        HostOperation::Method(Arc::new(|_env, _callee, args| Ok(args[0].clone()))),
    );
    (env, descriptor)
}

#[test]
fn test_reinstall_bumps_the_epoch_and_replaces_the_routine() {
    let (mut env, descriptor) = echo_env();
    let log = Arc::new(Mutex::new(Vec::new()));
    let advice_log = log.clone();
    let aspect = env.register_aspect(AspectDef::new("Audit", BindingModel::Global).with_advice(
        "tick",
        move |_aspect, _cx| {
            advice_log.lock().unwrap().push(());
            Ok(Value::Nil)
        },
    ));

    let registry = RoutineRegistry::new();
    let synthesizer = Synthesizer::new(&env, &DispatchConfig::default());

    // First generation: no advice at all.
    let plain = synthesizer
        .synthesize(&descriptor, &AdviceCatalog::new())
        .unwrap();
    let (first_id, first) = registry.install(plain);
    assert_eq!(first_id.epoch, 0);
    assert_eq!(registry.len(), 1);

    let callee = Value::Obj(Instance::new(descriptor.owner_type));
    first
        .dispatch(&env, Some(callee.clone()), &[Value::Int(1)], None)
        .unwrap();
    assert!(log.lock().unwrap().is_empty());

    // Redefined generation: one before advice. Same operation id, new epoch.
    let mut catalog = AdviceCatalog::new();
    catalog.push(AdviceSpec::new(aspect, "tick", AdvicePhase::Before));
    let advised = synthesizer.synthesize(&descriptor, &catalog).unwrap();
    let (second_id, _) = registry.install(advised);
    assert_eq!(second_id.operation_id, first_id.operation_id);
    assert_eq!(second_id.epoch, 1);
    assert_eq!(registry.len(), 1);

    // A lookup after redefinition sees the new behavior.
    let (current_id, current) = registry.lookup(descriptor.operation_id).unwrap();
    assert_eq!(current_id, second_id);
    current
        .dispatch(&env, Some(callee), &[Value::Int(2)], None)
        .unwrap();
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_artifact_id_renders_operation_and_epoch() {
    let (env, descriptor) = echo_env();
    let registry = RoutineRegistry::new();
    let synthesizer = Synthesizer::new(&env, &DispatchConfig::default());
    let (id, _) = registry.install(
        synthesizer
            .synthesize(&descriptor, &AdviceCatalog::new())
            .unwrap(),
    );
    assert_eq!(
        id.to_string(),
        format!("{:016x}@0", descriptor.operation_id)
    );
}

#[test]
fn test_resynthesis_of_identical_inputs_is_idempotent() {
    let (mut env, descriptor) = echo_env();
    let aspect = env.register_aspect(
        AspectDef::new("Audit", BindingModel::Global)
            .with_advice("tick", |_a, _cx| Ok(Value::Nil)),
    );
    let mut catalog = AdviceCatalog::new();
    catalog.push(AdviceSpec::new(aspect, "tick", AdvicePhase::Before));
    catalog.push(AdviceSpec::new(aspect, "tick", AdvicePhase::AfterFinally));

    let synthesizer = Synthesizer::new(&env, &DispatchConfig::default());
    let first = synthesizer.synthesize(&descriptor, &catalog).unwrap();
    let second = synthesizer.synthesize(&descriptor, &catalog).unwrap();

    assert_eq!(first.plan().advice_count(), second.plan().advice_count());
    assert_eq!(first.is_fast_path(), second.is_fast_path());
    // The rendered plans match exactly.
    assert_eq!(
        dump_routine(&env, &first),
        dump_routine(&env, &second)
    );
}

#[test]
fn test_lookup_of_unregistered_operation_is_none() {
    let registry = RoutineRegistry::new();
    assert!(registry.lookup(0xdead_beef).is_none());
    assert!(registry.is_empty());
}
