//! Fast-path selection and its equivalence with the general path, plus the
//! join-point introspection that forces the general path.

use std::sync::{Arc, Mutex};

use weft::model::types::builtin;
use weft::{
    AdviceCatalog, AdvicePhase, AdviceSpec, AspectDef, BindingModel, DispatchConfig, Environment,
    HostOperation, Instance, OperationDescriptor, OperationKind, ParamBinding, Synthesizer, Value,
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
fn test_trivial_routine_takes_the_fast_path() {
    let (env, descriptor) = echo_env();
    let routine = Synthesizer::new(&env, &DispatchConfig::default())
        .synthesize(&descriptor, &AdviceCatalog::new())
        .unwrap();
    assert!(routine.is_fast_path());
    assert!(routine.plan().is_trivial());

    let callee = Value::Obj(Instance::new(descriptor.owner_type));
    assert_eq!(
        routine
            .dispatch(&env, Some(callee), &[Value::Int(7)], None)
            .unwrap(),
        Value::Int(7)
    );
}

#[test]
fn test_before_only_routine_stays_fast() {
    let (mut env, descriptor) = echo_env();
    let aspect = env.register_aspect(
        AspectDef::new("Audit", BindingModel::Global)
            .with_advice("tick", |aspect, _cx| {
                aspect.bump("calls");
                Ok(Value::Nil)
            }),
    );
    let mut catalog = AdviceCatalog::new();
    catalog.push(AdviceSpec::new(aspect, "tick", AdvicePhase::Before));

    let routine = Synthesizer::new(&env, &DispatchConfig::default())
        .synthesize(&descriptor, &catalog)
        .unwrap();
    assert!(routine.is_fast_path());
    assert!(!routine.plan().is_trivial());
}

#[test]
fn test_around_advice_forces_the_general_path() {
    let (mut env, descriptor) = echo_env();
    let aspect = env.register_aspect(
        AspectDef::new("Wrap", BindingModel::Global)
            .with_advice("pass", |_aspect, cx| cx.proceed()),
    );
    let mut catalog = AdviceCatalog::new();
    catalog.push(AdviceSpec::new(aspect, "pass", AdvicePhase::Around));

    let routine = Synthesizer::new(&env, &DispatchConfig::default())
        .synthesize(&descriptor, &catalog)
        .unwrap();
    assert!(!routine.is_fast_path());
}

#[test]
fn test_join_point_parameter_forces_the_general_path() {
    let (mut env, descriptor) = echo_env();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let aspect = env.register_aspect(AspectDef::new("Reflect", BindingModel::Global).with_advice(
        "inspect",
        move |_aspect, cx| {
            let token = cx.param(0);
            let obj = token.as_obj().unwrap().clone();
            assert_eq!(obj.type_id(), builtin::JOIN_POINT);
            sink.lock().unwrap().push((
                obj.get_field("signature"),
                obj.get_field("kind"),
            ));
            Ok(Value::Nil)
        },
    ));
    let mut catalog = AdviceCatalog::new();
    catalog.push(
        AdviceSpec::new(aspect, "inspect", AdvicePhase::Before)
            .with_params(&[ParamBinding::JoinPoint]),
    );

    let routine = Synthesizer::new(&env, &DispatchConfig::default())
        .synthesize(&descriptor, &catalog)
        .unwrap();
    assert!(!routine.is_fast_path());

    let callee = Value::Obj(Instance::new(descriptor.owner_type));
    routine
        .dispatch(&env, Some(callee), &[Value::Int(7)], None)
        .unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(
            Value::str("Account.echo(int)"),
            Value::str("call-method")
        )]
    );
}

#[test]
fn test_metadata_flows_from_before_to_finally() {
    let (mut env, descriptor) = echo_env();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let aspect = env.register_aspect(
        AspectDef::new("Baton", BindingModel::Global)
            .with_advice("stamp", |_aspect, cx| {
                cx.set_meta("token", Value::Int(99));
                Ok(Value::Nil)
            })
            .with_advice("collect", move |_aspect, cx| {
                sink.lock().unwrap().push(cx.get_meta("token"));
                Ok(Value::Nil)
            }),
    );
    let mut catalog = AdviceCatalog::new();
    catalog.push(AdviceSpec::new(aspect, "stamp", AdvicePhase::Before));
    catalog.push(AdviceSpec::new(aspect, "collect", AdvicePhase::AfterFinally));

    let routine = Synthesizer::new(&env, &DispatchConfig::default())
        .synthesize(&descriptor, &catalog)
        .unwrap();
    let callee = Value::Obj(Instance::new(descriptor.owner_type));
    routine
        .dispatch(&env, Some(callee), &[Value::Int(7)], None)
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![Value::Int(99)]);
}

#[test]
fn test_forced_general_path_behaves_like_the_fast_path() {
    fn run(config: &DispatchConfig) -> (Value, Value) {
        let (mut env, descriptor) = echo_env();
        let aspect = env.register_aspect(
            AspectDef::new("Audit", BindingModel::Global)
                .with_advice("tick", |aspect, _cx| {
                    aspect.bump("calls");
                    Ok(Value::Nil)
                }),
        );
        let mut catalog = AdviceCatalog::new();
        catalog.push(AdviceSpec::new(aspect, "tick", AdvicePhase::Before));
        catalog.push(AdviceSpec::new(aspect, "tick", AdvicePhase::AfterFinally));

        let routine = Synthesizer::new(&env, config)
            .synthesize(&descriptor, &catalog)
            .unwrap();
        assert_eq!(routine.is_fast_path(), !config.force_general_path);

        let callee = Value::Obj(Instance::new(descriptor.owner_type));
        let result = routine
            .dispatch(&env, Some(callee), &[Value::Int(41)], None)
            .unwrap();
        (result, env.global_aspect(aspect).get("calls"))
    }

    let fast = run(&DispatchConfig::default());
    let general = run(&DispatchConfig {
        force_general_path: true,
        ..Default::default()
    });
    assert_eq!(fast, general);
    assert_eq!(fast, (Value::Int(41), Value::Int(2)));
}
