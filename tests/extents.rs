//! Dynamic extents: thread-local activation, boundary operations, and
//! extent-guarded advice.

use std::sync::{Arc, Mutex, OnceLock};

use weft::dispatch::extent;
use weft::model::types::builtin;
use weft::{
    AdviceCatalog, AdvicePhase, AdviceSpec, AspectDef, BindingModel, DispatchConfig,
    DispatchRoutine, Environment, GuardExpr, HostOperation, Instance, OperationDescriptor,
    OperationKind, Synthesizer, Value,
};

type Log = Arc<Mutex<Vec<String>>>;

fn guarded_ping(
    env: &mut Environment,
    log: &Log,
) -> (OperationDescriptor, AdviceCatalog) {
    let account = env.types.register("Account", &[]).unwrap();
    let descriptor =
        OperationDescriptor::new(OperationKind::CallMethod, "Account.ping()", "ping", account);
    let op_log = log.clone();
    env.register_operation(
        descriptor.operation_id,
        HostOperation::Method(Arc::new(move |_env, _callee, _args| {
            op_log.lock().unwrap().push("ping".to_string());
            Ok(Value::Nil)
        })),
    );
    let advice_log = log.clone();
    let aspect = env.register_aspect(
        AspectDef::new("Tx", BindingModel::Global)
            .with_extent("inTransfer")
            .with_advice("audit", move |_aspect, _cx| {
                advice_log.lock().unwrap().push("audit".to_string());
                Ok(Value::Nil)
            }),
    );
    let mut catalog = AdviceCatalog::new();
    catalog.push(
        AdviceSpec::new(aspect, "audit", AdvicePhase::Before).with_guard(GuardExpr::InExtent {
            aspect: "Tx".to_string(),
            extent: "inTransfer".to_string(),
        }),
    );
    (descriptor, catalog)
}

#[test]
fn test_extent_guard_follows_thread_local_activation() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut env = Environment::new();
    let (descriptor, catalog) = guarded_ping(&mut env, &log);
    let routine = Synthesizer::new(&env, &DispatchConfig::default())
        .synthesize(&descriptor, &catalog)
        .unwrap();

    let aspect = env.aspect_id("Tx").unwrap();
    let id = env.extent_id(aspect, "inTransfer").unwrap();
    let callee = || Value::Obj(Instance::new(descriptor.owner_type));

    routine.dispatch(&env, Some(callee()), &[], None).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["ping"]);

    extent::enter(id);
    routine.dispatch(&env, Some(callee()), &[], None).unwrap();
    extent::exit(id);
    assert_eq!(*log.lock().unwrap(), vec!["ping", "audit", "ping"]);

    // Exited again: back to inactive.
    routine.dispatch(&env, Some(callee()), &[], None).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["ping", "audit", "ping", "ping"]
    );
}

#[test]
fn test_extent_activation_does_not_leak_across_threads() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut env = Environment::new();
    let (descriptor, catalog) = guarded_ping(&mut env, &log);
    let routine = Synthesizer::new(&env, &DispatchConfig::default())
        .synthesize(&descriptor, &catalog)
        .unwrap();

    let aspect = env.aspect_id("Tx").unwrap();
    let id = env.extent_id(aspect, "inTransfer").unwrap();
    extent::enter(id);

    let env = Arc::new(env);
    let routine = Arc::new(routine);
    let callee = Value::Obj(Instance::new(descriptor.owner_type));
    let worker = {
        let env = env.clone();
        let routine = routine.clone();
        std::thread::spawn(move || {
            routine.dispatch(&env, Some(callee), &[], None).unwrap();
        })
    };
    worker.join().unwrap();
    extent::exit(id);

    // The worker thread saw the extent inactive.
    assert_eq!(*log.lock().unwrap(), vec!["ping"]);
}

#[test]
fn test_boundary_operation_activates_its_extent_for_nested_dispatch() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut env = Environment::new();

    // Inner operation, guarded on Tx.inTransfer.
    let (inner_descriptor, inner_catalog) = guarded_ping(&mut env, &log);

    // Outer operation is a boundary of the extent; its advice re-enters the
    // engine by dispatching the inner routine.
    let teller = env.types.register("Teller", &[]).unwrap();
    let account = inner_descriptor.owner_type;
    let outer_descriptor = OperationDescriptor::new(
        OperationKind::ExecuteMethod,
        "Teller.transfer()",
        "transfer",
        teller,
    )
    .returning(builtin::NIL);

    let inner_cell: Arc<OnceLock<Arc<DispatchRoutine>>> = Arc::new(OnceLock::new());
    let nested = inner_cell.clone();
    env.register_operation(
        outer_descriptor.operation_id,
        HostOperation::Method(Arc::new(move |env, _callee, _args| {
            let inner = nested.get().unwrap();
            let callee = Value::Obj(Instance::new(account));
            inner.dispatch(env, Some(callee), &[], None)
        })),
    );

    let tx = env.aspect_id("Tx").unwrap();
    let mut outer_catalog = AdviceCatalog::new();
    outer_catalog.boundary(tx, "inTransfer");

    let synthesizer = Synthesizer::new(&env, &DispatchConfig::default());
    let inner_routine = Arc::new(
        synthesizer
            .synthesize(&inner_descriptor, &inner_catalog)
            .unwrap(),
    );
    inner_cell.set(inner_routine.clone()).ok().unwrap();
    let outer_routine = synthesizer
        .synthesize(&outer_descriptor, &outer_catalog)
        .unwrap();

    // Outside the boundary the inner advice stays silent.
    inner_routine
        .dispatch(&env, Some(Value::Obj(Instance::new(account))), &[], None)
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["ping"]);

    // Through the boundary it fires, and deactivates again on exit.
    let outer_callee = Value::Obj(Instance::new(teller));
    outer_routine
        .dispatch(&env, Some(outer_callee), &[], None)
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["ping", "audit", "ping"]);

    inner_routine
        .dispatch(&env, Some(Value::Obj(Instance::new(account))), &[], None)
        .unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["ping", "audit", "ping", "ping"]
    );
}
