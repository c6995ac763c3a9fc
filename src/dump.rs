//! Human-readable dump of synthesized routine plans.

use crate::dispatch::plan::{AdviceCall, AspectFetch, Guard, Invoker, RoutinePlan, SlotInit};
use crate::dispatch::{DispatchRoutine, Environment};
use crate::model::advice::ParamBinding;

/// Render one synthesized routine for inspection.
pub fn dump_routine(env: &Environment, routine: &DispatchRoutine) -> String {
    let plan = routine.plan();
    let descriptor = &plan.descriptor;
    let mut out = String::new();

    out.push_str(&format!(
        "routine {} [{}] id={:016x} ({} path)\n",
        descriptor.signature,
        descriptor.kind.label(),
        descriptor.operation_id,
        if plan.fast_path { "fast" } else { "general" }
    ));
    if let Some(enclosing) = &descriptor.enclosing_signature {
        out.push_str(&format!("  enclosing: {}\n", enclosing));
    }
    if !plan.extents.is_empty() {
        let labels: Vec<String> = plan
            .extents
            .iter()
            .map(|&id| env.extent_label(id))
            .collect();
        out.push_str(&format!("  extents: {}\n", labels.join(", ")));
    }
    if !plan.static_slots.is_empty() {
        out.push_str("  static slots:\n");
        for (index, slot) in plan.static_slots.iter().enumerate() {
            match slot {
                SlotInit::Global(aspect) => out.push_str(&format!(
                    "    [{}] global {}\n",
                    index,
                    env.aspect(*aspect).name
                )),
                SlotInit::OwnerType(aspect, owner) => out.push_str(&format!(
                    "    [{}] per-owner {} for {}\n",
                    index,
                    env.aspect(*aspect).name,
                    env.types.name(*owner)
                )),
            }
        }
    }
    for (label, calls) in plan.phases() {
        if calls.is_empty() {
            continue;
        }
        out.push_str(&format!("  {}:\n", label));
        for (index, call) in calls.iter().enumerate() {
            out.push_str(&format!("    [{}] {}\n", index, dump_call(env, call)));
        }
    }
    out.push_str(&format!("  invoke: {}\n", dump_invoker(plan)));
    out
}

fn dump_call(env: &Environment, call: &AdviceCall) -> String {
    let mut parts = vec![call.label.clone()];
    parts.push(format!("fetch={}", dump_fetch(&call.fetch)));
    if !call.params.is_empty() {
        let params: Vec<String> = call.params.iter().map(dump_param).collect();
        parts.push(format!("params=({})", params.join(", ")));
    }
    if let Some(guard) = &call.guard {
        parts.push(format!("guard={}", dump_guard(env, guard)));
    }
    if let Some(narrow) = call.narrowing {
        parts.push(format!("narrowed-to={}", env.types.name(narrow)));
    }
    parts.join("  ")
}

fn dump_fetch(fetch: &AspectFetch) -> String {
    match fetch {
        AspectFetch::Slot(index) => format!("slot({})", index),
        AspectFetch::CallerLocal { qualifier } => {
            format!("caller-local({})", display_qualifier(qualifier))
        }
        AspectFetch::CalleeLocal { qualifier } => {
            format!("callee-local({})", display_qualifier(qualifier))
        }
    }
}

fn display_qualifier(qualifier: &str) -> &str {
    if qualifier.is_empty() { "default" } else { qualifier }
}

fn dump_param(binding: &ParamBinding) -> String {
    match binding {
        ParamBinding::Arg(index) => format!("arg{}", index),
        other => other.label().to_string(),
    }
}

fn dump_guard(env: &Environment, guard: &Guard) -> String {
    match guard {
        Guard::CalleeIs(ty) => format!("callee instanceof {}", env.types.name(*ty)),
        Guard::CallerIs(ty) => format!("caller instanceof {}", env.types.name(*ty)),
        Guard::ArgIs(index, ty) => format!("arg{} instanceof {}", index, env.types.name(*ty)),
        Guard::InExtent(id) => format!("in-extent {}", env.extent_label(*id)),
        Guard::Not(inner) => format!("!({})", dump_guard(env, inner)),
        Guard::All(parts) => {
            let rendered: Vec<String> = parts.iter().map(|g| dump_guard(env, g)).collect();
            format!("({})", rendered.join(" && "))
        }
        Guard::Any(parts) => {
            let rendered: Vec<String> = parts.iter().map(|g| dump_guard(env, g)).collect();
            format!("({})", rendered.join(" || "))
        }
    }
}

fn dump_invoker(plan: &RoutinePlan) -> String {
    match &plan.invoker {
        Invoker::Method { .. } | Invoker::Constructor { .. } | Invoker::Handler => {
            plan.invoker.label().to_string()
        }
        Invoker::FieldRead | Invoker::FieldWrite => format!(
            "{} {}{}",
            plan.invoker.label(),
            plan.descriptor.signature,
            if plan.descriptor.is_static {
                " (static)"
            } else {
                ""
            }
        ),
    }
}
