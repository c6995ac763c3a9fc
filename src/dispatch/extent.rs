//! Thread-local depth counters for dynamic extents.
//!
//! A dynamic extent ("currently executing within operation X") is a
//! property of one call stack, so depths live in a thread-local table.
//! Activation is a nonzero test; the engine never searches a call stack.

use std::cell::RefCell;
use std::collections::HashMap;

/// Identity of a declared dynamic extent, assigned at aspect registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtentId(pub u32);

thread_local! {
    static DEPTHS: RefCell<HashMap<ExtentId, u32>> = RefCell::new(HashMap::new());
}

/// Enter a boundary operation of the extent.
pub fn enter(id: ExtentId) {
    DEPTHS.with(|depths| {
        *depths.borrow_mut().entry(id).or_insert(0) += 1;
    });
}

/// Exit a boundary operation of the extent.
pub fn exit(id: ExtentId) {
    DEPTHS.with(|depths| {
        let mut depths = depths.borrow_mut();
        if let Some(depth) = depths.get_mut(&id) {
            *depth -= 1;
            if *depth == 0 {
                depths.remove(&id);
            }
        }
    });
}

/// True while at least one boundary operation of the extent is in progress
/// on this thread.
pub fn active(id: ExtentId) -> bool {
    DEPTHS.with(|depths| depths.borrow().contains_key(&id))
}
