use std::sync::{Arc, Mutex};

use crate::track::footprint::ItemId;

// ============================================================================
// Running-item context stack — log attribution for nested, re-entrant opens
// ============================================================================

/// Shared cell holding the id of the item logs should currently attach to.
///
/// The log side channel holds a clone of this handle and reads it at emit
/// time; the owning thread's stack is the only writer.
#[derive(Debug, Clone, Default)]
pub struct CurrentItemSlot {
    inner: Arc<Mutex<Option<ItemId>>>,
}

impl CurrentItemSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ItemId> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, id: Option<ItemId>) {
        match self.inner.lock() {
            Ok(mut guard) => *guard = id,
            Err(poisoned) => *poisoned.into_inner() = id,
        }
    }
}

/// Per-thread LIFO of currently-open item ids.
///
/// Every open pushes; every close pops exactly one level. When a child
/// closes while its parent is still open, the parent's id is republished to
/// the slot instead of being cleared — a log emitted inside the still-open
/// parent must land on the parent, not on nothing and not on the closed
/// child.
#[derive(Debug, Default)]
pub struct RunningContextStack {
    stack: Vec<ItemId>,
    slot: CurrentItemSlot,
}

impl RunningContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the log side channel.
    pub fn slot(&self) -> CurrentItemSlot {
        self.slot.clone()
    }

    /// A node opened: push unconditionally and publish it as current.
    pub fn push(&mut self, id: ItemId) {
        self.slot.set(Some(id.clone()));
        self.stack.push(id);
    }

    /// A node closed: pop one level, then republish the new top, or
    /// publish "no running item" when the stack drained.
    pub fn clear_top(&mut self) -> Option<ItemId> {
        let closed = self.stack.pop();
        self.slot.set(self.stack.last().cloned());
        closed
    }

    /// Id of the innermost open item.
    pub fn top(&self) -> Option<&ItemId> {
        self.stack.last()
    }

    /// What the side channel currently sees as the running item.
    pub fn current_item(&self) -> Option<ItemId> {
        self.slot.get()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Everything the orchestrator needs to know about the calling execution
/// thread, constructed once per test thread and passed through every call.
/// Keeps per-thread state explicit instead of hiding it in thread-local
/// statics.
#[derive(Debug)]
pub struct ThreadContext {
    /// Opaque key naming this execution thread; the event source picks it
    pub thread: String,

    pub stack: RunningContextStack,
}

impl ThreadContext {
    pub fn new(thread: &str) -> Self {
        Self {
            thread: thread.to_string(),
            stack: RunningContextStack::new(),
        }
    }
}
