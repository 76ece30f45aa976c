use launch_reporter::track::footprint::ItemId;
use launch_reporter::track::running::{RunningContextStack, ThreadContext};

// =========================================================================
// Push / clear_top discipline
// =========================================================================

#[test]
fn push_publishes_the_opened_item() {
    let mut stack = RunningContextStack::new();
    stack.push(ItemId::new("suite-1"));

    assert_eq!(stack.current_item(), Some(ItemId::new("suite-1")));
    assert_eq!(stack.depth(), 1);
}

#[test]
fn closing_a_child_republishes_the_parent() {
    let mut stack = RunningContextStack::new();
    stack.push(ItemId::new("parent"));
    stack.push(ItemId::new("child"));

    let closed = stack.clear_top();

    assert_eq!(closed, Some(ItemId::new("child")));
    // A log emitted now must land on the still-open parent.
    assert_eq!(stack.current_item(), Some(ItemId::new("parent")));
    assert_eq!(stack.top(), Some(&ItemId::new("parent")));
}

#[test]
fn draining_the_stack_publishes_no_running_item() {
    let mut stack = RunningContextStack::new();
    stack.push(ItemId::new("suite-1"));
    stack.clear_top();

    assert_eq!(stack.current_item(), None);
    assert!(stack.is_empty());
}

#[test]
fn clear_top_pops_exactly_one_level() {
    let mut stack = RunningContextStack::new();
    stack.push(ItemId::new("suite"));
    stack.push(ItemId::new("example"));
    stack.push(ItemId::new("fixture"));

    stack.clear_top();
    assert_eq!(stack.depth(), 2);
    assert_eq!(stack.current_item(), Some(ItemId::new("example")));

    stack.clear_top();
    assert_eq!(stack.depth(), 1);
    assert_eq!(stack.current_item(), Some(ItemId::new("suite")));
}

#[test]
fn clear_top_on_empty_stack_is_harmless() {
    let mut stack = RunningContextStack::new();
    assert_eq!(stack.clear_top(), None);
    assert_eq!(stack.current_item(), None);
}

#[test]
fn balanced_sequence_with_nested_child_restores_each_parent() {
    let mut stack = RunningContextStack::new();

    stack.push(ItemId::new("suite"));
    stack.push(ItemId::new("example-0"));

    // Fixture opens and closes inside the still-open example.
    stack.push(ItemId::new("fixture"));
    stack.clear_top();
    assert_eq!(stack.current_item(), Some(ItemId::new("example-0")));

    stack.clear_top();
    assert_eq!(stack.current_item(), Some(ItemId::new("suite")));

    stack.clear_top();
    assert_eq!(stack.current_item(), None);
}

// =========================================================================
// Side-channel slot
// =========================================================================

#[test]
fn slot_handle_observes_later_updates() {
    let mut stack = RunningContextStack::new();
    let slot = stack.slot();

    assert_eq!(slot.get(), None);
    stack.push(ItemId::new("suite-1"));
    assert_eq!(slot.get(), Some(ItemId::new("suite-1")));
    stack.clear_top();
    assert_eq!(slot.get(), None);
}

#[test]
fn thread_context_carries_its_own_stack() {
    let mut ctx = ThreadContext::new("worker-1");
    assert_eq!(ctx.thread, "worker-1");

    ctx.stack.push(ItemId::new("suite-1"));
    let other = ThreadContext::new("worker-2");
    assert_eq!(other.stack.current_item(), None);
    assert_eq!(ctx.stack.current_item(), Some(ItemId::new("suite-1")));
}
