//! Per-thread context publishing the msg-id and method-name of whatever call is
//! currently being dispatched on this thread, so log lines emitted from inside a
//! handler can be attributed to the call that produced them.

use std::cell::RefCell;

#[derive(Default, Clone)]
struct RuntimeContext {
    msg_id: String,
    method_name: String,
}

thread_local! {
    static CONTEXT: RefCell<RuntimeContext> = RefCell::new(RuntimeContext::default());
}

/// Publishes `msg_id`/`method_name` for the duration of the calling thread's current
/// handler invocation. Called by the dispatcher immediately before running a handler.
pub fn set_current(msg_id: &str, method_name: &str) {
    CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        ctx.msg_id.clear();
        ctx.msg_id.push_str(msg_id);
        ctx.method_name.clear();
        ctx.method_name.push_str(method_name);
    });
}

/// Clears the current thread's context once a handler invocation completes.
pub fn clear_current() {
    CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        ctx.msg_id.clear();
        ctx.method_name.clear();
    });
}

/// The msg-id published by the most recent [`set_current`] on this thread, or empty if
/// no call is currently being dispatched.
pub fn current_msg_id() -> String {
    CONTEXT.with(|ctx| ctx.borrow().msg_id.clone())
}

/// The method name published by the most recent [`set_current`] on this thread.
pub fn current_method_name() -> String {
    CONTEXT.with(|ctx| ctx.borrow().method_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_clear_round_trips() {
        set_current("1", "Order.makeOrder");
        assert_eq!(current_msg_id(), "1");
        assert_eq!(current_method_name(), "Order.makeOrder");
        clear_current();
        assert_eq!(current_msg_id(), "");
        assert_eq!(current_method_name(), "");
    }
}
