//! Callback delivery context.
//!
//! Authorization outcomes must reach the host from a single, consistent
//! execution context so callback code can touch UI state without extra
//! locking. The host designates that context once, at flow construction, by
//! injecting a [`CallbackDispatcher`].

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Delivers outcome callbacks on the host-designated execution context.
///
/// Implementations must run every dispatched task on the same context (a UI
/// event loop, a dedicated actor, a single-threaded runtime) and must run it
/// exactly once.
pub trait CallbackDispatcher: Send + Sync {
    fn dispatch(&self, task: Callback);
}

/// Runs callbacks immediately on the calling task.
///
/// The right choice for plain async hosts and tests, where the caller's
/// context already is the completion context.
pub struct InlineDispatcher;

impl CallbackDispatcher for InlineDispatcher {
    fn dispatch(&self, task: Callback) {
        task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_inline_dispatcher_runs_task_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let captured = count.clone();

        InlineDispatcher.dispatch(Box::new(move || {
            captured.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
