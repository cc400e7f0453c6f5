//! Progress reporting for batch runs.
//!
//! The batch controller emits lifecycle events through
//! [`BatchProgressCallback`]. All methods have no-op defaults, so an
//! implementation overrides only what it cares about. The CLI uses this to
//! drive a progress bar; library embedders can forward events to a UI.

use std::sync::Arc;

/// Observer for batch run lifecycle events.
///
/// Callbacks run on the batch controller's task, between items; keep them
/// cheap. `index` is zero-based within the run's selection, `total` is the
/// number of items selected for the run.
pub trait BatchProgressCallback: Send + Sync {
    /// A run over `total` items is starting.
    fn on_run_start(&self, total: usize) {
        let _ = total;
    }

    /// Item `index` is about to be converted.
    fn on_item_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Item `index` converted successfully.
    fn on_item_done(&self, index: usize, total: usize, name: &str, markdown_len: usize) {
        let _ = (index, total, name, markdown_len);
    }

    /// Item `index` failed; the item stays in the batch for retry.
    fn on_item_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// The run finished; `converted` of `total` items succeeded.
    fn on_run_complete(&self, total: usize, converted: usize) {
        let _ = (total, converted);
    }
}

/// Shared handle to a progress observer.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// Callback that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBatchCallback;

impl BatchProgressCallback for NoopBatchCallback {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCallback {
        starts: AtomicUsize,
        dones: AtomicUsize,
        errors: AtomicUsize,
    }

    impl BatchProgressCallback for CountingCallback {
        fn on_item_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_done(&self, _index: usize, _total: usize, _name: &str, _len: usize) {
            self.dones.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_accepts_every_event() {
        let cb = NoopBatchCallback;
        cb.on_run_start(3);
        cb.on_item_start(0, 3, "a.docx");
        cb.on_item_done(0, 3, "a.docx", 120);
        cb.on_item_error(1, 3, "b.pdf", "boom");
        cb.on_run_complete(3, 2);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let cb = CountingCallback::default();
        cb.on_item_start(0, 2, "a.docx");
        cb.on_item_done(0, 2, "a.docx", 10);
        cb.on_item_start(1, 2, "b.pdf");
        cb.on_item_error(1, 2, "b.pdf", "bad bytes");
        cb.on_run_complete(2, 1);

        assert_eq!(cb.starts.load(Ordering::SeqCst), 2);
        assert_eq!(cb.dones.load(Ordering::SeqCst), 1);
        assert_eq!(cb.errors.load(Ordering::SeqCst), 1);
    }
}
