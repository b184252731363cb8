//! Progress-callback trait for per-item batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the renderer works through the payloads. The CLI uses it to drive an
//! `indicatif` progress bar; a server could forward the same events to a
//! websocket.
//!
//! # Example
//!
//! ```rust
//! use barcode_batch::{BatchProgressCallback, BatchConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_item_error(&self, position: usize, total: usize, error: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("#{position}/{total}: {error}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { failed: AtomicUsize::new(0) });
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the renderer as it processes each payload.
///
/// Positions are 1-indexed. With `concurrency > 1` the item methods may be
/// called concurrently from blocking-pool threads and out of order, so
/// implementations must synchronise any shared state.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first payload is encoded.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a payload is handed to the encoder.
    fn on_item_start(&self, position: usize, total: usize) {
        let _ = (position, total);
    }

    /// Called when a payload encoded successfully.
    ///
    /// `png_len` is the size of the produced image in bytes.
    fn on_item_complete(&self, position: usize, total: usize, png_len: usize) {
        let _ = (position, total, png_len);
    }

    /// Called when a payload failed to encode.
    fn on_item_error(&self, position: usize, total: usize, error: &str) {
        let _ = (position, total, error);
    }

    /// Called once after every payload has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        batch_total: AtomicUsize,
        batch_success: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total: usize) {
            self.batch_total.store(total, Ordering::SeqCst);
        }

        fn on_item_start(&self, _position: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _position: usize, _total: usize, _png_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _position: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.batch_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(5);
        cb.on_item_start(1, 5);
        cb.on_item_complete(1, 5, 42);
        cb.on_item_error(2, 5, "bad checksum");
        cb.on_batch_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        tracker.on_item_start(1, 3);
        tracker.on_item_complete(1, 3, 100);
        tracker.on_item_start(2, 3);
        tracker.on_item_error(2, 3, "EAN13 expects 12 or 13 digits");
        tracker.on_item_start(3, 3);
        tracker.on_item_complete(3, 3, 120);
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.batch_success.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_item_start(1, 10);
        cb.on_item_complete(1, 10, 512);
    }
}
