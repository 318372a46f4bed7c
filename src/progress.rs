//! Progress-callback trait for per-request submission events.
//!
//! Inject an [`Arc<dyn SubmissionProgressCallback>`] via
//! [`crate::config::AskConfigBuilder::progress_callback`] to drive a spinner
//! or progress indicator in whatever front end hosts the pipeline.
//!
//! # Example
//!
//! ```rust
//! use pdfask::{AskConfig, SubmissionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl SubmissionProgressCallback for CountingCallback {
//!     fn on_request_complete(&self, seq: usize, total: usize, answer_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("request {}/{} answered ({} bytes)", seq, total, answer_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = AskConfig::builder()
//!     .progress_callback(counter as Arc<dyn SubmissionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it issues each model request.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the
/// per-page pattern reports from several tasks at once. All methods have
/// no-op defaults.
///
/// `seq` is the 1-based position of the request in the submission. In the
/// batched pattern there is exactly one request.
pub trait SubmissionProgressCallback: Send + Sync {
    /// Called once after rasterisation, before any request is sent.
    fn on_submission_start(&self, total_requests: usize) {
        let _ = total_requests;
    }

    /// Called just before a request is sent.
    fn on_request_start(&self, seq: usize, total_requests: usize) {
        let _ = (seq, total_requests);
    }

    /// Called when a request returns an answer.
    fn on_request_complete(&self, seq: usize, total_requests: usize, answer_len: usize) {
        let _ = (seq, total_requests, answer_len);
    }

    /// Called when a request ends in any failure state.
    fn on_request_error(&self, seq: usize, total_requests: usize, error: &str) {
        let _ = (seq, total_requests, error);
    }

    /// Called once after every request has finished.
    fn on_submission_complete(&self, total_requests: usize, success_count: usize) {
        let _ = (total_requests, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SubmissionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AskConfig`].
pub type ProgressCallback = Arc<dyn SubmissionProgressCallback>;
