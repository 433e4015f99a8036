//! Progress callbacks for document ingestion.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::ChatConfigBuilder::progress_callback`] to hear about each
//! upload as the service extracts it. The CLI drives its spinner from these
//! events; a library caller could forward them to a channel instead.
//!
//! # Example
//!
//! ```rust
//! use doc2chat::{ChatConfig, IngestProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl IngestProgressCallback for Counter {
//!     fn on_file_complete(&self, _index: usize, _total: usize, _name: &str, _chars: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ChatConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the chat service while it ingests uploads.
///
/// Files are processed one at a time in upload order, so calls never overlap
/// for a single service. All methods default to no-ops.
pub trait IngestProgressCallback: Send + Sync {
    /// Called once before the first file of a batch.
    fn on_ingest_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a file is handed to its extractor.
    ///
    /// # Arguments
    /// * `index`: 1-based position in the batch
    /// * `total`: batch size
    /// * `name`: upload file name
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when extraction finished, whatever the outcome.
    ///
    /// `chars` is the length of the extracted text (0 for empty, unsupported
    /// or failed files).
    fn on_file_complete(&self, index: usize, total: usize, name: &str, chars: usize) {
        let _ = (index, total, name, chars);
    }

    /// Called instead of start/complete when the name was already ingested.
    fn on_file_duplicate(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called once after the batch.
    ///
    /// `extracted` counts files whose extraction produced text.
    fn on_ingest_complete(&self, total: usize, extracted: usize) {
        let _ = (total, extracted);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ChatConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
