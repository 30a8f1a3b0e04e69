//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline processes each document of a submission.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docextract::{DocumentKind, ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, kind: DocumentKind, field_count: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{kind}: {field_count} fields");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::prompts::DocumentKind;
use std::sync::Arc;

/// Called by the submission driver as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// Unless `sequential` is set, the per-document methods may be called
/// concurrently. Protect shared mutable state with `Mutex` or atomics.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before any document is read.
    ///
    /// # Arguments
    /// * `total_documents` — number of documents present in the submission
    fn on_submission_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document is read and sent for extraction.
    fn on_document_start(&self, kind: DocumentKind) {
        let _ = kind;
    }

    /// Called when a document was extracted.
    ///
    /// # Arguments
    /// * `field_count` — main fields plus subject rows of the normalized record
    fn on_document_complete(&self, kind: DocumentKind, field_count: usize) {
        let _ = (kind, field_count);
    }

    /// Called when a document failed. `error` is the message shown in the report.
    fn on_document_error(&self, kind: DocumentKind, error: &str) {
        let _ = (kind, error);
    }

    /// Called once after every document has been attempted.
    fn on_submission_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
