//! # edgequake-docextract
//!
//! Extract structured fields from photographed identity documents and school
//! marksheets using Vision Language Models (VLMs), and render them into a PDF
//! report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Submission (up to 3 documents: identity, lower secondary, upper secondary)
//!  │
//!  ├─ 1. Input       read local file, download URL, or take in-memory bytes
//!  ├─ 2. Cache       blake3 fingerprint of (bytes, instruction) → cached record?
//!  ├─ 3. Encode      sniff image type, base64 ImageData
//!  ├─ 4. VLM         one JSON-only call per document, bounded by a timeout
//!  ├─ 5. Parse       strict JSON object, field order preserved
//!  ├─ 6. Normalize   main fields + optional subject/score table
//!  └─ 7. Report      paginated PDF, one section per submitted document
//! ```
//!
//! A document that fails at any step becomes an error section of the report;
//! the other documents are unaffected.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docextract::{process_to_file, DocumentSource, ExtractionConfig, Submission};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let submission = Submission::new()
//!         .identity(DocumentSource::parse("id.jpg"))
//!         .lower_secondary(DocumentSource::parse("10th.jpg"))
//!         .upper_secondary(DocumentSource::parse("12th.jpg"));
//!     submission.require_complete()?;
//!
//!     let output = process_to_file(&submission, "extracted_report.pdf", &config).await?;
//!     for error in output.errors() {
//!         eprintln!("{error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docextract` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docextract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod submit;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{shared_cache, ExtractionCache, MemoryCache};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_MODEL, MAX_CACHE_TTL_SECS};
pub use error::{DocExtractError, DocumentError, ServiceError};
pub use output::{DocumentOutcome, DocumentResult, SubmissionOutput, SubmissionStats};
pub use pipeline::extract::{Extraction, Extractor};
pub use pipeline::fingerprint::{fingerprint, Fingerprint};
pub use pipeline::input::{DocumentInput, DocumentSource};
pub use pipeline::llm::{LlmBackend, VisionBackend, VisionReply, VisionRequest};
pub use pipeline::normalize::normalize;
pub use pipeline::render::{
    render_report, RenderedSection, ReportArtifact, ReportSlot, SlotContent, REPORT_FILENAME,
    REPORT_MEDIA_TYPE,
};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::DocumentKind;
pub use record::{NormalizedRecord, RawRecord, RawValue};
pub use submit::{
    process_submission, process_submission_sync, process_to_file, write_report, DocumentPipeline,
    Submission,
};
