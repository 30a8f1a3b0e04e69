//! Error types for the edgequake-docextract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocExtractError`] — **Fatal**: the submission cannot proceed at all
//!   (required documents missing, provider not configured, report could not
//!   be written). Returned as `Err(DocExtractError)` from the top-level
//!   `process*` functions.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (unreadable
//!   file, provider error, reply that is not JSON) but its siblings are fine.
//!   Stored inside [`crate::output::DocumentResult`] and rendered as an error
//!   section of the report instead of aborting the whole submission.

use crate::prompts::DocumentKind;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-docextract library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DocExtractError {
    // ── Submission errors ─────────────────────────────────────────────────
    /// The submission lacks documents the caller marked as required.
    #[error("Submission is missing required documents: {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    /// The submission contains no documents at all.
    #[error("Submission contains no documents")]
    EmptySubmission,

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Report errors ─────────────────────────────────────────────────────
    /// The PDF report could not be serialised.
    #[error("Failed to render report: {detail}")]
    RenderFailed { detail: String },

    /// Could not create or write the output report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// The submission continues with the remaining documents; the report shows
/// the message of this error in place of the extracted fields.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The document could not be read from disk or downloaded.
    #[error("{kind}: could not read '{origin}': {detail}")]
    Read {
        kind: DocumentKind,
        origin: String,
        detail: String,
    },

    /// The vision model call failed or timed out.
    #[error("{kind}: extraction service failed: {detail}")]
    ExternalService { kind: DocumentKind, detail: String },

    /// The model replied, but not with a JSON object.
    #[error("{kind}: model reply is not valid JSON: {detail}")]
    ExtractionFormat { kind: DocumentKind, detail: String },

    /// The model reported that the image is not a document of this kind.
    #[error("{kind}: document not recognised: {reason}")]
    InvalidDocument { kind: DocumentKind, reason: String },
}

impl DocumentError {
    /// The document slot this error belongs to.
    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentError::Read { kind, .. }
            | DocumentError::ExternalService { kind, .. }
            | DocumentError::ExtractionFormat { kind, .. }
            | DocumentError::InvalidDocument { kind, .. } => *kind,
        }
    }
}

/// Failure reported by a [`crate::pipeline::llm::VisionBackend`].
///
/// Kept free of document context; the extractor attaches the
/// [`DocumentKind`] when it converts this into a [`DocumentError`].
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);
