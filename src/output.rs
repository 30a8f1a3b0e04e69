//! Result types returned by the submission driver.

use crate::error::DocumentError;
use crate::pipeline::render::ReportArtifact;
use crate::prompts::DocumentKind;
use crate::record::{NormalizedRecord, RawRecord};
use serde::Serialize;

/// Everything a processed submission produced.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutput {
    /// One entry per slot, in [`DocumentKind::ALL`] order.
    pub documents: Vec<DocumentResult>,
    /// The rendered report. Its PDF bytes are not serialised.
    pub report: ReportArtifact,
    pub stats: SubmissionStats,
}

impl SubmissionOutput {
    /// The result for one slot.
    pub fn document(&self, kind: DocumentKind) -> Option<&DocumentResult> {
        self.documents.iter().find(|d| d.kind == kind)
    }

    /// Per-document failures, in slot order.
    pub fn errors(&self) -> impl Iterator<Item = &DocumentError> {
        self.documents.iter().filter_map(|d| match &d.outcome {
            DocumentOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }
}

/// Outcome for a single slot of the submission.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub kind: DocumentKind,
    /// Section title used in the report.
    pub title: String,
    pub outcome: DocumentOutcome,
    /// True when the record came from the cache instead of a model call.
    pub cached: bool,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

impl DocumentResult {
    pub fn is_extracted(&self) -> bool {
        matches!(self.outcome, DocumentOutcome::Extracted { .. })
    }

    pub fn error(&self) -> Option<&DocumentError> {
        match &self.outcome {
            DocumentOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// No document was submitted for this slot.
    Skipped,
    Failed(DocumentError),
    Extracted {
        raw: RawRecord,
        normalized: NormalizedRecord,
    },
}

/// Counters and timings for one submission.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionStats {
    pub extracted_documents: usize,
    pub failed_documents: usize,
    pub skipped_documents: usize,
    pub cache_hits: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub extraction_duration_ms: u64,
    pub render_duration_ms: u64,
}
