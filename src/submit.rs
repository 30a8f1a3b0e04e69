//! Submission entry points.
//!
//! A submission holds up to three documents, one per [`DocumentKind`]. Each
//! present document runs through read → extract → normalize on its own; a
//! failure turns into an error section of the report and never stops the
//! other documents. The report is rendered once all documents have finished.

use crate::cache::{shared_cache, ExtractionCache};
use crate::config::{ExtractionConfig, DEFAULT_MODEL};
use crate::error::{DocExtractError, DocumentError};
use crate::output::{DocumentOutcome, DocumentResult, SubmissionOutput, SubmissionStats};
use crate::pipeline::extract::Extractor;
use crate::pipeline::input::{resolve_document, DocumentSource};
use crate::pipeline::llm::{LlmBackend, VisionBackend};
use crate::pipeline::normalize::normalize;
use crate::pipeline::render::{render_report, ReportSlot, SlotContent};
use crate::prompts::DocumentKind;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

// ── Submission ───────────────────────────────────────────────────────────────

/// Up to three documents bound to their slots.
///
/// # Example
/// ```rust
/// use edgequake_docextract::{DocumentKind, DocumentSource, Submission};
///
/// let submission = Submission::new()
///     .identity(DocumentSource::parse("scans/id.jpg"))
///     .upper_secondary(DocumentSource::parse("https://example.com/12th.png"));
///
/// assert_eq!(submission.len(), 2);
/// assert_eq!(submission.missing(), vec![DocumentKind::LowerSecondaryRecord]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Submission {
    identity: Option<DocumentSource>,
    lower_secondary: Option<DocumentSource>,
    upper_secondary: Option<DocumentSource>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(self, source: DocumentSource) -> Self {
        self.with(DocumentKind::Identity, source)
    }

    pub fn lower_secondary(self, source: DocumentSource) -> Self {
        self.with(DocumentKind::LowerSecondaryRecord, source)
    }

    pub fn upper_secondary(self, source: DocumentSource) -> Self {
        self.with(DocumentKind::UpperSecondaryRecord, source)
    }

    /// Put `source` into the slot for `kind`, replacing what was there.
    pub fn with(mut self, kind: DocumentKind, source: DocumentSource) -> Self {
        *self.slot_mut(kind) = Some(source);
        self
    }

    pub fn source(&self, kind: DocumentKind) -> Option<&DocumentSource> {
        match kind {
            DocumentKind::Identity => self.identity.as_ref(),
            DocumentKind::LowerSecondaryRecord => self.lower_secondary.as_ref(),
            DocumentKind::UpperSecondaryRecord => self.upper_secondary.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: DocumentKind) -> &mut Option<DocumentSource> {
        match kind {
            DocumentKind::Identity => &mut self.identity,
            DocumentKind::LowerSecondaryRecord => &mut self.lower_secondary,
            DocumentKind::UpperSecondaryRecord => &mut self.upper_secondary,
        }
    }

    /// Every slot in report order, present or not.
    pub fn slots(&self) -> impl Iterator<Item = (DocumentKind, Option<&DocumentSource>)> {
        DocumentKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.source(kind)))
    }

    /// Number of documents present.
    pub fn len(&self) -> usize {
        self.slots().filter(|(_, s)| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kinds without a document, in report order.
    pub fn missing(&self) -> Vec<DocumentKind> {
        self.slots()
            .filter(|(_, s)| s.is_none())
            .map(|(kind, _)| kind)
            .collect()
    }

    /// Fail unless all three documents are present.
    pub fn require_complete(&self) -> Result<(), DocExtractError> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DocExtractError::Validation {
                missing: missing.iter().map(|k| k.title().to_string()).collect(),
            })
        }
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// A configured extraction pipeline.
///
/// Resolves the backend and the cache once. Unless the config supplies its
/// own cache, every pipeline in the process shares [`shared_cache`], so
/// re-submitted documents are served from the cache across pipelines.
pub struct DocumentPipeline {
    extractor: Extractor,
    config: ExtractionConfig,
}

impl DocumentPipeline {
    /// Resolve the backend and cache described by `config`.
    pub async fn new(config: ExtractionConfig) -> Result<Self, DocExtractError> {
        let backend = resolve_backend(&config).await?;
        let cache: Arc<dyn ExtractionCache> = match &config.cache {
            Some(cache) => Arc::clone(cache),
            None => shared_cache(),
        };
        let extractor = Extractor::new(
            backend,
            cache,
            config.cache_ttl(),
            config.api_timeout(),
        );
        Ok(Self { extractor, config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Process every document of `submission` and render the report.
    ///
    /// # Returns
    /// `Ok(SubmissionOutput)` even when some documents failed; their errors
    /// are in `output.documents` and in the report.
    ///
    /// # Errors
    /// Returns `Err(DocExtractError)` only for fatal errors:
    /// - the submission holds no documents
    /// - the report could not be rendered
    pub async fn process(
        &self,
        submission: &Submission,
    ) -> Result<SubmissionOutput, DocExtractError> {
        let total_start = Instant::now();
        let total = submission.len();
        if total == 0 {
            return Err(DocExtractError::EmptySubmission);
        }
        info!(
            "Starting submission: {} document(s), {} mode",
            total,
            if self.config.sequential { "sequential" } else { "concurrent" }
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_submission_start(total);
        }

        // ── Step 1: Extract every present document ───────────────────────
        let extraction_start = Instant::now();
        let documents = if self.config.sequential {
            let mut results = Vec::with_capacity(DocumentKind::ALL.len());
            for (kind, source) in submission.slots() {
                results.push(self.process_slot(kind, source).await);
            }
            results
        } else {
            join_all(
                submission
                    .slots()
                    .map(|(kind, source)| self.process_slot(kind, source)),
            )
            .await
        };
        let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

        // ── Step 2: Render the report ────────────────────────────────────
        let render_start = Instant::now();
        let slots: Vec<ReportSlot> = documents.iter().map(report_slot).collect();
        let report = render_report(&slots)?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;

        // ── Step 3: Stats ────────────────────────────────────────────────
        let mut stats = SubmissionStats {
            extraction_duration_ms,
            render_duration_ms,
            ..Default::default()
        };
        for d in &documents {
            match d.outcome {
                DocumentOutcome::Extracted { .. } => stats.extracted_documents += 1,
                DocumentOutcome::Failed(_) => stats.failed_documents += 1,
                DocumentOutcome::Skipped => stats.skipped_documents += 1,
            }
            stats.cache_hits += usize::from(d.cached);
            stats.total_input_tokens += d.input_tokens as u64;
            stats.total_output_tokens += d.output_tokens as u64;
        }
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Submission complete: {}/{} documents extracted, {} from cache, \
             {} report page(s), {}ms total",
            stats.extracted_documents,
            total,
            stats.cache_hits,
            report.page_count,
            stats.total_duration_ms
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_submission_complete(total, stats.extracted_documents);
        }

        Ok(SubmissionOutput {
            documents,
            report,
            stats,
        })
    }

    /// Run one slot; an absent document yields a skipped result.
    async fn process_slot(
        &self,
        kind: DocumentKind,
        source: Option<&DocumentSource>,
    ) -> DocumentResult {
        let start = Instant::now();
        let mut result = DocumentResult {
            kind,
            title: kind.title().to_string(),
            outcome: DocumentOutcome::Skipped,
            cached: false,
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
        };
        let Some(source) = source else {
            debug!("{}: no document submitted", kind);
            return result;
        };

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_start(kind);
        }

        match self.extract_one(kind, source, &mut result).await {
            Ok(outcome) => {
                if let (Some(cb), DocumentOutcome::Extracted { normalized, .. }) =
                    (&self.config.progress_callback, &outcome)
                {
                    cb.on_document_complete(kind, normalized.field_count());
                }
                result.outcome = outcome;
            }
            Err(e) => {
                warn!("{}", e);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_document_error(kind, &e.to_string());
                }
                result.outcome = DocumentOutcome::Failed(e);
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    async fn extract_one(
        &self,
        kind: DocumentKind,
        source: &DocumentSource,
        result: &mut DocumentResult,
    ) -> Result<DocumentOutcome, DocumentError> {
        let document = resolve_document(kind, source, self.config.download_timeout_secs).await?;
        let extraction = self
            .extractor
            .extract_detailed(&document, kind.instruction())
            .await?;
        result.cached = extraction.cached;
        result.input_tokens = extraction.input_tokens;
        result.output_tokens = extraction.output_tokens;

        if let Some(reason) = extraction.record.invalid_document_reason() {
            return Err(DocumentError::InvalidDocument { kind, reason });
        }

        let normalized = normalize(&extraction.record);
        Ok(DocumentOutcome::Extracted {
            raw: extraction.record,
            normalized,
        })
    }
}

/// What the report shows for one document result.
fn report_slot(result: &DocumentResult) -> ReportSlot {
    let content = match &result.outcome {
        DocumentOutcome::Skipped => SlotContent::Empty,
        DocumentOutcome::Failed(e) => SlotContent::Failed(e.to_string()),
        DocumentOutcome::Extracted { normalized, .. } => SlotContent::Record(normalized.clone()),
    };
    ReportSlot::new(result.title.clone(), content)
}

// ── Free functions ───────────────────────────────────────────────────────────

/// Process a submission with a pipeline built from `config`.
///
/// Builds a fresh pipeline on each call. Unless `config.cache` is set it
/// uses the process-wide cache, so repeated calls with the same documents
/// are served from the cache.
pub async fn process_submission(
    submission: &Submission,
    config: &ExtractionConfig,
) -> Result<SubmissionOutput, DocExtractError> {
    DocumentPipeline::new(config.clone())
        .await?
        .process(submission)
        .await
}

/// Synchronous wrapper around [`process_submission`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_submission_sync(
    submission: &Submission,
    config: &ExtractionConfig,
) -> Result<SubmissionOutput, DocExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_submission(submission, config))
}

/// Process a submission and write the report PDF to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn process_to_file(
    submission: &Submission,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<SubmissionOutput, DocExtractError> {
    let output = process_submission(submission, config).await?;
    write_report(&output.report.bytes, output_path.as_ref()).await?;
    Ok(output)
}

/// Write report bytes to `path` atomically.
pub async fn write_report(bytes: &[u8], path: &Path) -> Result<(), DocExtractError> {
    let write_error = |source: std::io::Error| DocExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_error)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_error)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Provider resolution ──────────────────────────────────────────────────────

async fn resolve_backend(
    config: &ExtractionConfig,
) -> Result<Arc<dyn VisionBackend>, DocExtractError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }
    let provider = resolve_provider(config).await?;
    debug!(
        "Provider resolved (name: {:?}, model: {:?})",
        config.provider_name, config.model
    );
    Ok(Arc::new(LlmBackend::new(provider, config)))
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, DocExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DocExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`), whose API key is
///    read from the environment by [`ProviderFactory::create_llm_provider`].
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured only when both are set.
/// 4. **OpenAI key** (`OPENAI_API_KEY`), with the configured or default model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
async fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn LLMProvider>, DocExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DocExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
