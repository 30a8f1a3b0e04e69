//! Submission-level tests against an in-process vision backend.
//!
//! No network and no API key: the fake backend answers by looking at which
//! extraction instruction the prompt starts with.

use async_trait::async_trait;
use edgequake_docextract::prompts::{
    IDENTITY_INSTRUCTION, LOWER_SECONDARY_INSTRUCTION, UPPER_SECONDARY_INSTRUCTION,
};
use edgequake_docextract::{
    process_submission, process_submission_sync, process_to_file, DocExtractError,
    DocumentError, DocumentKind, DocumentOutcome, DocumentPipeline, DocumentSource,
    ExtractionConfig, ExtractionProgressCallback, MemoryCache, RawValue, RenderedSection,
    ServiceError, Submission, VisionBackend, VisionReply, VisionRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const IDENTITY_REPLY: &str = r#"{"Full Name": "Asha Rao", "Father's Name": "N/A", "Date of Birth": "01/02/2005", "Gender": "Female"}"#;
const LOWER_REPLY: &str = r#"{"Seat Number": "B1234", "Year of Passing": 2021, "Subjects": {"Mathematics": 90, "Science": 85}, "Percentage": "87.5"}"#;
const UPPER_REPLY: &str = "```json\n{\"Stream\": \"Science\", \"Seat Number\": \"C77\", \"Subjects\": {\"Physics\": 81, \"Chemistry\": 79}}\n```";

/// Canned replies per document kind, with a call counter.
struct FakeBackend {
    identity: String,
    lower: String,
    upper: String,
    calls: AtomicUsize,
}

impl FakeBackend {
    fn new(identity: &str, lower: &str, upper: &str) -> Arc<Self> {
        Arc::new(Self {
            identity: identity.to_string(),
            lower: lower.to_string(),
            upper: upper.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn happy() -> Arc<Self> {
        Self::new(IDENTITY_REPLY, LOWER_REPLY, UPPER_REPLY)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionBackend for FakeBackend {
    async fn complete(&self, request: VisionRequest) -> Result<VisionReply, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = if request.prompt.starts_with(IDENTITY_INSTRUCTION) {
            &self.identity
        } else if request.prompt.starts_with(LOWER_SECONDARY_INSTRUCTION) {
            &self.lower
        } else if request.prompt.starts_with(UPPER_SECONDARY_INSTRUCTION) {
            &self.upper
        } else {
            return Err(ServiceError("unknown instruction".into()));
        };
        Ok(VisionReply {
            content: content.clone(),
            input_tokens: 1000,
            output_tokens: 50,
        })
    }
}

fn image(tag: u8) -> DocumentSource {
    DocumentSource::Bytes {
        filename: format!("doc-{tag}.jpg"),
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, tag, tag, tag],
    }
}

fn full_submission() -> Submission {
    Submission::new()
        .identity(image(1))
        .lower_secondary(image(2))
        .upper_secondary(image(3))
}

/// A cache private to one test; the process-wide default is shared by every
/// test in this binary.
fn fresh_cache() -> Arc<MemoryCache> {
    Arc::new(MemoryCache::new())
}

fn config_with(backend: Arc<FakeBackend>) -> ExtractionConfig {
    ExtractionConfig::builder()
        .backend(backend)
        .cache(fresh_cache())
        .build()
        .expect("valid config")
}

async fn pipeline(backend: Arc<FakeBackend>) -> DocumentPipeline {
    DocumentPipeline::new(config_with(backend))
        .await
        .expect("pipeline")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_three_documents_extracted() {
    let backend = FakeBackend::happy();
    let output = pipeline(backend.clone())
        .await
        .process(&full_submission())
        .await
        .expect("process");

    assert_eq!(backend.calls(), 3);
    assert_eq!(output.stats.extracted_documents, 3);
    assert_eq!(output.stats.failed_documents, 0);
    assert_eq!(output.stats.total_input_tokens, 3000);
    assert_eq!(output.report.sections.len(), 3);
    assert!(output.report.bytes.starts_with(b"%PDF"));

    let lower = output
        .document(DocumentKind::LowerSecondaryRecord)
        .expect("lower result");
    match &lower.outcome {
        DocumentOutcome::Extracted { normalized, .. } => {
            let fields: Vec<&str> = normalized.main.iter().map(|(f, _)| f.as_str()).collect();
            assert_eq!(fields, vec!["Seat Number", "Year of Passing", "Percentage"]);
            assert_eq!(
                normalized.subjects.as_deref(),
                Some(
                    &[
                        ("Mathematics".to_string(), RawValue::from(90i64)),
                        ("Science".to_string(), RawValue::from(85i64)),
                    ][..]
                )
            );
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn one_format_failure_does_not_abort_siblings() {
    let backend = FakeBackend::new(IDENTITY_REPLY, "Sorry, I can't read that.", UPPER_REPLY);
    let output = pipeline(backend)
        .await
        .process(&full_submission())
        .await
        .expect("process");

    assert_eq!(output.report.sections.len(), 3);
    let errors: Vec<&RenderedSection> = output
        .report
        .sections
        .iter()
        .filter(|s| s.is_error())
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title(), "Lower Secondary Marksheet");

    assert_eq!(output.stats.extracted_documents, 2);
    assert_eq!(output.stats.failed_documents, 1);
    assert!(matches!(
        output.errors().next(),
        Some(DocumentError::ExtractionFormat {
            kind: DocumentKind::LowerSecondaryRecord,
            ..
        })
    ));
}

#[tokio::test]
async fn missing_slots_are_skipped() {
    let backend = FakeBackend::happy();
    let submission = Submission::new().upper_secondary(image(3));
    let output = pipeline(backend.clone())
        .await
        .process(&submission)
        .await
        .expect("process");

    assert_eq!(backend.calls(), 1);
    assert_eq!(output.documents.len(), 3);
    assert_eq!(output.stats.skipped_documents, 2);
    assert_eq!(output.report.sections.len(), 1);
    assert_eq!(output.report.sections[0].title(), "Upper Secondary Marksheet");
}

#[tokio::test]
async fn resubmission_is_served_from_cache() {
    let backend = FakeBackend::happy();
    let pipeline = pipeline(backend.clone()).await;

    let first = pipeline.process(&full_submission()).await.expect("first");
    let second = pipeline.process(&full_submission()).await.expect("second");

    assert_eq!(backend.calls(), 3);
    assert_eq!(first.stats.cache_hits, 0);
    assert_eq!(second.stats.cache_hits, 3);
    assert_eq!(second.stats.total_input_tokens, 0);
    assert_eq!(first.report.sections, second.report.sections);
    assert_eq!(pipeline.extractor().cache_hits(), 3);
}

#[tokio::test]
async fn shared_cache_spans_pipelines() {
    let backend = FakeBackend::happy();
    let cache = fresh_cache();
    let config = ExtractionConfig::builder()
        .backend(backend.clone())
        .cache(cache.clone())
        .build()
        .expect("valid config");

    DocumentPipeline::new(config.clone())
        .await
        .expect("pipeline")
        .process(&full_submission())
        .await
        .expect("first");
    DocumentPipeline::new(config)
        .await
        .expect("pipeline")
        .process(&full_submission())
        .await
        .expect("second");

    assert_eq!(backend.calls(), 3);
    assert_eq!(cache.len(), 3);
}

#[tokio::test]
async fn free_functions_share_the_process_cache() {
    let backend = FakeBackend::happy();
    let config = ExtractionConfig::builder()
        .backend(backend.clone())
        .build()
        .expect("valid config");
    // Bytes no other test submits, so the shared cache starts cold for them.
    let submission = Submission::new()
        .identity(image(201))
        .lower_secondary(image(202))
        .upper_secondary(image(203));

    let first = process_submission(&submission, &config).await.expect("first");
    let second = process_submission(&submission, &config).await.expect("second");

    assert_eq!(backend.calls(), 3);
    assert_eq!(first.stats.cache_hits, 0);
    assert_eq!(second.stats.cache_hits, 3);
    assert_eq!(first.report.sections, second.report.sections);
}

#[tokio::test]
async fn empty_upload_is_a_read_error() {
    let submission = Submission::new()
        .identity(DocumentSource::Bytes {
            filename: "blank.jpg".into(),
            bytes: Vec::new(),
        })
        .lower_secondary(image(2));
    let backend = FakeBackend::happy();
    let output = pipeline(backend.clone())
        .await
        .process(&submission)
        .await
        .expect("process");

    assert_eq!(backend.calls(), 1);
    match output.document(DocumentKind::Identity).and_then(|d| d.error()) {
        Some(DocumentError::Read { detail, .. }) => assert_eq!(detail, "upload is empty"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn oversized_cache_ttl_is_rejected_before_processing() {
    let err = ExtractionConfig::builder()
        .backend(FakeBackend::happy())
        .cache_ttl_secs(u64::MAX)
        .build()
        .expect_err("ttl too large");
    assert!(matches!(err, DocExtractError::InvalidConfig(_)));
}

#[tokio::test]
async fn invalid_document_sentinel_becomes_error_section() {
    let backend = FakeBackend::new(
        r#"{"error": "The image is not an identity document"}"#,
        LOWER_REPLY,
        UPPER_REPLY,
    );
    let output = pipeline(backend)
        .await
        .process(&full_submission())
        .await
        .expect("process");

    let identity = output.document(DocumentKind::Identity).expect("identity");
    match identity.error() {
        Some(DocumentError::InvalidDocument { reason, .. }) => {
            assert_eq!(reason, "The image is not an identity document");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(output.report.sections[0].is_error());
}

#[tokio::test]
async fn unreadable_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let submission = Submission::new()
        .identity(DocumentSource::Path(dir.path().join("missing.jpg")))
        .lower_secondary(image(2));
    let output = pipeline(FakeBackend::happy())
        .await
        .process(&submission)
        .await
        .expect("process");

    match output.document(DocumentKind::Identity).and_then(|d| d.error()) {
        Some(DocumentError::Read { detail, .. }) => assert_eq!(detail, "file not found"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(output
        .document(DocumentKind::LowerSecondaryRecord)
        .expect("lower")
        .is_extracted());
}

#[tokio::test]
async fn empty_submission_is_rejected() {
    let err = pipeline(FakeBackend::happy())
        .await
        .process(&Submission::new())
        .await
        .expect_err("empty");
    assert!(matches!(err, DocExtractError::EmptySubmission));
}

#[tokio::test]
async fn sequential_mode_gives_same_report() {
    let concurrent = pipeline(FakeBackend::happy())
        .await
        .process(&full_submission())
        .await
        .expect("concurrent");

    let config = ExtractionConfig::builder()
        .backend(FakeBackend::happy())
        .cache(fresh_cache())
        .sequential(true)
        .build()
        .expect("valid config");
    let sequential = DocumentPipeline::new(config)
        .await
        .expect("pipeline")
        .process(&full_submission())
        .await
        .expect("sequential");

    assert_eq!(concurrent.report.sections, sequential.report.sections);
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ExtractionProgressCallback for Recorder {
    fn on_submission_start(&self, total_documents: usize) {
        self.events.lock().unwrap().push(format!("start {total_documents}"));
    }
    fn on_document_complete(&self, kind: DocumentKind, field_count: usize) {
        self.events.lock().unwrap().push(format!("ok {kind:?} {field_count}"));
    }
    fn on_document_error(&self, kind: DocumentKind, _error: &str) {
        self.events.lock().unwrap().push(format!("err {kind:?}"));
    }
    fn on_submission_complete(&self, total_documents: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total_documents}"));
    }
}

#[tokio::test]
async fn progress_events_follow_the_submission() {
    let recorder = Arc::new(Recorder::default());
    let config = ExtractionConfig::builder()
        .backend(FakeBackend::new(IDENTITY_REPLY, "not json", UPPER_REPLY))
        .cache(fresh_cache())
        .sequential(true)
        .progress_callback(recorder.clone())
        .build()
        .expect("valid config");

    DocumentPipeline::new(config)
        .await
        .expect("pipeline")
        .process(&full_submission())
        .await
        .expect("process");

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 3",
            "ok Identity 4",
            "err LowerSecondaryRecord",
            "ok UpperSecondaryRecord 4",
            "done 2/3",
        ]
    );
}

#[tokio::test]
async fn process_to_file_writes_the_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("extracted_report.pdf");

    let output = process_to_file(&full_submission(), &path, &config_with(FakeBackend::happy()))
        .await
        .expect("process");

    let written = std::fs::read(&path).expect("report on disk");
    assert_eq!(written, output.report.bytes);
    assert_eq!(output.report.filename(), "extracted_report.pdf");
    assert_eq!(output.report.media_type(), "application/pdf");
}

#[test]
fn sync_wrapper_runs_its_own_runtime() {
    let output = process_submission_sync(&full_submission(), &config_with(FakeBackend::happy()))
        .expect("process");
    assert_eq!(output.stats.extracted_documents, 3);
}

#[test]
fn pipeline_runs_under_tokio_test_block_on() {
    let output = tokio_test::block_on(async {
        pipeline(FakeBackend::happy())
            .await
            .process(&Submission::new().identity(image(9)))
            .await
    })
    .expect("process");
    assert_eq!(output.report.page_count, 1);
}

#[test]
fn json_output_omits_pdf_bytes() {
    let output = process_submission_sync(&full_submission(), &config_with(FakeBackend::happy()))
        .expect("process");
    let json = serde_json::to_value(&output).expect("serialise");
    assert!(json["report"].get("bytes").is_none());
    assert_eq!(json["report"]["page_count"], 1);
    assert_eq!(json["documents"][0]["outcome"]["status"], "extracted");
}
