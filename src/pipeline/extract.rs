//! Extraction client: one cached, single-shot model call per document.
//!
//! ```text
//! fingerprint ──▶ cache hit? ──yes──▶ record
//!                     │ no
//!                     ▼
//!     encode ──▶ backend (timeout) ──▶ parse ──▶ cache insert ──▶ record
//! ```
//!
//! Only records that parsed are cached. A failed call or an unparseable
//! reply leaves the cache untouched, so the next submission of the same
//! document tries again.

use crate::cache::ExtractionCache;
use crate::error::DocumentError;
use crate::pipeline::encode::encode_document;
use crate::pipeline::fingerprint::fingerprint;
use crate::pipeline::input::DocumentInput;
use crate::pipeline::llm::{VisionBackend, VisionRequest};
use crate::pipeline::postprocess::parse_record;
use crate::prompts::request_text;
use crate::record::RawRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of one extraction, with where it came from.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: RawRecord,
    /// True when the record was served from the cache.
    pub cached: bool,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Runs extraction requests through a backend, memoised by a cache.
pub struct Extractor {
    backend: Arc<dyn VisionBackend>,
    cache: Arc<dyn ExtractionCache>,
    ttl: Duration,
    timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Extractor {
    pub fn new(
        backend: Arc<dyn VisionBackend>,
        cache: Arc<dyn ExtractionCache>,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            cache,
            ttl,
            timeout,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Extract the fields `instruction` asks for from `document`.
    pub async fn extract(
        &self,
        document: &DocumentInput,
        instruction: &str,
    ) -> Result<RawRecord, DocumentError> {
        self.extract_detailed(document, instruction)
            .await
            .map(|e| e.record)
    }

    /// Like [`Extractor::extract`], but also reports cache use and token counts.
    pub async fn extract_detailed(
        &self,
        document: &DocumentInput,
        instruction: &str,
    ) -> Result<Extraction, DocumentError> {
        let kind = document.kind;
        let key = fingerprint(&document.bytes, instruction);

        if let Some(record) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("{}: cache hit {}", kind, key);
            return Ok(Extraction {
                record,
                cached: true,
                input_tokens: 0,
                output_tokens: 0,
            });
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let request = VisionRequest {
            prompt: request_text(instruction),
            image: encode_document(document),
        };

        let reply = match tokio::time::timeout(self.timeout, self.backend.complete(request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                return Err(DocumentError::ExternalService {
                    kind,
                    detail: e.to_string(),
                })
            }
            Err(_) => {
                return Err(DocumentError::ExternalService {
                    kind,
                    detail: format!("timed out after {}s", self.timeout.as_secs()),
                })
            }
        };

        let record = parse_record(&reply.content)
            .map_err(|detail| DocumentError::ExtractionFormat { kind, detail })?;

        debug!(
            "{}: extracted {} fields, caching for {:?}",
            kind,
            record.len(),
            self.ttl
        );
        self.cache.insert(key, record.clone(), self.ttl);

        Ok(Extraction {
            record,
            cached: false,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
        })
    }

    /// Extractions answered from the cache since this extractor was created.
    pub fn cache_hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Extractions that needed a model call.
    pub fn cache_misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
