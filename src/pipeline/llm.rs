//! VLM interaction: build the vision message and call the provider.
//!
//! This module is thin: all prompt text lives in
//! [`crate::prompts`] and reply decoding lives in
//! [`crate::pipeline::postprocess`]. The [`VisionBackend`] trait is the seam
//! the extractor calls through, so tests substitute an in-process fake and
//! production wraps any `edgequake_llm` provider.
//!
//! ## No retries
//!
//! Each document gets exactly one call per submission. Re-submitting is the
//! retry mechanism, and the cache makes re-submission of already extracted
//! documents free.

use crate::config::ExtractionConfig;
use crate::error::ServiceError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// One single-shot extraction request.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    /// Instruction text including the JSON-only directive.
    pub prompt: String,
    /// The document image, base64 encoded.
    pub image: ImageData,
}

/// Raw reply of the model.
#[derive(Debug, Clone, Default)]
pub struct VisionReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Anything that can answer a [`VisionRequest`].
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn complete(&self, request: VisionRequest) -> Result<VisionReply, ServiceError>;
}

/// [`VisionBackend`] backed by an `edgequake_llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl VisionBackend for LlmBackend {
    /// ## Message Layout
    ///
    /// A single user message carrying the instruction text and the document
    /// image. No system message and no conversation history: every call is
    /// independent.
    async fn complete(&self, request: VisionRequest) -> Result<VisionReply, ServiceError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user_with_images(
            request.prompt.as_str(),
            vec![request.image],
        )];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ServiceError(format!("{e}")))?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(VisionReply {
            content: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
