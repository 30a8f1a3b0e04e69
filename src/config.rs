//! Configuration types for document extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct holds every knob so a
//! config can be shared across tasks and logged as a whole.

use crate::cache::ExtractionCache;
use crate::error::DocExtractError;
use crate::pipeline::llm::VisionBackend;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Model used when none is configured and the provider is chosen by us.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Longest accepted cache TTL: one year.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration for document extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_docextract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o")
///     .api_timeout_secs(30)
///     .cache_ttl_secs(600)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// LLM model identifier, e.g. "gpt-4o".
    /// If None, [`DEFAULT_MODEL`] is used for providers we construct.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed vision backend. Takes precedence over every provider setting.
    pub backend: Option<Arc<dyn VisionBackend>>,

    /// Extraction cache override.
    /// If None, the process-wide [`crate::cache::shared_cache`] is used.
    pub cache: Option<Arc<dyn ExtractionCache>>,

    /// Sampling temperature for the completion. Default: 0.0.
    ///
    /// Extraction must report what is printed on the document, so sampling
    /// is fully deterministic by default.
    pub temperature: f32,

    /// Maximum tokens the model may generate per document. Default: 1024.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// How long an extracted record stays in the cache, in seconds.
    /// Default: 3600. At most [`MAX_CACHE_TTL_SECS`].
    pub cache_ttl_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Process the documents of a submission one after another. Default: false.
    ///
    /// By default all documents of a submission are sent to the model at
    /// once. Sequential mode keeps at most one request in flight, which helps
    /// on rate-limited accounts.
    pub sequential: bool,

    /// Receives per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            backend: None,
            cache: None,
            temperature: 0.0,
            max_tokens: 1024,
            api_timeout_secs: 60,
            cache_ttl_secs: 3600,
            download_timeout_secs: 120,
            sequential: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn VisionBackend>"))
            .field("cache", &self.cache.as_ref().map(|_| "<dyn ExtractionCache>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("sequential", &self.sequential)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn VisionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ExtractionCache>) -> Self {
        self.config.cache = Some(cache);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.config.cache_ttl_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn sequential(mut self, v: bool) -> Self {
        self.config.sequential = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, DocExtractError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(DocExtractError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(DocExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(DocExtractError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(DocExtractError::InvalidConfig(format!(
                "Cache TTL must be ≤ {MAX_CACHE_TTL_SECS} seconds"
            )));
        }
        if matches!(&c.model, Some(m) if m.trim().is_empty()) {
            return Err(DocExtractError::InvalidConfig(
                "Model name must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
