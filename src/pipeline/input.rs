//! Input resolution: turn a user-supplied path, URL, or byte buffer into a
//! [`DocumentInput`].
//!
//! Documents are small photos, so everything is read fully into memory; the
//! bytes feed both the cache fingerprint and the base64 payload. A read
//! failure is reported as [`DocumentError::Read`] for that one slot and never
//! aborts the rest of the submission.

use crate::error::DocumentError;
use crate::prompts::DocumentKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where a submitted document comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file on the local file system.
    Path(PathBuf),
    /// An HTTP/HTTPS URL to download.
    Url(String),
    /// Bytes already in memory (e.g. an upload), with their original filename.
    Bytes { filename: String, bytes: Vec<u8> },
}

impl DocumentSource {
    /// Interpret a CLI argument as a URL or a local path.
    pub fn parse(input: &str) -> Self {
        if is_url(input) {
            DocumentSource::Url(input.to_string())
        } else {
            DocumentSource::Path(PathBuf::from(input))
        }
    }

    /// Human-readable origin, used in error messages.
    pub fn origin(&self) -> String {
        match self {
            DocumentSource::Path(p) => p.display().to_string(),
            DocumentSource::Url(u) => u.clone(),
            DocumentSource::Bytes { filename, .. } => filename.clone(),
        }
    }
}

/// A document read into memory and bound to its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
    /// Originating filename (last path/URL segment for downloads).
    pub filename: String,
}

impl DocumentInput {
    pub fn from_bytes(kind: DocumentKind, bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            kind,
            bytes,
            filename: filename.into(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read a document from its source.
pub async fn resolve_document(
    kind: DocumentKind,
    source: &DocumentSource,
    timeout_secs: u64,
) -> Result<DocumentInput, DocumentError> {
    match source {
        DocumentSource::Path(path) => read_local(kind, path).await,
        DocumentSource::Url(url) => download_url(kind, url, timeout_secs).await,
        DocumentSource::Bytes { filename, bytes } => {
            if bytes.is_empty() {
                return Err(DocumentError::Read {
                    kind,
                    origin: filename.clone(),
                    detail: "upload is empty".to_string(),
                });
            }
            Ok(DocumentInput::from_bytes(kind, bytes.clone(), filename.clone()))
        }
    }
}

/// Read a local file into memory.
async fn read_local(kind: DocumentKind, path: &Path) -> Result<DocumentInput, DocumentError> {
    let read_error = |detail: String| DocumentError::Read {
        kind,
        origin: path.display().to_string(),
        detail,
    };

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => read_error("file not found".to_string()),
        std::io::ErrorKind::PermissionDenied => read_error("permission denied".to_string()),
        _ => read_error(e.to_string()),
    })?;

    if bytes.is_empty() {
        return Err(read_error("file is empty".to_string()));
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read {} ({} bytes) for {}", path.display(), bytes.len(), kind);
    Ok(DocumentInput::from_bytes(kind, bytes, filename))
}

/// Download a URL into memory.
async fn download_url(
    kind: DocumentKind,
    url: &str,
    timeout_secs: u64,
) -> Result<DocumentInput, DocumentError> {
    info!("Downloading {} from: {}", kind, url);

    let read_error = |detail: String| DocumentError::Read {
        kind,
        origin: url.to_string(),
        detail,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| read_error(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            read_error(format!("download timed out after {timeout_secs}s"))
        } else {
            read_error(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(read_error(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| read_error(e.to_string()))?;

    if bytes.is_empty() {
        return Err(read_error("download is empty".to_string()));
    }

    Ok(DocumentInput::from_bytes(kind, bytes.to_vec(), extract_filename(url)))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded-document".to_string()
}
