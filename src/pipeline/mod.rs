//! Pipeline stages for document extraction.
//!
//! Each submodule implements exactly one step, so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ fingerprint ──▶ [cache] ──▶ encode ──▶ llm ──▶ postprocess ──▶ normalize ──▶ render
//! (path/URL/bytes)  (blake3)            (base64)   (VLM)   (JSON decode)    (tables)      (PDF)
//! ```
//!
//! 1. [`input`]       — read the submitted document into memory
//! 2. [`fingerprint`] — content-addressed cache key for (document, instruction)
//! 3. [`encode`]      — sniff the image type and base64-wrap the bytes
//! 4. [`llm`]         — the [`llm::VisionBackend`] seam and its `edgequake_llm` adapter
//! 5. [`postprocess`] — strict JSON decoding of the model reply
//! 6. [`extract`]     — ties 2–5 together behind the cache
//! 7. [`normalize`]   — split a record into main fields and the subject table
//! 8. [`render`]      — lay out all sections and write the PDF report

pub mod encode;
pub mod extract;
pub mod fingerprint;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod postprocess;
pub mod render;
