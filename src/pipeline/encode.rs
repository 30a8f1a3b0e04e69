//! Image encoding: raw document bytes → base64 `ImageData`.
//!
//! VLM APIs (OpenAI, Anthropic, Gemini) accept images as base64 data-URIs
//! embedded in the JSON request body. Document photos are uploaded exactly as
//! the user supplied them; no re-compression happens here, so the encoding is
//! lossless and [`decode_payload`] returns the original bytes.
//! `detail: "high"` instructs GPT-4-class models to use the full image tile
//! budget; marksheets are dense tables of small print.

use crate::pipeline::input::DocumentInput;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Media type used when the bytes match no known image signature.
pub const FALLBACK_MEDIA_TYPE: &str = "image/jpeg";

/// Encode a document as a base64 image attachment for the VLM API.
pub fn encode_document(doc: &DocumentInput) -> ImageData {
    let media_type = sniff_media_type(&doc.bytes);
    let b64 = encode_payload(&doc.bytes);
    debug!(
        "Encoded {} ({}) → {} bytes base64",
        doc.filename,
        media_type,
        b64.len()
    );

    ImageData::new(b64, media_type).with_detail("high")
}

/// Standard, padded base64 of `bytes`.
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Inverse of [`encode_payload`].
pub fn decode_payload(b64: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(b64)
}

/// Guess the image media type from its leading magic bytes.
pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => FALLBACK_MEDIA_TYPE,
    }
}
