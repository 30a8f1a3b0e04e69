//! Extraction instructions for each supported document kind.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — adding a field to a marksheet or changing
//!    the fallback value requires editing exactly one place.
//!
//! 2. **Cache identity** — the instruction text is half of the cache
//!    fingerprint (see [`crate::pipeline::fingerprint`]). Editing a prompt
//!    therefore invalidates previously cached extractions automatically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value the model is told to use for fields it cannot find.
pub const MISSING_FIELD_VALUE: &str = "N/A";

/// Key of the sentinel object the model returns for a wrong document.
///
/// A reply of exactly `{"error": "<reason>"}` means "this image is not a
/// document of the requested kind".
pub const INVALID_DOCUMENT_KEY: &str = "error";

/// Appended to every instruction so the provider answers with a JSON object.
pub const JSON_DIRECTIVE: &str = "Respond with a single JSON object only. \
Do not wrap it in markdown fences and do not add commentary.";

/// The three document slots of a submission, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Government identity card.
    Identity,
    /// Lower secondary (10th grade) marksheet.
    LowerSecondaryRecord,
    /// Upper secondary (12th grade) marksheet.
    UpperSecondaryRecord,
}

impl DocumentKind {
    /// All kinds in the order their sections appear in the report.
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Identity,
        DocumentKind::LowerSecondaryRecord,
        DocumentKind::UpperSecondaryRecord,
    ];

    /// Section title used in the report.
    pub fn title(self) -> &'static str {
        match self {
            DocumentKind::Identity => "Identity Document",
            DocumentKind::LowerSecondaryRecord => "Lower Secondary Marksheet",
            DocumentKind::UpperSecondaryRecord => "Upper Secondary Marksheet",
        }
    }

    /// The fixed extraction instruction for this kind.
    pub fn instruction(self) -> &'static str {
        match self {
            DocumentKind::Identity => IDENTITY_INSTRUCTION,
            DocumentKind::LowerSecondaryRecord => LOWER_SECONDARY_INSTRUCTION,
            DocumentKind::UpperSecondaryRecord => UPPER_SECONDARY_INSTRUCTION,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Instruction for identity cards.
pub const IDENTITY_INSTRUCTION: &str = r#"You are an information extractor. Extract the following fields from the identity document in the image and return them as a JSON object, using exactly these keys:

- Full Name
- Father's Name
- Mother's Name
- Date of Birth
- Address
- Identity Number
- Gender

If a field is not present on the document, use the value "N/A".
If the image is not an identity document, return {"error": "<short reason>"} and nothing else."#;

/// Instruction for lower secondary marksheets.
pub const LOWER_SECONDARY_INSTRUCTION: &str = r#"You are an information extractor. Extract the following fields from the lower secondary (10th grade) marksheet in the image and return them as a JSON object, using exactly these keys:

- Seat Number
- Year of Passing
- Subjects: an object mapping each subject name to its score, e.g. {"Mathematics": 91}
- Total Marks Obtained
- Percentage

If a field is not present on the document, use the value "N/A".
If the image is not a lower secondary marksheet, return {"error": "<short reason>"} and nothing else."#;

/// Instruction for upper secondary marksheets.
pub const UPPER_SECONDARY_INSTRUCTION: &str = r#"You are an information extractor. Extract the following fields from the upper secondary (12th grade) marksheet in the image and return them as a JSON object, using exactly these keys:

- Stream
- Seat Number
- Year of Passing
- Subjects: an object mapping each subject name to its score, e.g. {"Physics": 88}
- Total Marks Obtained
- Percentage

If a field is not present on the document, use the value "N/A".
If the image is not an upper secondary marksheet, return {"error": "<short reason>"} and nothing else."#;

/// Build the full user-message text sent alongside the image.
pub fn request_text(instruction: &str) -> String {
    format!("{instruction}\n\n{JSON_DIRECTIVE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_instruction_documents_fallback_and_sentinel() {
        for kind in DocumentKind::ALL {
            let text = kind.instruction();
            assert!(text.contains(&format!("\"{MISSING_FIELD_VALUE}\"")), "{kind}");
            assert!(text.contains(&format!("{{\"{INVALID_DOCUMENT_KEY}\"")), "{kind}");
        }
    }

    #[test]
    fn marksheets_ask_for_subject_scores() {
        assert!(DocumentKind::LowerSecondaryRecord.instruction().contains("Subjects"));
        assert!(DocumentKind::UpperSecondaryRecord.instruction().contains("Stream"));
        assert!(!DocumentKind::Identity.instruction().contains("Subjects"));
    }

    #[test]
    fn request_text_appends_json_directive() {
        let text = request_text("extract things");
        assert!(text.starts_with("extract things"));
        assert!(text.ends_with(JSON_DIRECTIVE));
    }

    #[test]
    fn kinds_are_ordered_for_the_report() {
        let mut kinds = DocumentKind::ALL.to_vec();
        kinds.reverse();
        kinds.sort();
        assert_eq!(kinds, DocumentKind::ALL.to_vec());
    }
}
