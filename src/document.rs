//! Input documents and the engine's result contract.
//!
//! [`SourceDocument`] is what intake hands to the batch controller: raw bytes
//! plus the metadata captured at upload time (name, declared media type).
//! [`ConversionResult`] is the only "protocol" between the engine and the
//! controller: an explicit success/failure enum rather than a struct with
//! optional fields, so an invalid combination ("success without markdown")
//! cannot be represented.

use crate::error::StructuralWarning;
use serde::{Deserialize, Serialize};

/// Declared media type of a `.docx` upload.
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Declared media type of a `.pdf` upload.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// One uploaded document: raw bytes plus intake metadata.
///
/// The declared media type is trusted for dispatch; the engine routes
/// `application/pdf` to the PDF path and everything else to the DOCX path.
/// A mislabeled file fails inside its extractor and surfaces as a normal
/// per-item error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name as uploaded, extension included.
    pub name: String,
    /// Declared media type string, e.g. [`PDF_MEDIA_TYPE`].
    pub media_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Size in bytes, captured at intake.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// True when the declared media type routes to the PDF path.
    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }
}

/// Outcome of converting one document.
///
/// `Converted` always carries a (possibly empty) Markdown string plus any
/// structural warnings collected on the way; `Failed` always carries a
/// non-empty human-readable message. The engine never panics and never
/// returns `Err`; every pipeline failure is normalised into `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionResult {
    /// The document produced Markdown.
    Converted {
        markdown: String,
        /// Non-fatal degradations observed during extraction/transformation.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<StructuralWarning>,
    },
    /// The document could not be converted.
    Failed { error: String },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Converted { .. })
    }

    /// Produced Markdown, when successful.
    pub fn markdown(&self) -> Option<&str> {
        match self {
            ConversionResult::Converted { markdown, .. } => Some(markdown),
            ConversionResult::Failed { .. } => None,
        }
    }

    /// Failure message, when failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            ConversionResult::Converted { .. } => None,
            ConversionResult::Failed { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_document_size_tracks_bytes() {
        let doc = SourceDocument::new("a.docx", DOCX_MEDIA_TYPE, vec![0u8; 42]);
        assert_eq!(doc.size(), 42);
        assert!(!doc.is_pdf());

        let pdf = SourceDocument::new("b.pdf", PDF_MEDIA_TYPE, vec![]);
        assert!(pdf.is_pdf());
    }

    #[test]
    fn result_accessors_are_mutually_exclusive() {
        let ok = ConversionResult::Converted {
            markdown: String::new(),
            warnings: vec![],
        };
        assert!(ok.is_success());
        assert_eq!(ok.markdown(), Some(""));
        assert_eq!(ok.error(), None);

        let failed = ConversionResult::Failed {
            error: "bad input".into(),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.markdown(), None);
        assert_eq!(failed.error(), Some("bad input"));
    }

    #[test]
    fn result_serialises_with_status_tag() {
        let ok = ConversionResult::Converted {
            markdown: "# Hi".into(),
            warnings: vec![],
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains("\"status\":\"converted\""), "got: {json}");
        // empty warnings are omitted entirely
        assert!(!json.contains("warnings"), "got: {json}");
    }
}
