//! Error types for the docmill library.
//!
//! Two distinct kinds reflect two distinct failure modes:
//!
//! * [`ConvertError`] is fatal for one document: the bytes cannot be read
//!   as a document of the declared type at all. Raised inside the extraction
//!   pipeline and caught at the [`crate::engine::ConversionEngine`] boundary,
//!   where it is normalised into a `Failed` conversion result. Nothing
//!   propagates past the engine.
//!
//! * [`StructuralWarning`] is non-fatal: a construct inside an otherwise
//!   readable document could not be mapped faithfully (unresolved hyperlink,
//!   unknown paragraph style, element with no Markdown rule). Warnings are
//!   collected and returned alongside the Markdown so callers and tests can
//!   assert on degradation instead of grepping logs.
//!
//! The split keeps the controller's per-item isolation simple: one bad
//! document becomes one failed item, never a failed batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// All fatal per-document errors produced by the conversion pipeline.
///
/// Non-fatal anomalies use [`StructuralWarning`] and are delivered with the
/// Markdown rather than raised here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── DOCX path ─────────────────────────────────────────────────────────
    /// The bytes are not a readable DOCX package (not a ZIP, or a package
    /// missing/containing a malformed `word/document.xml`).
    #[error("not a valid DOCX package: {detail}")]
    DocxParse { detail: String },

    // ── PDF path ──────────────────────────────────────────────────────────
    /// The bytes could not be opened as a PDF document.
    #[error("could not open PDF document: {detail}")]
    PdfOpen { detail: String },

    /// The text layer of one page could not be read. Any page failure aborts
    /// the whole document; no partial Markdown is returned.
    #[error("could not read text layer of page {page}: {detail}")]
    PdfText { page: usize, detail: String },

    // ── Export ────────────────────────────────────────────────────────────
    /// Assembling the export archive failed.
    #[error("failed to write export archive: {0}")]
    Archive(String),

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal anomaly observed while extracting or transforming a document.
///
/// Warnings never block Markdown production. They travel with the Markdown on
/// `ConversionResult::Converted` and `ItemState::Done` so degradation is
/// observable by callers, not only logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    /// A `w:hyperlink` whose relationship id has no target in the package
    /// rels. The link text is kept; the anchor is dropped.
    UnresolvedHyperlink { id: String },

    /// A paragraph style with no structural mapping; rendered as a plain
    /// paragraph.
    UnknownStyle { style_id: String },

    /// An element the Markdown rule table does not cover; its text content
    /// is kept and the tags are dropped.
    DegradedConstruct { construct: String },
}

impl fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralWarning::UnresolvedHyperlink { id } => {
                write!(f, "hyperlink relationship '{id}' has no target; anchor dropped")
            }
            StructuralWarning::UnknownStyle { style_id } => {
                write!(f, "paragraph style '{style_id}' has no mapping; rendered as plain text")
            }
            StructuralWarning::DegradedConstruct { construct } => {
                write!(f, "no Markdown rule for '{construct}'; text kept, structure dropped")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_text_error_names_the_page() {
        let e = ConvertError::PdfText {
            page: 3,
            detail: "boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn warning_display_is_human_readable() {
        let w = StructuralWarning::UnresolvedHyperlink { id: "rId7".into() };
        assert!(w.to_string().contains("rId7"));

        let w = StructuralWarning::DegradedConstruct {
            construct: "iframe".into(),
        };
        assert!(w.to_string().contains("iframe"));
    }

    #[test]
    fn warning_serialises_with_kind_tag() {
        let w = StructuralWarning::UnknownStyle {
            style_id: "FancyQuote".into(),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("\"kind\":\"unknown_style\""), "got: {json}");
        assert!(json.contains("FancyQuote"));
    }
}
