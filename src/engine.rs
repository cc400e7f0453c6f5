//! Single-document conversion engine.
//!
//! [`ConversionEngine`] dispatches on the document's declared media type and
//! runs the matching pipeline stage. Its contract is total:
//! `convert` never returns `Err` and never panics across the boundary; every
//! failure mode, malformed bytes included, comes back as
//! [`ConversionResult::Failed`] with a human-readable message. Callers such
//! as the batch controller can therefore process item N+1 no matter what
//! item N's bytes contained.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ConvertConfig;
use crate::document::{ConversionResult, SourceDocument};
use crate::pipeline::{docx, html_md, pdf};

/// Converts one source document to Markdown.
///
/// Implementations must be infallible at the type level: outcomes are
/// reported through [`ConversionResult`], not `Result`, so a caller holding
/// many documents is never forced to abort a run because one of them was
/// corrupt. Implementations also must not panic on malformed input.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, document: &SourceDocument) -> ConversionResult;
}

/// The default converter: DOCX through the OOXML → HTML → Markdown path,
/// PDF through the text-layer heuristic path.
#[derive(Debug, Clone, Default)]
pub struct ConversionEngine {
    config: ConvertConfig,
}

impl ConversionEngine {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    async fn convert_docx(&self, document: &SourceDocument) -> ConversionResult {
        let extraction = match docx::extract_html(document.bytes.clone()).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(name = %document.name, error = %e, "DOCX extraction failed");
                return ConversionResult::Failed {
                    error: e.to_string(),
                };
            }
        };

        let transformed = html_md::transform(&extraction.html);
        let mut warnings = extraction.warnings;
        warnings.extend(transformed.degradations);

        ConversionResult::Converted {
            markdown: transformed.markdown,
            warnings,
        }
    }

    async fn convert_pdf(&self, document: &SourceDocument) -> ConversionResult {
        match pdf::extract_markdown(document.bytes.clone(), self.config.pdf_heading_min_height)
            .await
        {
            Ok(markdown) => ConversionResult::Converted {
                markdown,
                warnings: Vec::new(),
            },
            Err(e) => {
                warn!(name = %document.name, error = %e, "PDF extraction failed");
                ConversionResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl DocumentConverter for ConversionEngine {
    async fn convert(&self, document: &SourceDocument) -> ConversionResult {
        debug!(
            name = %document.name,
            media_type = %document.media_type,
            size = document.size(),
            "converting document"
        );

        let result = if document.is_pdf() {
            self.convert_pdf(document).await
        } else {
            // Anything that is not a PDF goes down the DOCX path; unreadable
            // bytes surface there as a parse failure rather than up front.
            self.convert_docx(document).await
        };

        match &result {
            ConversionResult::Converted { markdown, warnings } => debug!(
                name = %document.name,
                markdown_len = markdown.len(),
                warnings = warnings.len(),
                "conversion succeeded"
            ),
            ConversionResult::Failed { error } => {
                debug!(name = %document.name, error = %error, "conversion failed")
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DOCX_MEDIA_TYPE;

    #[tokio::test]
    async fn garbage_docx_bytes_fail_without_panicking() {
        let engine = ConversionEngine::default();
        let doc = SourceDocument::new("broken.docx", DOCX_MEDIA_TYPE, vec![0x00, 0x01, 0x02]);

        let result = engine.convert(&doc).await;
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("DOCX"));
    }

    #[tokio::test]
    async fn empty_docx_bytes_fail_without_panicking() {
        let engine = ConversionEngine::default();
        let doc = SourceDocument::new("empty.docx", DOCX_MEDIA_TYPE, Vec::new());

        let result = engine.convert(&doc).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn unknown_media_type_takes_the_docx_path() {
        let engine = ConversionEngine::default();
        let doc = SourceDocument::new("notes.txt", "text/plain", b"just text".to_vec());

        let result = engine.convert(&doc).await;
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("ZIP"));
    }
}
