//! # docmill
//!
//! Converts DOCX and PDF documents to Markdown, entirely in process, with a
//! batch controller for converting many documents in one pass and exporting
//! the results as a ZIP archive.
//!
//! ## Pipeline
//!
//! ```text
//!             ┌── DOCX ──▶ OOXML parse ──▶ HTML ──▶ Markdown rewrite ─┐
//! bytes ──▶ dispatch                                                  ├──▶ Markdown + warnings
//!             └── PDF ───▶ text layer ──▶ layout heuristics ──────────┘
//! ```
//!
//! DOCX conversion is semantic: styles, lists, tables and hyperlinks come
//! from the document's own structure, and constructs with no Markdown
//! equivalent are reported as [`StructuralWarning`]s instead of silently
//! vanishing. PDF conversion is heuristic: structure is guessed from font
//! heights in the text layer, so the output is best-effort by nature.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use docmill::{
//!     BatchController, ConversionEngine, ConvertConfig, SourceDocument, DOCX_MEDIA_TYPE,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Arc::new(ConversionEngine::new(ConvertConfig::default()));
//! let mut batch = BatchController::new(engine);
//!
//! let bytes = std::fs::read("report.docx")?;
//! batch.add(SourceDocument::new("report.docx", DOCX_MEDIA_TYPE, bytes));
//!
//! let summary = batch.run().await;
//! println!("{} of {} converted", summary.converted, summary.selected);
//!
//! if let Some(archive) = docmill::export::write_archive(&batch.export_entries())? {
//!     std::fs::write("converted.zip", archive)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Conversions never escape as panics or `Err` at the batch boundary: each
//! item independently ends `Done` or `Failed`, and failed items can be
//! retried by running the batch again.

pub mod batch;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod progress;

pub use batch::{BatchController, BatchItem, ItemId, ItemState, RunSummary};
pub use config::{ConvertConfig, ConvertConfigBuilder, DEFAULT_HEADING_MIN_HEIGHT};
pub use document::{
    ConversionResult, SourceDocument, DOCX_MEDIA_TYPE, PDF_MEDIA_TYPE,
};
pub use engine::{ConversionEngine, DocumentConverter};
pub use error::{ConvertError, StructuralWarning};
pub use export::{markdown_file_name, write_archive, ExportEntry};
pub use progress::{BatchProgressCallback, NoopBatchCallback, ProgressCallback};
