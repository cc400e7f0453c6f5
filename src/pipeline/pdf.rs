//! PDF → Markdown via layout heuristics over the text layer.
//!
//! PDF carries no semantic structure, so this stage reconstructs one from
//! two signals only: the reader's native run order and each run's font
//! height. Runs arrive in the order pdfium reports them, with **no geometric
//! re-sorting**. Re-deriving reading order from raw coordinates is
//! unreliable across multi-column and rotated layouts without a full layout
//! model, so the design trusts the source reader's ordering instead.
//!
//! ## Heading heuristic
//!
//! A run becomes an `##` heading when its height exceeds the configured
//! threshold **and** differs from the previous run's height. The second
//! condition means heights must *change into* the band, not merely sit in
//! it; otherwise every run of a multi-run heading would start a fresh
//! heading line. Whitespace-only runs are skipped entirely and leave the
//! height tracker untouched, so an invisible run between two halves of a
//! heading cannot re-trigger it. The tracker resets at each page boundary.
//!
//! Known limitations: no bold/italic detection, no
//! column-aware ordering, no table reconstruction, and no merging of a
//! heading whose runs oscillate in height.

use crate::error::ConvertError;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use tracing::debug;

/// Emitted after every page, including the last.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// One text run from a page's text layer, in the reader's native order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TextRun {
    pub text: String,
    /// Bounding-box height in PDF points; stands in for the font size.
    pub height: f32,
}

/// Process-wide pdfium binding.
///
/// pdfium must be bound exactly once before the first document is opened;
/// the `Lazy` makes initialisation idempotent and independent of per-document
/// state. The `thread_safe` crate feature serialises FFI access underneath.
static PDFIUM: Lazy<Pdfium> = Lazy::new(Pdfium::default);

/// Extract best-effort Markdown from PDF bytes.
///
/// # Errors
/// [`ConvertError::PdfOpen`] when the bytes cannot be opened as a PDF,
/// [`ConvertError::PdfText`] when a page's text layer cannot be read. A
/// failure on any page aborts the whole document; no partial Markdown is
/// returned.
pub async fn extract_markdown(
    bytes: Vec<u8>,
    heading_min_height: f32,
) -> Result<String, ConvertError> {
    tokio::task::spawn_blocking(move || extract_markdown_blocking(&bytes, heading_min_height))
        .await
        .map_err(|e| ConvertError::Internal(format!("PDF extraction task failed: {e}")))?
}

/// Blocking implementation of [`extract_markdown`]. pdfium is CPU-bound and
/// not async-safe, hence `spawn_blocking` in the public entry point.
pub fn extract_markdown_blocking(
    bytes: &[u8],
    heading_min_height: f32,
) -> Result<String, ConvertError> {
    let document = PDFIUM
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ConvertError::PdfOpen {
            detail: format!("{e:?}"),
        })?;

    let document_pages = document.pages();
    let mut pages: Vec<Vec<TextRun>> = Vec::new();
    for (page_index, page) in document_pages.iter().enumerate() {
        let text = page.text().map_err(|e| ConvertError::PdfText {
            page: page_index + 1,
            detail: format!("{e:?}"),
        })?;

        let runs: Vec<TextRun> = text
            .segments()
            .iter()
            .map(|segment| TextRun {
                text: segment.text(),
                height: segment.bounds().height().value,
            })
            .collect();
        debug!(page = page_index + 1, runs = runs.len(), "read text layer");
        pages.push(runs);
    }

    Ok(assemble_document(pages, heading_min_height))
}

/// Assemble per-page run lists into one Markdown document, a page separator
/// after every page.
pub(crate) fn assemble_document<I>(pages: I, heading_min_height: f32) -> String
where
    I: IntoIterator<Item = Vec<TextRun>>,
{
    let mut markdown = String::new();
    for runs in pages {
        markdown.push_str(&reconstruct_page(&runs, heading_min_height));
        markdown.push_str(PAGE_SEPARATOR);
    }
    markdown
}

/// Rebuild one page's paragraph/heading structure from its text runs.
pub(crate) fn reconstruct_page(runs: &[TextRun], heading_min_height: f32) -> String {
    let mut page = String::new();
    let mut last_height: Option<f32> = None;

    for run in runs {
        // Skipped runs must not touch the tracker: an empty run between two
        // equal-height halves of a heading would otherwise re-trigger it.
        if run.text.trim().is_empty() {
            continue;
        }

        if run.height > heading_min_height && last_height != Some(run.height) {
            page.push_str("\n\n## ");
            page.push_str(run.text.trim());
            page.push('\n');
        } else {
            // Word-join heuristic: PDF runs do not reliably carry their own
            // whitespace, so body runs are joined with single spaces.
            page.push_str(&run.text);
            page.push(' ');
        }

        last_height = Some(run.height);
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, height: f32) -> TextRun {
        TextRun {
            text: text.into(),
            height,
        }
    }

    #[test]
    fn body_runs_join_with_spaces() {
        let out = reconstruct_page(&[run("Hello", 10.0), run("world", 10.0)], 14.0);
        assert_eq!(out, "Hello world ");
    }

    #[test]
    fn only_the_first_run_entering_the_band_becomes_a_heading() {
        // Heights 10 → 18 → 18: the second 18 is part of the same heading's
        // text flow, not a fresh heading.
        let runs = [run("intro", 10.0), run("Big", 18.0), run("Title", 18.0)];
        let out = reconstruct_page(&runs, 14.0);
        assert_eq!(out, "intro \n\n## Big\nTitle ");
    }

    #[test]
    fn first_run_of_page_can_be_a_heading() {
        let out = reconstruct_page(&[run("Title", 20.0)], 14.0);
        assert_eq!(out, "\n\n## Title\n");
    }

    #[test]
    fn tall_run_at_threshold_is_not_a_heading() {
        // Strictly greater than the threshold, not greater-or-equal.
        let out = reconstruct_page(&[run("edge", 14.0)], 14.0);
        assert_eq!(out, "edge ");
    }

    #[test]
    fn height_change_within_band_starts_a_new_heading() {
        let runs = [run("One", 18.0), run("Two", 22.0)];
        let out = reconstruct_page(&runs, 14.0);
        assert_eq!(out, "\n\n## One\n\n\n## Two\n");
    }

    #[test]
    fn whitespace_runs_are_skipped_and_preserve_the_tracker() {
        // 18 → "  " → 18: the blank run neither appears in the output nor
        // resets the last-height tracker, so no second heading fires.
        let runs = [run("Big", 18.0), run("   ", 3.0), run("Heading", 18.0)];
        let out = reconstruct_page(&runs, 14.0);
        assert_eq!(out, "\n\n## Big\nHeading ");
    }

    #[test]
    fn empty_runs_never_appear_in_output() {
        let runs = [run("", 10.0), run("\t \n", 10.0)];
        assert_eq!(reconstruct_page(&runs, 14.0), "");
    }

    #[test]
    fn page_separator_after_every_page_including_last() {
        let pages = vec![
            vec![run("one", 10.0)],
            vec![run("two", 10.0)],
            vec![], // empty page still gets its separator
        ];
        let out = assemble_document(pages, 14.0);
        assert_eq!(out.matches(PAGE_SEPARATOR).count(), 3);
        assert!(out.ends_with(PAGE_SEPARATOR));
    }

    #[test]
    fn tracker_resets_between_pages() {
        // The same height on the next page is a change relative to "no
        // previous run", so it becomes a heading again.
        let pages = vec![vec![run("A", 18.0)], vec![run("B", 18.0)]];
        let out = assemble_document(pages, 14.0);
        assert_eq!(out.matches("## ").count(), 2);
    }
}
