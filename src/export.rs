//! Bulk export of converted Markdown as a ZIP archive.

use std::io::{Cursor, Write};

use serde::Serialize;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ConvertError;

/// One converted document ready for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    /// Archive-internal file name, already rewritten to `.md`.
    pub name: String,
    /// The Markdown text.
    pub content: String,
}

/// Derive the exported Markdown file name from the source file name: the
/// last extension is replaced with `.md`, or appended when there is none.
/// Leading-dot names like `.hidden` count as extensionless.
pub fn markdown_file_name(source_name: &str) -> String {
    match source_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}.md", &source_name[..dot]),
        _ => format!("{source_name}.md"),
    }
}

/// Pack entries into an in-memory ZIP archive.
///
/// Returns `Ok(None)` when there is nothing to export, so callers can skip
/// writing an empty archive.
///
/// # Errors
/// [`ConvertError::Archive`] when the ZIP writer fails.
pub fn write_archive(entries: &[ExportEntry]) -> Result<Option<Vec<u8>>, ConvertError> {
    if entries.is_empty() {
        return Ok(None);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        writer
            .start_file(&entry.name, options)
            .map_err(|e| ConvertError::Archive(e.to_string()))?;
        writer
            .write_all(entry.content.as_bytes())
            .map_err(|e| ConvertError::Archive(e.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| ConvertError::Archive(e.to_string()))?;
    let bytes = cursor.into_inner();
    debug!(entries = entries.len(), bytes = bytes.len(), "wrote export archive");
    Ok(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn extension_is_replaced_with_md() {
        assert_eq!(markdown_file_name("report.docx"), "report.md");
        assert_eq!(markdown_file_name("paper.pdf"), "paper.md");
    }

    #[test]
    fn only_the_last_extension_is_replaced() {
        assert_eq!(markdown_file_name("archive.tar.gz"), "archive.tar.md");
    }

    #[test]
    fn extensionless_names_get_md_appended() {
        assert_eq!(markdown_file_name("README"), "README.md");
    }

    #[test]
    fn leading_dot_names_keep_their_dot() {
        assert_eq!(markdown_file_name(".hidden"), ".hidden.md");
    }

    #[test]
    fn empty_entry_list_produces_no_archive() {
        assert_eq!(write_archive(&[]).unwrap(), None);
    }

    #[test]
    fn archive_round_trips_entry_names_and_content() {
        let entries = vec![
            ExportEntry {
                name: "a.md".into(),
                content: "# A\n".into(),
            },
            ExportEntry {
                name: "b.md".into(),
                content: "body text".into(),
            },
        ];

        let bytes = write_archive(&entries).unwrap().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("a.md")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "# A\n");

        content.clear();
        archive
            .by_name("b.md")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "body text");
    }
}
