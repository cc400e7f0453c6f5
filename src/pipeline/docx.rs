//! Structural HTML extraction from DOCX packages.
//!
//! A `.docx` file is a ZIP package of XML parts. This stage reads
//! `word/document.xml` as a stream of XML events and emits HTML that keeps
//! the logical structure (headings, paragraphs, lists, tables, hyperlinks,
//! basic emphasis) and nothing else. Visual fidelity (fonts, spacing,
//! colours) is out of scope.
//!
//! Non-fatal anomalies (a style with no mapping, a hyperlink relationship
//! with no target, an embedded image) surface as [`StructuralWarning`]s and
//! never block HTML production. Extraction fails only when the bytes are not
//! a readable package at all: not a ZIP, or no parsable `word/document.xml`.
//!
//! ZIP inflation and XML parsing are CPU-bound, so the public entry point
//! runs the work under `spawn_blocking`, same as the pdfium stage.

use crate::error::{ConvertError, StructuralWarning};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

/// Output of the DOCX stage: structural HTML plus collected warnings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocxExtraction {
    pub html: String,
    pub warnings: Vec<StructuralWarning>,
}

/// Extract structural HTML from DOCX bytes.
///
/// # Errors
/// [`ConvertError::DocxParse`] when the bytes cannot be read as a DOCX
/// package. Structural anomalies inside a readable package are warnings,
/// not errors.
pub async fn extract_html(bytes: Vec<u8>) -> Result<DocxExtraction, ConvertError> {
    tokio::task::spawn_blocking(move || extract_html_blocking(&bytes))
        .await
        .map_err(|e| ConvertError::Internal(format!("DOCX extraction task failed: {e}")))?
}

/// Blocking implementation of [`extract_html`].
pub fn extract_html_blocking(bytes: &[u8]) -> Result<DocxExtraction, ConvertError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        ConvertError::DocxParse {
            detail: format!("not a ZIP package: {e}"),
        }
    })?;

    let document_xml = read_part(&mut archive, "word/document.xml")?.ok_or_else(|| {
        ConvertError::DocxParse {
            detail: "package has no word/document.xml part".into(),
        }
    })?;

    // The rels part is optional; without it hyperlinks degrade to plain text.
    let link_targets = match read_part(&mut archive, "word/_rels/document.xml.rels")? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };

    let extraction = BodyParser::new(link_targets).parse(&document_xml)?;
    debug!(
        html_len = extraction.html.len(),
        warnings = extraction.warnings.len(),
        "DOCX extraction complete"
    );
    Ok(extraction)
}

/// Read one named part out of the package, `None` when absent.
fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, ConvertError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ConvertError::DocxParse {
                detail: format!("cannot open part '{name}': {e}"),
            })
        }
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| ConvertError::DocxParse {
            detail: format!("cannot read part '{name}': {e}"),
        })?;
    Ok(Some(content))
}

/// Parse `word/_rels/document.xml.rels` into an id → target map.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    if let (Some(id), Some(target)) = (id, target) {
                        targets.insert(id, target);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

fn attr_value(element: &BytesStart<'_>, local_name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local_name)
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}

fn xml_err(e: quick_xml::Error) -> ConvertError {
    ConvertError::DocxParse {
        detail: format!("malformed XML: {e}"),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Is a toggle property value explicitly off (`w:val="false"` / `"0"`)?
fn is_off(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("false") | Some("0") | Some("none"))
}

// ── Body parser ──────────────────────────────────────────────────────────────

/// Streaming state machine over `word/document.xml`.
///
/// Paragraph content nests (runs inside hyperlinks inside paragraphs inside
/// table cells), so the parser keeps one small buffer per level and flushes
/// upward on each closing tag.
struct BodyParser {
    link_targets: HashMap<String, String>,

    html: String,
    warnings: Vec<StructuralWarning>,
    reported_styles: BTreeSet<String>,
    reported_constructs: BTreeSet<String>,

    // Paragraph state
    in_paragraph: bool,
    paragraph_html: String,
    paragraph_style: Option<String>,
    paragraph_numbered: bool,
    /// Consecutive list paragraphs awaiting their closing `</ul>`.
    pending_list_items: Vec<String>,

    // Run state
    in_run: bool,
    in_run_properties: bool,
    in_text: bool,
    run_html: String,
    run_bold: bool,
    run_italic: bool,
    run_strike: bool,

    // Hyperlink state
    in_link: bool,
    link_html: String,
    link_href: Option<String>,

    // Table state (only the outermost table keeps row/cell structure)
    table_depth: usize,
    table_rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
}

impl BodyParser {
    fn new(link_targets: HashMap<String, String>) -> Self {
        Self {
            link_targets,
            html: String::new(),
            warnings: Vec::new(),
            reported_styles: BTreeSet::new(),
            reported_constructs: BTreeSet::new(),
            in_paragraph: false,
            paragraph_html: String::new(),
            paragraph_style: None,
            paragraph_numbered: false,
            pending_list_items: Vec::new(),
            in_run: false,
            in_run_properties: false,
            in_text: false,
            run_html: String::new(),
            run_bold: false,
            run_italic: false,
            run_strike: false,
            in_link: false,
            link_html: String::new(),
            link_href: None,
            table_depth: 0,
            table_rows: Vec::new(),
            current_row: Vec::new(),
            current_cell: String::new(),
        }
    }

    fn parse(mut self, xml: &str) -> Result<DocxExtraction, ConvertError> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event().map_err(xml_err)? {
                Event::Start(e) => self.on_start(&e),
                Event::Empty(e) => {
                    // An empty element is an open/close pair with no content.
                    self.on_start(&e);
                    self.on_end(e.local_name().as_ref());
                }
                Event::End(e) => self.on_end(e.local_name().as_ref()),
                Event::Text(t) => {
                    if self.in_text {
                        let text = t.unescape().map_err(xml_err)?;
                        self.run_html.push_str(&escape_html(&text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        self.flush_pending_list();
        Ok(DocxExtraction {
            html: self.html,
            warnings: self.warnings,
        })
    }

    fn on_start(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"p" => {
                self.in_paragraph = true;
                self.paragraph_html.clear();
                self.paragraph_style = None;
                self.paragraph_numbered = false;
            }
            b"pStyle" if self.in_paragraph => {
                self.paragraph_style = attr_value(e, b"val");
            }
            b"numPr" if self.in_paragraph && !self.in_run => {
                self.paragraph_numbered = true;
            }
            b"r" => {
                self.in_run = true;
                self.run_html.clear();
                self.run_bold = false;
                self.run_italic = false;
                self.run_strike = false;
            }
            b"rPr" if self.in_run => self.in_run_properties = true,
            b"b" if self.in_run_properties => {
                self.run_bold = !is_off(&attr_value(e, b"val"));
            }
            b"i" if self.in_run_properties => {
                self.run_italic = !is_off(&attr_value(e, b"val"));
            }
            b"strike" if self.in_run_properties => {
                self.run_strike = !is_off(&attr_value(e, b"val"));
            }
            b"t" if self.in_run => self.in_text = true,
            b"br" if self.in_run => self.run_html.push_str("<br />"),
            b"tab" if self.in_run && !self.in_run_properties => self.run_html.push(' '),
            b"hyperlink" if self.in_paragraph => {
                self.in_link = true;
                self.link_html.clear();
                self.link_href = self.resolve_link_target(e);
            }
            b"drawing" | b"pict" | b"object" => {
                self.warn_construct("image");
            }
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.flush_pending_list();
                    self.table_rows.clear();
                } else {
                    self.warn_construct("nested table");
                }
            }
            b"tr" if self.table_depth == 1 => self.current_row.clear(),
            b"tc" if self.table_depth == 1 => self.current_cell.clear(),
            _ => {}
        }
    }

    fn on_end(&mut self, local_name: &[u8]) {
        match local_name {
            b"t" => self.in_text = false,
            b"rPr" => self.in_run_properties = false,
            b"r" => self.flush_run(),
            b"hyperlink" => self.flush_link(),
            b"p" => self.flush_paragraph(),
            b"tc" if self.table_depth == 1 => {
                let cell = std::mem::take(&mut self.current_cell);
                self.current_row.push(cell);
            }
            b"tr" if self.table_depth == 1 => {
                let row = std::mem::take(&mut self.current_row);
                self.table_rows.push(row);
            }
            b"tbl" => {
                if self.table_depth == 1 {
                    self.flush_table();
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    // ── Flushing, innermost level first ──────────────────────────────────

    fn flush_run(&mut self) {
        self.in_run = false;
        self.in_run_properties = false;
        let mut html = std::mem::take(&mut self.run_html);
        if html.is_empty() {
            return;
        }
        if self.run_italic {
            html = format!("<em>{html}</em>");
        }
        if self.run_bold {
            html = format!("<strong>{html}</strong>");
        }
        if self.run_strike {
            html = format!("<del>{html}</del>");
        }
        if self.in_link {
            self.link_html.push_str(&html);
        } else {
            self.paragraph_html.push_str(&html);
        }
    }

    fn flush_link(&mut self) {
        self.in_link = false;
        let inner = std::mem::take(&mut self.link_html);
        if inner.is_empty() {
            return;
        }
        match self.link_href.take() {
            Some(href) => {
                self.paragraph_html
                    .push_str(&format!("<a href=\"{}\">{inner}</a>", escape_html(&href)));
            }
            // Warning was recorded when the reference failed to resolve.
            None => self.paragraph_html.push_str(&inner),
        }
    }

    fn flush_paragraph(&mut self) {
        self.in_paragraph = false;
        let inner = std::mem::take(&mut self.paragraph_html);
        let style = self.paragraph_style.take();
        let numbered = std::mem::take(&mut self.paragraph_numbered);
        if inner.is_empty() {
            return;
        }

        // Paragraphs inside a table cell stay plain; the cell provides the
        // structure.
        if self.table_depth > 0 {
            self.current_cell.push_str(&format!("<p>{inner}</p>"));
            return;
        }

        // Explicit numbering or the ListParagraph style both mean "list item".
        if numbered || style.as_deref() == Some("ListParagraph") {
            self.pending_list_items.push(inner);
            return;
        }

        let block = match style.as_deref() {
            Some("Title") => format!("<h1>{inner}</h1>"),
            Some(s) if s.starts_with("Heading") => match s["Heading".len()..].parse::<u8>() {
                // Word styles go to Heading9; HTML stops at h6.
                Ok(level @ 1..=9) => {
                    let level = level.min(6);
                    format!("<h{level}>{inner}</h{level}>")
                }
                _ => {
                    self.warn_style(s);
                    format!("<p>{inner}</p>")
                }
            },
            Some("Normal") | None => format!("<p>{inner}</p>"),
            Some(s) => {
                self.warn_style(s);
                format!("<p>{inner}</p>")
            }
        };

        self.flush_pending_list();
        self.html.push_str(&block);
    }

    fn flush_pending_list(&mut self) {
        if self.pending_list_items.is_empty() {
            return;
        }
        self.html.push_str("<ul>");
        for item in std::mem::take(&mut self.pending_list_items) {
            self.html.push_str(&format!("<li>{item}</li>"));
        }
        self.html.push_str("</ul>");
    }

    fn flush_table(&mut self) {
        let rows = std::mem::take(&mut self.table_rows);
        if rows.is_empty() {
            return;
        }
        self.html.push_str("<table>");
        for row in rows {
            self.html.push_str("<tr>");
            for cell in row {
                self.html.push_str(&format!("<td>{cell}</td>"));
            }
            self.html.push_str("</tr>");
        }
        self.html.push_str("</table>");
    }

    // ── Warnings ─────────────────────────────────────────────────────────

    fn resolve_link_target(&mut self, e: &BytesStart<'_>) -> Option<String> {
        if let Some(id) = attr_value(e, b"id") {
            match self.link_targets.get(&id) {
                Some(target) => return Some(target.clone()),
                None => {
                    self.warnings
                        .push(StructuralWarning::UnresolvedHyperlink { id });
                    return None;
                }
            }
        }
        // Internal bookmark link.
        attr_value(e, b"anchor").map(|anchor| format!("#{anchor}"))
    }

    fn warn_style(&mut self, style_id: &str) {
        if self.reported_styles.insert(style_id.to_string()) {
            self.warnings.push(StructuralWarning::UnknownStyle {
                style_id: style_id.to_string(),
            });
        }
    }

    fn warn_construct(&mut self, construct: &str) {
        if self.reported_constructs.insert(construct.to_string()) {
            self.warnings.push(StructuralWarning::DegradedConstruct {
                construct: construct.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    const RELS_WITH_LINK: &str = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    fn wrap_body(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
            xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:body>{body}</w:body>
</w:document>"#
        )
    }

    fn build_docx(document_xml: &str, rels: Option<&str>) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        writer
            .start_file("[Content_Types].xml", options)
            .unwrap();
        writer
            .write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
            .unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        if let Some(rels) = rels {
            writer
                .start_file("word/_rels/document.xml.rels", options)
                .unwrap();
            writer.write_all(rels.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn extract(body: &str) -> DocxExtraction {
        let bytes = build_docx(&wrap_body(body), Some(RELS_WITH_LINK));
        extract_html_blocking(&bytes).unwrap()
    }

    #[test]
    fn plain_paragraph_becomes_p() {
        let out = extract("<w:p><w:r><w:t>Hello world</w:t></w:r></w:p>");
        assert_eq!(out.html, "<p>Hello world</p>");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn heading_styles_map_to_heading_tags() {
        let out = extract(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Section</w:t></w:r></w:p>"#,
        );
        assert_eq!(out.html, "<h2>Section</h2>");
    }

    #[test]
    fn title_style_maps_to_h1() {
        let out = extract(
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Doc</w:t></w:r></w:p>"#,
        );
        assert_eq!(out.html, "<h1>Doc</h1>");
    }

    #[test]
    fn deep_heading_clamps_to_h6() {
        let out = extract(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading8"/></w:pPr><w:r><w:t>Deep</w:t></w:r></w:p>"#,
        );
        assert_eq!(out.html, "<h6>Deep</h6>");
    }

    #[test]
    fn run_formatting_nests_emphasis_tags() {
        let out = extract(
            r#"<w:p><w:r><w:rPr><w:b/><w:i/></w:rPr><w:t>both</w:t></w:r></w:p>"#,
        );
        assert_eq!(out.html, "<p><strong><em>both</em></strong></p>");
    }

    #[test]
    fn explicitly_disabled_toggle_is_ignored() {
        let out = extract(
            r#"<w:p><w:r><w:rPr><w:b w:val="false"/></w:rPr><w:t>plain</w:t></w:r></w:p>"#,
        );
        assert_eq!(out.html, "<p>plain</p>");
    }

    #[test]
    fn strike_maps_to_del() {
        let out = extract(
            r#"<w:p><w:r><w:rPr><w:strike/></w:rPr><w:t>old</w:t></w:r></w:p>"#,
        );
        assert_eq!(out.html, "<p><del>old</del></p>");
    }

    #[test]
    fn consecutive_list_paragraphs_group_into_one_ul() {
        let li = |text: &str| {
            format!(
                r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
            )
        };
        let body = format!(
            "{}{}<w:p><w:r><w:t>after</w:t></w:r></w:p>",
            li("one"),
            li("two")
        );
        let out = extract(&body);
        assert_eq!(out.html, "<ul><li>one</li><li>two</li></ul><p>after</p>");
    }

    #[test]
    fn resolved_hyperlink_becomes_anchor() {
        let out = extract(
            r#"<w:p><w:hyperlink r:id="rId1"><w:r><w:t>link</w:t></w:r></w:hyperlink></w:p>"#,
        );
        assert_eq!(
            out.html,
            r#"<p><a href="https://example.com">link</a></p>"#
        );
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn unresolved_hyperlink_degrades_with_warning() {
        let out = extract(
            r#"<w:p><w:hyperlink r:id="rId99"><w:r><w:t>lost</w:t></w:r></w:hyperlink></w:p>"#,
        );
        assert_eq!(out.html, "<p>lost</p>");
        assert_eq!(
            out.warnings,
            vec![StructuralWarning::UnresolvedHyperlink {
                id: "rId99".into()
            }]
        );
    }

    #[test]
    fn table_rows_and_cells_are_preserved() {
        let cell = |text: &str| format!("<w:tc><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>");
        let body = format!(
            "<w:tbl><w:tr>{}{}</w:tr><w:tr>{}{}</w:tr></w:tbl>",
            cell("A"),
            cell("B"),
            cell("1"),
            cell("2")
        );
        let out = extract(&body);
        assert_eq!(
            out.html,
            "<table><tr><td><p>A</p></td><td><p>B</p></td></tr>\
<tr><td><p>1</p></td><td><p>2</p></td></tr></table>"
        );
    }

    #[test]
    fn unknown_style_warns_once_and_renders_paragraph() {
        let styled = r#"<w:p><w:pPr><w:pStyle w:val="FancyQuote"/></w:pPr><w:r><w:t>x</w:t></w:r></w:p>"#;
        let out = extract(&format!("{styled}{styled}"));
        assert_eq!(out.html, "<p>x</p><p>x</p>");
        assert_eq!(
            out.warnings,
            vec![StructuralWarning::UnknownStyle {
                style_id: "FancyQuote".into()
            }]
        );
    }

    #[test]
    fn embedded_image_reports_degradation() {
        let out = extract("<w:p><w:r><w:drawing/><w:t>caption</w:t></w:r></w:p>");
        assert_eq!(out.html, "<p>caption</p>");
        assert_eq!(
            out.warnings,
            vec![StructuralWarning::DegradedConstruct {
                construct: "image".into()
            }]
        );
    }

    #[test]
    fn text_is_html_escaped() {
        let out = extract("<w:p><w:r><w:t>a &lt; b &amp; c</w:t></w:r></w:p>");
        assert_eq!(out.html, "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn line_break_becomes_br() {
        let out = extract("<w:p><w:r><w:t>one</w:t><w:br/><w:t>two</w:t></w:r></w:p>");
        assert_eq!(out.html, "<p>one<br />two</p>");
    }

    #[test]
    fn non_zip_bytes_fail_with_parse_error() {
        let err = extract_html_blocking(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ConvertError::DocxParse { .. }));
    }

    #[test]
    fn zip_without_document_part_fails() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("unrelated.txt", FileOptions::default())
            .unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_html_blocking(&bytes).unwrap_err();
        match err {
            ConvertError::DocxParse { detail } => {
                assert!(detail.contains("word/document.xml"), "got: {detail}")
            }
            other => panic!("expected DocxParse, got {other:?}"),
        }
    }

    #[test]
    fn missing_rels_part_degrades_links_silently() {
        let body =
            r#"<w:p><w:hyperlink r:id="rId1"><w:r><w:t>link</w:t></w:r></w:hyperlink></w:p>"#;
        let bytes = build_docx(&wrap_body(body), None);
        let out = extract_html_blocking(&bytes).unwrap();
        assert_eq!(out.html, "<p>link</p>");
        assert_eq!(out.warnings.len(), 1);
    }
}
