//! HTML → Markdown transformation via a fixed rule table.
//!
//! ## Why a fixed rule set?
//!
//! The transformer's output feeds diffs, archives, and re-runs; it must be
//! byte-stable. Every structural element maps through exactly one named rule:
//!
//! | HTML                      | Markdown                         |
//! |---------------------------|----------------------------------|
//! | `h1`–`h6`                 | ATX headings (`#`…`######`)      |
//! | `pre`                     | fenced code block                |
//! | `ul` / `ol`               | `-` bullets / `1.` numbering     |
//! | `em`, `i`                 | `*italic*`                       |
//! | `strong`, `b`             | `**bold**`                       |
//! | `del`, `s`, `strike`      | `~~strikethrough~~` (GFM)        |
//! | `a[href]`                 | `[text](href)`                   |
//! | `table` / `tr` / `th,td`  | GFM pipe table + separator row   |
//! | `blockquote`              | `> ` prefix                      |
//! | `code`                    | inline backticks                 |
//! | `br` / `hr`               | line break / `---`               |
//!
//! Parsing uses html5ever, which recovers from arbitrarily malformed markup,
//! so [`transform`] is total: it never fails. Elements with no rule flatten
//! to their text content and are reported as [`StructuralWarning`]s; the
//! degradation is data the caller can assert on, not a log line.

use crate::error::StructuralWarning;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Result of one transformation: Markdown plus observed degradations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transformed {
    pub markdown: String,
    pub degradations: Vec<StructuralWarning>,
}

/// Convert structured HTML to GitHub-flavored Markdown.
///
/// Pure and deterministic: same input, same output, no I/O. Malformed or
/// unsupported HTML degrades to best-effort text; this function never fails.
pub fn transform(html: &str) -> Transformed {
    let dom: RcDom = parse_document(RcDom::default(), Default::default()).one(html);

    let mut renderer = Renderer::default();
    let root = find_body(&dom.document).unwrap_or_else(|| dom.document.clone());
    let raw = renderer.render_children(&root, false);

    Transformed {
        markdown: tidy(&raw),
        degradations: renderer.degradations,
    }
}

// ── DOM helpers ──────────────────────────────────────────────────────────────

/// Locate the `<body>` element html5ever inserts around fragment input.
fn find_body(node: &Handle) -> Option<Handle> {
    if let NodeData::Element { ref name, .. } = node.data {
        if name.local.as_ref() == "body" {
            return Some(node.clone());
        }
    }
    for child in node.children.borrow().iter() {
        if let Some(found) = find_body(child) {
            return Some(found);
        }
    }
    None
}

fn element_attr(node: &Handle, attr_name: &str) -> Option<String> {
    if let NodeData::Element { ref attrs, .. } = node.data {
        return attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.to_string());
    }
    None
}

fn element_tag(node: &Handle) -> Option<String> {
    if let NodeData::Element { ref name, .. } = node.data {
        Some(name.local.as_ref().to_string())
    } else {
        None
    }
}

// ── Renderer ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Renderer {
    degradations: Vec<StructuralWarning>,
    /// Tags already reported, to avoid one warning per occurrence.
    degraded_tags: BTreeSet<String>,
}

impl Renderer {
    fn render_children(&mut self, node: &Handle, in_pre: bool) -> String {
        let mut out = String::new();
        for child in node.children.borrow().iter() {
            out.push_str(&self.render_node(child, in_pre));
        }
        out
    }

    fn render_node(&mut self, node: &Handle, in_pre: bool) -> String {
        match node.data {
            NodeData::Text { ref contents } => {
                let text = contents.borrow().to_string();
                if in_pre {
                    text
                } else {
                    collapse_whitespace(&text)
                }
            }
            NodeData::Element { ref name, .. } => {
                let tag = name.local.as_ref().to_string();
                self.render_element(&tag, node, in_pre)
            }
            NodeData::Document => self.render_children(node, in_pre),
            // Comments, doctypes, processing instructions carry no content.
            _ => String::new(),
        }
    }

    fn render_element(&mut self, tag: &str, node: &Handle, in_pre: bool) -> String {
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag.as_bytes()[1] - b'0';
                let text = self.render_children(node, false);
                let text = text.trim();
                if text.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{} {}\n\n", "#".repeat(level as usize), text)
                }
            }
            "p" => {
                let text = self.render_children(node, false);
                let text = text.trim();
                if text.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{text}\n\n")
                }
            }
            "br" => "\n".to_string(),
            "hr" => "\n\n---\n\n".to_string(),
            "em" | "i" => self.wrap_inline(node, "*"),
            "strong" | "b" => self.wrap_inline(node, "**"),
            "del" | "s" | "strike" => self.wrap_inline(node, "~~"),
            "code" => {
                if in_pre {
                    // Inner <code> of a fenced block: flatten to raw text.
                    return self.render_children(node, true);
                }
                let text = self.render_children(node, true);
                if text.trim().is_empty() {
                    String::new()
                } else {
                    format!("`{}`", text.trim())
                }
            }
            "pre" => {
                // Fenced, never indented; inner <code> flattens to raw text.
                let text = self.render_children(node, true);
                let text = text.trim_matches('\n');
                format!("\n\n```\n{text}\n```\n\n")
            }
            "a" => {
                let text = self.render_children(node, false);
                let text = text.trim();
                match element_attr(node, "href") {
                    Some(href) if !text.is_empty() && !href.is_empty() => {
                        format!("[{text}]({href})")
                    }
                    _ => text.to_string(),
                }
            }
            "ul" => self.render_list(node, false),
            "ol" => self.render_list(node, true),
            "table" => self.render_table(node),
            "blockquote" => {
                let inner = tidy(&self.render_children(node, false));
                if inner.is_empty() {
                    String::new()
                } else {
                    let quoted: Vec<String> =
                        inner.lines().map(|l| format!("> {l}").trim_end().to_string()).collect();
                    format!("\n\n{}\n\n", quoted.join("\n"))
                }
            }
            // Transparent containers: render children in place.
            "html" | "body" | "div" | "span" | "section" | "article" | "main" | "header"
            | "footer" | "thead" | "tbody" | "tfoot" | "tr" | "th" | "td" | "li" | "figure"
            | "figcaption" | "font" | "u" => self.render_children(node, in_pre),
            // Non-content elements: drop entirely.
            "head" | "script" | "style" | "title" | "meta" | "link" => String::new(),
            // No rule: keep the text, record the degradation once per tag.
            other => {
                if self.degraded_tags.insert(other.to_string()) {
                    self.degradations.push(StructuralWarning::DegradedConstruct {
                        construct: other.to_string(),
                    });
                }
                self.render_children(node, in_pre)
            }
        }
    }

    fn wrap_inline(&mut self, node: &Handle, delimiter: &str) -> String {
        let text = self.render_children(node, false);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{delimiter}{trimmed}{delimiter}")
        }
    }

    fn render_list(&mut self, node: &Handle, ordered: bool) -> String {
        let mut out = String::from("\n\n");
        let mut index = 0usize;
        for child in node.children.borrow().iter() {
            if element_tag(child).as_deref() != Some("li") {
                continue;
            }
            index += 1;
            let marker = if ordered {
                format!("{index}.")
            } else {
                "-".to_string()
            };
            let content = tidy(&self.render_children(child, false));
            // Tighten the item, then indent continuation lines (nested
            // lists, multi-line items) to the content column.
            let content = content.replace("\n\n", "\n");
            let continuation_indent = format!("\n{}", " ".repeat(marker.len() + 1));
            let content = content.replace('\n', &continuation_indent);
            out.push_str(&format!("{marker} {content}\n"));
        }
        if index == 0 {
            return String::new();
        }
        out.push('\n');
        out
    }

    /// Pipe-table rendering. The first row becomes the header row, followed
    /// by the `| --- |` separator, plain `<td>`-only tables included.
    fn render_table(&mut self, node: &Handle) -> String {
        let mut rows: Vec<Vec<String>> = Vec::new();
        self.collect_rows(node, &mut rows);
        if rows.is_empty() {
            return String::new();
        }

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return String::new();
        }
        for row in &mut rows {
            row.resize(columns, String::new());
        }

        let render_row =
            |row: &[String]| -> String { format!("| {} |", row.join(" | ")) };

        let mut out = String::from("\n\n");
        out.push_str(&render_row(&rows[0]));
        out.push('\n');
        out.push_str(&render_row(&vec!["---".to_string(); columns]));
        for row in &rows[1..] {
            out.push('\n');
            out.push_str(&render_row(row));
        }
        out.push_str("\n\n");
        out
    }

    fn collect_rows(&mut self, node: &Handle, rows: &mut Vec<Vec<String>>) {
        for child in node.children.borrow().iter() {
            match element_tag(child).as_deref() {
                Some("tr") => {
                    let mut cells = Vec::new();
                    for cell in child.children.borrow().iter() {
                        if matches!(element_tag(cell).as_deref(), Some("th") | Some("td")) {
                            let content = self.render_children(cell, false);
                            let content = collapse_whitespace(&content);
                            cells.push(content.trim().replace('|', "\\|"));
                        }
                    }
                    rows.push(cells);
                }
                Some("thead") | Some("tbody") | Some("tfoot") => {
                    self.collect_rows(child, rows);
                }
                _ => {}
            }
        }
    }
}

// ── Whitespace normalisation ─────────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());
static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Collapse inline whitespace runs to single spaces (HTML semantics).
fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").to_string()
}

/// Final assembly: strip trailing spaces, collapse blank-line runs, trim.
fn tidy(raw: &str) -> String {
    let no_trailing = RE_TRAILING_SPACE.replace_all(raw, "\n");
    let collapsed = RE_BLANK_RUNS.replace_all(&no_trailing, "\n\n");
    collapsed.trim().to_string()
}
