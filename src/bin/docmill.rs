//! CLI binary for docmill.
//!
//! A thin shim over the library crate: maps file paths to source documents,
//! runs the batch controller, and writes the resulting Markdown either as
//! individual files or as a single ZIP archive.

use anyhow::{Context, Result};
use clap::Parser;
use docmill::{
    export, BatchController, BatchProgressCallback, ConversionEngine, ConvertConfig, ItemState,
    ProgressCallback, SourceDocument, DOCX_MEDIA_TYPE, PDF_MEDIA_TYPE,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the whole batch, one printed log
/// line per finished document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Converting");
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_item_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_item_done(&self, _index: usize, _total: usize, name: &str, markdown_len: usize) {
        self.bar.println(format!(
            "  {} {:<32}  {}",
            green("✓"),
            name,
            dim(&format!("{markdown_len:>6} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, _index: usize, _total: usize, name: &str, error: &str) {
        let msg = truncate_message(error, 80);
        self.bar
            .println(format!("  {} {:<32}  {}", red("✗"), name, red(&msg)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total: usize, converted: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(converted);
        if failed == 0 {
            eprintln!(
                "{} {} files converted successfully",
                green("✔"),
                bold(&converted.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files converted  ({} failed)",
                if converted == 0 { red("✘") } else { cyan("⚠") },
                bold(&converted.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one file; report.md lands next to it
  docmill report.docx

  # Convert a mixed batch into a directory
  docmill notes.docx paper.pdf -o converted/

  # Convert a batch into a single ZIP archive
  docmill *.docx --zip converted.zip

  # Machine-readable per-file results
  docmill report.docx paper.pdf --json > results.json

SUPPORTED INPUTS:
  .docx   Word documents (headings, lists, tables, hyperlinks, emphasis)
  .pdf    PDF documents (best-effort text-layer reconstruction)

ENVIRONMENT VARIABLES:
  RUST_LOG          Tracing filter, e.g. RUST_LOG=docmill=debug
  PDFIUM_LIB_PATH   Path to an existing libpdfium shared library
"#;

/// Convert DOCX and PDF documents to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "docmill",
    version,
    about = "Convert DOCX and PDF documents to Markdown",
    long_about = "Convert Word (DOCX) and PDF documents to Markdown, entirely locally. \
DOCX conversion follows the document's own structure; PDF conversion reconstructs \
headings and paragraphs from the text layer.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input files (.docx or .pdf).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory to write .md files into. Defaults to each input's directory.
    #[arg(short, long, env = "DOCMILL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Write all results into one ZIP archive instead of separate files.
    #[arg(long, env = "DOCMILL_ZIP", conflicts_with = "output_dir")]
    zip: Option<PathBuf>,

    /// Print per-file results as JSON to stdout; no files are written.
    #[arg(long, env = "DOCMILL_JSON")]
    json: bool,

    /// Font-height threshold (PDF points) for the PDF heading heuristic.
    #[arg(long, env = "DOCMILL_HEADING_HEIGHT", default_value_t = docmill::DEFAULT_HEADING_MIN_HEIGHT)]
    heading_min_height: f32,

    /// Disable the progress bar.
    #[arg(long, env = "DOCMILL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCMILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCMILL_QUIET")]
    quiet: bool,
}

/// Truncate long error messages to keep output tidy. Error text can quote
/// arbitrary bytes from the input document, so the cut must land on a char
/// boundary, never inside a multibyte character.
fn truncate_message(error: &str, max: usize) -> String {
    if error.len() <= max {
        return error.to_string();
    }
    let mut cut = max - 1;
    while !error.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\u{2026}", &error[..cut])
}

/// Media type from the file extension; `None` for unsupported inputs.
fn media_type_for(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("docx") => Some(DOCX_MEDIA_TYPE),
        Some("pdf") => Some(PDF_MEDIA_TYPE),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load inputs ──────────────────────────────────────────────────────
    let config = ConvertConfig::builder()
        .pdf_heading_min_height(cli.heading_min_height)
        .build()
        .context("Invalid configuration")?;
    let engine = Arc::new(ConversionEngine::new(config));
    let mut batch = BatchController::new(engine);

    for path in &cli.inputs {
        let Some(media_type) = media_type_for(path) else {
            if !cli.quiet {
                eprintln!(
                    "{} skipping {} (only .docx and .pdf are supported)",
                    cyan("⚠"),
                    path.display()
                );
            }
            continue;
        };
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        batch.add(SourceDocument::new(name, media_type, bytes));
    }

    if batch.is_empty() {
        anyhow::bail!("No convertible inputs (expected .docx or .pdf files)");
    }

    if show_progress {
        let cb = CliProgressCallback::new(batch.items().len());
        batch = batch.with_callback(cb as ProgressCallback);
    }

    // ── Run the batch ────────────────────────────────────────────────────
    let summary = batch.run().await;

    // ── Write results ────────────────────────────────────────────────────
    if cli.json {
        let results: Vec<serde_json::Value> = batch
            .items()
            .iter()
            .map(|item| {
                let mut value = serde_json::to_value(item.state()).unwrap_or_default();
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("name".into(), item.name().into());
                }
                value
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("Failed to serialise results")?
        );
    } else if let Some(ref zip_path) = cli.zip {
        match export::write_archive(&batch.export_entries()).context("Failed to build archive")? {
            Some(bytes) => {
                tokio::fs::write(zip_path, bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", zip_path.display()))?;
                if !cli.quiet {
                    eprintln!(
                        "{} wrote {} entries to {}",
                        green("✔"),
                        summary.converted,
                        bold(&zip_path.display().to_string())
                    );
                }
            }
            None => eprintln!("{} nothing converted, no archive written", red("✘")),
        }
    } else {
        for (item, entry) in batch
            .items()
            .iter()
            .filter(|item| item.state().is_done())
            .zip(batch.export_entries())
        {
            let input = cli
                .inputs
                .iter()
                .find(|p| p.file_name().is_some_and(|n| n.to_string_lossy() == item.name()));
            let out_path = match (&cli.output_dir, input) {
                (Some(dir), _) => dir.join(&entry.name),
                (None, Some(input)) => input.with_file_name(&entry.name),
                (None, None) => PathBuf::from(&entry.name),
            };
            if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tokio::fs::write(&out_path, entry.content.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", out_path.display()))?;
        }
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet && !show_progress && !cli.json {
        eprintln!("Converted {}/{} files", summary.converted, summary.selected);
        for item in batch.items() {
            if let ItemState::Failed { message } = item.state() {
                eprintln!("  {} {}: {}", red("✗"), item.name(), message);
            }
        }
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{media_type_for, truncate_message};
    use std::path::Path;

    #[test]
    fn short_messages_pass_through_untouched() {
        assert_eq!(truncate_message("boom", 80), "boom");
    }

    #[test]
    fn truncation_never_splits_a_multibyte_character() {
        // 78 ASCII bytes, then two-byte characters spanning the cut point:
        // byte 79 falls inside the first 'é', so the cut must back up to 78.
        let msg = format!("{}ééééé", "x".repeat(78));
        let out = truncate_message(&msg, 80);
        assert_eq!(out, format!("{}\u{2026}", "x".repeat(78)));
    }

    #[test]
    fn truncation_keeps_a_whole_character_on_the_boundary() {
        // Byte 79 is a char boundary here; the 'é' at bytes 77..79 survives.
        let msg = format!("{}é{}", "x".repeat(77), "y".repeat(10));
        let out = truncate_message(&msg, 80);
        assert_eq!(out, format!("{}é\u{2026}", "x".repeat(77)));
    }

    #[test]
    fn media_type_is_derived_from_the_extension() {
        assert!(media_type_for(Path::new("a.DOCX")).is_some());
        assert!(media_type_for(Path::new("b.pdf")).is_some());
        assert!(media_type_for(Path::new("c.txt")).is_none());
        assert!(media_type_for(Path::new("noext")).is_none());
    }
}
