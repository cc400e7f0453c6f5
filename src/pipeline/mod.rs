//! Format-specific conversion stages.
//!
//! Two independent paths feed the engine:
//!
//! - **DOCX**: [`docx`] parses the OOXML package into intermediate HTML,
//!   then [`html_md`] rewrites that HTML into Markdown. The split keeps the
//!   OOXML reader free of Markdown concerns and gives the HTML rewriter a
//!   single well-formed input format.
//! - **PDF**: [`pdf`] reconstructs headings and paragraphs straight from the
//!   text layer. There is no HTML intermediate; PDF has no structure to
//!   translate, only layout to guess from.
//!
//! Each stage either succeeds with output (plus any structural warnings) or
//! fails with a [`ConvertError`](crate::error::ConvertError); nothing in
//! this module panics on malformed input.

pub mod docx;
pub mod html_md;
pub mod pdf;
