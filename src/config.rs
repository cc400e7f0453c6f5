//! Configuration for the conversion pipeline.
//!
//! All tunable behaviour lives in [`ConvertConfig`], built via its
//! [`ConvertConfigBuilder`]. Keeping the knobs in one struct makes it trivial
//! to share a config between the engine and the controller and to diff two
//! runs when their outputs differ.
//!
//! The Markdown rule set itself (ATX headings, fenced code, `-` bullets,
//! `*` emphasis) is **not** configurable: the transformer's
//! output must stay byte-stable across runs, which is a correctness property
//! downstream diffing relies on.

use crate::error::ConvertError;

/// Nominal body-text height (in points) above which a PDF run may become a
/// heading. Matches the common 12pt body / 14pt+ heading convention.
pub const DEFAULT_HEADING_MIN_HEIGHT: f32 = 14.0;

/// Configuration for a conversion run.
///
/// ```rust
/// use docmill::ConvertConfig;
///
/// let config = ConvertConfig::builder()
///     .pdf_heading_min_height(16.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Font-height threshold for the PDF heading heuristic, in PDF points.
    /// A text run taller than this *and* differing in height from the
    /// previous run is emitted as an `##` heading. Default: 14.0.
    ///
    /// Raise it for documents with large body text (slides); lower it for
    /// densely set papers where headings are only slightly larger than body
    /// copy.
    pub pdf_heading_min_height: f32,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            pdf_heading_min_height: DEFAULT_HEADING_MIN_HEIGHT,
        }
    }
}

impl ConvertConfig {
    /// Create a new builder for `ConvertConfig`.
    pub fn builder() -> ConvertConfigBuilder {
        ConvertConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConvertConfig`].
#[derive(Debug)]
pub struct ConvertConfigBuilder {
    config: ConvertConfig,
}

impl ConvertConfigBuilder {
    pub fn pdf_heading_min_height(mut self, points: f32) -> Self {
        self.config.pdf_heading_min_height = points;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConvertConfig, ConvertError> {
        let c = &self.config;
        if !c.pdf_heading_min_height.is_finite() || c.pdf_heading_min_height <= 0.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "pdf_heading_min_height must be a positive number of points, got {}",
                c.pdf_heading_min_height
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_matches_constant() {
        let config = ConvertConfig::default();
        assert_eq!(config.pdf_heading_min_height, DEFAULT_HEADING_MIN_HEIGHT);
    }

    #[test]
    fn builder_accepts_custom_threshold() {
        let config = ConvertConfig::builder()
            .pdf_heading_min_height(18.5)
            .build()
            .unwrap();
        assert_eq!(config.pdf_heading_min_height, 18.5);
    }

    #[test]
    fn builder_rejects_non_positive_threshold() {
        assert!(ConvertConfig::builder()
            .pdf_heading_min_height(0.0)
            .build()
            .is_err());
        assert!(ConvertConfig::builder()
            .pdf_heading_min_height(f32::NAN)
            .build()
            .is_err());
    }
}
