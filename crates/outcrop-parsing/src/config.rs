use thiserror::Error;

pub const DEFAULT_MAX_TOKENS_PER_PART: usize = 10_000;
pub const DEFAULT_OVERLAP_FRACTION: f64 = 0.15;
pub const DEFAULT_HEADER_MARGIN: f32 = 0.05;
pub const DEFAULT_FOOTER_MARGIN: f32 = 0.95;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("max tokens per part must be positive")]
    InvalidMaxTokens,
    #[error("overlap fraction must be in [0, 1), got {0}")]
    InvalidOverlap(f64),
    #[error("page margins must satisfy 0 <= header < footer <= 1, got {header} and {footer}")]
    InvalidMargins { header: f32, footer: f32 },
}

/// Configuration for the segmentation and windowing pipeline.
///
/// Built once, validated, and handed to [`crate::DocumentExtractor`]; nothing
/// in the pipeline reads the environment on its own.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    // ── chunker.rs ──
    pub(crate) max_tokens_per_part: usize,
    pub(crate) overlap_fraction: f64,

    // ── extractor.rs ──
    /// Prefix every emitted part with the abstract.
    pub(crate) append_abstract: bool,

    // ── page_filter.rs ──
    pub(crate) header_margin: f32,
    pub(crate) footer_margin: f32,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_part: DEFAULT_MAX_TOKENS_PER_PART,
            overlap_fraction: DEFAULT_OVERLAP_FRACTION,
            append_abstract: true,
            header_margin: DEFAULT_HEADER_MARGIN,
            footer_margin: DEFAULT_FOOTER_MARGIN,
        }
    }
}

impl ParsingConfig {
    pub fn max_tokens_per_part(&self) -> usize {
        self.max_tokens_per_part
    }

    pub fn overlap_fraction(&self) -> f64 {
        self.overlap_fraction
    }

    pub fn append_abstract(&self) -> bool {
        self.append_abstract
    }
}

/// Builder for [`ParsingConfig`].
///
/// [`build()`](Self::build) validates every field and fails fast; an invalid
/// chunking budget is never silently clamped.
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    max_tokens_per_part: Option<usize>,
    overlap_fraction: Option<f64>,
    append_abstract: Option<bool>,
    header_margin: Option<f32>,
    footer_margin: Option<f32>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Chunking ──

    pub fn max_tokens_per_part(mut self, n: usize) -> Self {
        self.max_tokens_per_part = Some(n);
        self
    }

    pub fn overlap_fraction(mut self, fraction: f64) -> Self {
        self.overlap_fraction = Some(fraction);
        self
    }

    pub fn append_abstract(mut self, append: bool) -> Self {
        self.append_abstract = Some(append);
        self
    }

    // ── Layout ──

    pub fn header_margin(mut self, fraction: f32) -> Self {
        self.header_margin = Some(fraction);
        self
    }

    pub fn footer_margin(mut self, fraction: f32) -> Self {
        self.footer_margin = Some(fraction);
        self
    }

    /// Validate and produce a [`ParsingConfig`].
    pub fn build(self) -> Result<ParsingConfig, ConfigError> {
        let max_tokens_per_part = self
            .max_tokens_per_part
            .unwrap_or(DEFAULT_MAX_TOKENS_PER_PART);
        if max_tokens_per_part == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }

        let overlap_fraction = self.overlap_fraction.unwrap_or(DEFAULT_OVERLAP_FRACTION);
        if !(0.0..1.0).contains(&overlap_fraction) {
            return Err(ConfigError::InvalidOverlap(overlap_fraction));
        }

        let header = self.header_margin.unwrap_or(DEFAULT_HEADER_MARGIN);
        let footer = self.footer_margin.unwrap_or(DEFAULT_FOOTER_MARGIN);
        if !(0.0..=1.0).contains(&header) || !(0.0..=1.0).contains(&footer) || header >= footer {
            return Err(ConfigError::InvalidMargins { header, footer });
        }

        Ok(ParsingConfig {
            max_tokens_per_part,
            overlap_fraction,
            append_abstract: self.append_abstract.unwrap_or(true),
            header_margin: header,
            footer_margin: footer,
        })
    }
}
