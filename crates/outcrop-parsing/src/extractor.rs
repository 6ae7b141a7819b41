use std::sync::Arc;

use outcrop_core::{PageLayout, PageSource};

use crate::ParsingError;
use crate::abstract_text::extract_abstract;
use crate::chunker::{TokenChunker, Tokenizer};
use crate::config::ParsingConfig;
use crate::context::KeywordContextFinder;
use crate::page_filter::{PageMargins, filter_page_words};
use crate::section::{EndingMatcher, ending_page_threshold};
use crate::tables::detect_tables;
use crate::text_processing::{expand_ligatures, strip_references};

/// A page whose text was dropped from the body.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    /// 0-based page index.
    pub page: usize,
    pub message: String,
}

/// Abstract and cleaned body text of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    pub abstract_text: String,
    /// Body pages after table removal, header/footer stripping, back-matter
    /// trimming and reference stripping, joined with single spaces.
    pub body: String,
    /// Number of body pages visited, including the one that stopped the scan.
    pub pages_read: usize,
    /// Page on which a back-matter heading ended the body, if any.
    pub stopped_at: Option<usize>,
    pub page_failures: Vec<PageFailure>,
}

impl ExtractedText {
    pub fn is_empty(&self) -> bool {
        self.abstract_text.is_empty() && self.body.is_empty()
    }
}

/// Extraction-ready parts of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedText {
    pub parts: Vec<String>,
    /// Sum of the token counts of `parts`.
    pub total_tokens: usize,
    pub abstract_text: String,
    pub page_failures: Vec<PageFailure>,
}

/// Runs the segmentation pipeline over an opened document.
///
/// Page one only feeds the abstract. Every later page goes through table
/// detection, margin and table filtering, ligature expansion and reference
/// stripping. From [`ending_page_threshold`] on, each page is also checked for
/// a back-matter heading; the first one found truncates that page and ends the
/// body.
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    config: ParsingConfig,
    ending: EndingMatcher,
    context: KeywordContextFinder,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(ParsingConfig::default())
    }
}

impl DocumentExtractor {
    pub fn new(config: ParsingConfig) -> Self {
        Self {
            config,
            ending: EndingMatcher::default(),
            context: KeywordContextFinder::with_default_keywords(),
        }
    }

    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Body words of one page, joined with spaces and with ligatures expanded.
    ///
    /// Fails only when the page geometry cannot be filtered at all.
    pub fn page_text(&self, page: &PageLayout) -> Result<String, ParsingError> {
        if !page.height.is_finite() || page.height <= 0.0 {
            return Err(ParsingError::MalformedPage {
                page: page.index,
                reason: format!("page height {} is not usable", page.height),
            });
        }

        let detection = detect_tables(page);
        let tables = detection.boxes();
        if !tables.is_empty() {
            tracing::debug!(
                page = page.index,
                tables = tables.len(),
                "excluding table regions"
            );
        }

        let margins = PageMargins::from_fractions(
            page.height,
            self.config.header_margin,
            self.config.footer_margin,
        );
        let words = filter_page_words(&page.words, &tables, margins);
        Ok(expand_ligatures(&words.join(" ")))
    }

    /// Pull the abstract and the cleaned body text out of `source`.
    ///
    /// A page that fails to load or filter is skipped and recorded in
    /// [`ExtractedText::page_failures`]; it never aborts the document.
    pub fn extract_text(&self, source: &dyn PageSource) -> ExtractedText {
        let total = source.page_count();
        let mut out = ExtractedText::default();
        if total == 0 {
            return out;
        }

        let threshold = ending_page_threshold(total);
        tracing::debug!(pages = total, threshold, "starting extraction");

        match source.load_page(0) {
            Ok(first) => {
                out.abstract_text =
                    extract_abstract(&first.words);
            }
            Err(e) => {
                tracing::warn!(page = 0, error = %e, "first page unreadable, no abstract");
                out.page_failures.push(PageFailure {
                    page: 0,
                    message: e.to_string(),
                });
            }
        }

        let mut segments: Vec<String> = Vec::new();
        for index in 1..total {
            out.pages_read += 1;

            let text = match source
                .load_page(index)
                .map_err(ParsingError::from)
                .and_then(|page| self.page_text(&page))
            {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(page = index, error = %e, "dropping page");
                    out.page_failures.push(PageFailure {
                        page: index,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            if index >= threshold
                && let Some(kept) = self.ending.truncate(&text)
            {
                let cleaned = strip_references(kept);
                if !cleaned.is_empty() {
                    segments.push(cleaned);
                }
                tracing::info!(page = index, "back matter reached, stopping");
                out.stopped_at = Some(index);
                break;
            }

            let cleaned = strip_references(&text);
            if !cleaned.is_empty() {
                segments.push(cleaned);
            }
        }

        out.body = segments.join(" ");
        out
    }

    /// Window the body around trigger phrases and cut it into token-bounded
    /// parts, each optionally prefixed with the abstract.
    pub fn prepare(
        &self,
        extracted: ExtractedText,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<PreparedText, ParsingError> {
        let chunker = TokenChunker::new(
            tokenizer,
            self.config.max_tokens_per_part,
            self.config.overlap_fraction,
        )?;

        let windowed = self.context.find_contexts(&extracted.body);
        tracing::debug!(
            body_chars = extracted.body.chars().count(),
            windowed_chars = windowed.chars().count(),
            "context windows selected"
        );

        let mut parts = chunker.split(&windowed)?;
        if self.config.append_abstract && !extracted.abstract_text.is_empty() {
            for part in &mut parts {
                *part = format!("{} {}", extracted.abstract_text, part);
            }
        }

        let total_tokens = parts.iter().map(|p| chunker.tokenizer().count(p)).sum();
        Ok(PreparedText {
            parts,
            total_tokens,
            abstract_text: extracted.abstract_text,
            page_failures: extracted.page_failures,
        })
    }
}
