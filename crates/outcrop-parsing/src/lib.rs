use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

pub mod abstract_text;
pub mod chunker;
pub mod config;
pub mod context;
pub mod extractor;
pub mod frequencies;
pub mod identifiers;
pub mod page_filter;
pub mod section;
pub mod tables;
pub mod text_processing;

pub use chunker::{ChunkError, Cl100kTokenizer, TokenChunker, Tokenizer};
pub use config::{ConfigError, ParsingConfig, ParsingConfigBuilder};
pub use context::{KeywordContextFinder, KeywordContextProcessor};
pub use extractor::{DocumentExtractor, ExtractedText, PageFailure, PreparedText};
pub use frequencies::LocationFrequency;
pub use identifiers::find_doi;
pub use tables::{TableDetection, caption_regex};
// Re-export layout types from core (canonical definitions live there)
pub use outcrop_core::{BackendError, PageLayout, PageSource, PdfBackend};

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("chunking failed: {0}")]
    Chunk(#[from] ChunkError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("page {page} is malformed: {reason}")]
    MalformedPage { page: usize, reason: String },
}

/// Abstract and cleaned body text of the PDF at `path`.
///
/// A document that cannot be opened is an error; a document without pages
/// yields an empty [`ExtractedText`].
pub fn extract_text(
    pdf_path: &Path,
    backend: &dyn PdfBackend,
    config: &ParsingConfig,
) -> Result<ExtractedText, ParsingError> {
    let source = backend.open(pdf_path)?;
    Ok(DocumentExtractor::new(config.clone()).extract_text(source.as_ref()))
}

/// Turn the PDF at `path` into extraction-ready parts, measured with cl100k.
///
/// Pipeline:
/// 1. Isolate the abstract on page one
/// 2. Clean every later page: drop tables, headers and footers, expand
///    ligatures, strip author-year citations
/// 3. Stop at the first back-matter heading in the trailing pages
/// 4. Keep only the text around location trigger phrases
/// 5. Cut it into overlapping token-bounded parts, optionally prefixed with
///    the abstract
pub fn prepare_text_for_extraction(
    pdf_path: &Path,
    backend: &dyn PdfBackend,
    config: &ParsingConfig,
) -> Result<PreparedText, ParsingError> {
    prepare_text_with_tokenizer(pdf_path, backend, config, chunker::cl100k()?)
}

/// [`prepare_text_for_extraction`] with a caller-supplied tokenizer.
pub fn prepare_text_with_tokenizer(
    pdf_path: &Path,
    backend: &dyn PdfBackend,
    config: &ParsingConfig,
    tokenizer: Arc<dyn Tokenizer>,
) -> Result<PreparedText, ParsingError> {
    let source = backend.open(pdf_path)?;
    let extractor = DocumentExtractor::new(config.clone());
    let extracted = extractor.extract_text(source.as_ref());
    extractor.prepare(extracted, tokenizer)
}

/// Whole-word, case-insensitive counts of `locations` over every page.
pub fn location_frequencies<S: AsRef<str>>(
    pdf_path: &Path,
    backend: &dyn PdfBackend,
    locations: &[S],
) -> Result<Vec<LocationFrequency>, ParsingError> {
    let source = backend.open(pdf_path)?;
    Ok(frequencies::page_location_frequencies(
        source.as_ref(),
        locations,
    ))
}

/// First DOI printed on page one, if any.
pub fn extract_first_page_doi(
    pdf_path: &Path,
    backend: &dyn PdfBackend,
) -> Result<Option<String>, ParsingError> {
    let source = backend.open(pdf_path)?;
    if source.page_count() == 0 {
        return Ok(None);
    }
    let first = source.load_page(0)?;
    Ok(find_doi(&first.raw_text))
}
