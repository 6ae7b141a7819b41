use std::path::Path;

use thiserror::Error;

use crate::PageLayout;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to read page {page}: {message}")]
    PageError { page: usize, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF layout backends.
///
/// Implementors turn a document on disk into a [`PageSource`]; the
/// segmentation pipeline (abstract isolation, table exclusion, back-matter
/// trimming, windowing and chunking) lives in `outcrop_parsing`.
pub trait PdfBackend: Send + Sync {
    /// Open a document. The returned source owns the document handle and
    /// releases it when dropped.
    fn open(&self, path: &Path) -> Result<Box<dyn PageSource>, BackendError>;
}

/// An opened document that yields one [`PageLayout`] at a time.
///
/// Pages are loaded lazily so that a pipeline which stops early never pays
/// for the pages it does not read.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Load the page at `index` (0-based).
    fn load_page(&self, index: usize) -> Result<PageLayout, BackendError>;
}

/// A [`PageSource`] over layouts that are already in memory.
///
/// Useful for callers that obtained their layouts elsewhere and for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPages {
    pages: Vec<Result<PageLayout, String>>,
}

impl InMemoryPages {
    pub fn new(pages: Vec<PageLayout>) -> Self {
        Self {
            pages: pages.into_iter().map(Ok).collect(),
        }
    }

    /// Append a page that fails to load with `message`.
    pub fn push_broken(&mut self, message: impl Into<String>) {
        self.pages.push(Err(message.into()));
    }

    pub fn push(&mut self, page: PageLayout) {
        self.pages.push(Ok(page));
    }
}

impl PageSource for InMemoryPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn load_page(&self, index: usize) -> Result<PageLayout, BackendError> {
        match self.pages.get(index) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(message)) => Err(BackendError::PageError {
                page: index,
                message: message.clone(),
            }),
            None => Err(BackendError::PageError {
                page: index,
                message: "page index out of range".into(),
            }),
        }
    }
}
