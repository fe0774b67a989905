use crate::BackendError;
use std::path::Path;

/// Whole-document text extraction strategy
///
/// The document is treated as a flat stream and all of its text is returned
/// by a single call. Callers cannot observe or interrupt progress inside it.
pub trait TextBackend: Send + Sync {
    /// Short name used in logs (e.g., "pdf-extract")
    fn name(&self) -> &str;

    /// Extract the full text content of a PDF file
    fn extract_text(&self, path: &Path) -> Result<String, BackendError>;
}

/// Page-by-page text extraction strategy
pub trait PagedBackend: Send + Sync {
    /// Short name used in logs (e.g., "lopdf")
    fn name(&self) -> &str;

    /// Open a document for per-page extraction
    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument>, BackendError>;
}

/// An opened document whose pages can be extracted one at a time
pub trait PagedDocument {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Extract the text of the page at zero-based `index`, in document order
    fn page_text(&self, index: usize) -> Result<String, BackendError>;
}
