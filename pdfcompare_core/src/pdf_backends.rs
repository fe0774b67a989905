use lopdf::Document;
use pdfcompare_common::{BackendError, PagedBackend, PagedDocument, TextBackend};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::debug;

/// Whole-document extraction through the pdf-extract crate
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractBackend;

impl PdfExtractBackend {
    pub fn new() -> Self {
        Self
    }
}

impl TextBackend for PdfExtractBackend {
    fn name(&self) -> &str {
        "pdf-extract"
    }

    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        // pdf-extract panics on some malformed fonts and encodings
        panic::catch_unwind(|| pdf_extract::extract_text(path))
            .map_err(|payload| BackendError::Panicked(panic_message(payload)))?
            .map_err(|e| BackendError::Extraction(e.to_string()))
    }
}

/// Page-by-page extraction through the lopdf crate
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PagedBackend for LopdfBackend {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn PagedDocument>, BackendError> {
        let document = Document::load(path).map_err(|e| BackendError::Open(e.to_string()))?;
        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        debug!("Opened {:?} with {} pages", path, page_numbers.len());

        Ok(Box::new(LopdfDocument {
            document,
            page_numbers,
        }))
    }
}

struct LopdfDocument {
    document: Document,
    /// One-based page numbers in document order
    page_numbers: Vec<u32>,
}

impl PagedDocument for LopdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<String, BackendError> {
        let page_number = *self.page_numbers.get(index).ok_or_else(|| BackendError::Page {
            index,
            reason: format!("document has {} pages", self.page_numbers.len()),
        })?;

        panic::catch_unwind(AssertUnwindSafe(|| self.document.extract_text(&[page_number])))
            .map_err(|payload| BackendError::Page {
                index,
                reason: panic_message(payload),
            })?
            .map_err(|e| BackendError::Page {
                index,
                reason: e.to_string(),
            })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
