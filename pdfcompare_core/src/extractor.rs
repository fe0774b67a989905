use crate::task::RunningFlag;
use pdfcompare_common::{
    ExtractedText, ExtractionStrategy, PagedBackend, PdfCompareError, ProgressSpan, TextBackend,
};
use std::path::Path;
use tracing::{debug, info, warn};

/// Cancellation and progress hooks for one extraction call
pub struct ExtractionContext<'a> {
    running: &'a RunningFlag,
    span: ProgressSpan,
    on_progress: &'a dyn Fn(u8),
}

impl<'a> ExtractionContext<'a> {
    pub fn new(running: &'a RunningFlag, span: ProgressSpan, on_progress: &'a dyn Fn(u8)) -> Self {
        Self {
            running,
            span,
            on_progress,
        }
    }

    fn report(&self, processed: usize, total: usize) {
        (self.on_progress)(self.span.at(processed, total));
    }
}

/// Extracts text from PDF files, falling back to page-by-page extraction
pub struct TextExtractor {
    primary: Box<dyn TextBackend>,
    fallback: Box<dyn PagedBackend>,
}

impl TextExtractor {
    pub fn new(primary: Box<dyn TextBackend>, fallback: Box<dyn PagedBackend>) -> Self {
        Self { primary, fallback }
    }

    /// Extractor using pdf-extract for whole documents and lopdf per page
    #[cfg(feature = "pdf-backends")]
    pub fn with_default_backends() -> Self {
        Self::new(
            Box::new(crate::pdf_backends::PdfExtractBackend::new()),
            Box::new(crate::pdf_backends::LopdfBackend::new()),
        )
    }

    /// Extract the text of `path` as lines.
    ///
    /// The primary strategy runs as one uninterruptible call. Only when it fails
    /// does the fallback walk the pages, polling the running flag before every
    /// page and reporting progress after it. A cancelled walk returns an empty
    /// text rather than an error.
    pub fn extract(
        &self,
        path: &Path,
        ctx: &ExtractionContext<'_>,
    ) -> Result<ExtractedText, PdfCompareError> {
        let primary_error = match self.primary.extract_text(path) {
            Ok(text) => {
                let lines = split_lines(&text);
                info!(
                    "Extracted {} lines from {:?} with {}",
                    lines.len(),
                    path,
                    self.primary.name()
                );
                return Ok(ExtractedText {
                    path: path.to_path_buf(),
                    lines,
                    strategy: ExtractionStrategy::Primary,
                    page_count: None,
                    failed_pages: Vec::new(),
                });
            }
            Err(e) => e,
        };

        warn!(
            "{} failed for {:?}: {}; falling back to {}",
            self.primary.name(),
            path,
            primary_error,
            self.fallback.name()
        );

        let document = match self.fallback.open(path) {
            Ok(document) => document,
            Err(fallback_error) => {
                return Err(PdfCompareError::Extraction {
                    path: path.to_path_buf(),
                    primary: primary_error,
                    fallback: fallback_error,
                });
            }
        };

        let total = document.page_count();
        let mut text = String::new();
        let mut failed_pages = Vec::new();

        for index in 0..total {
            if !ctx.running.is_running() {
                debug!("Extraction of {:?} cancelled at page {}/{}", path, index, total);
                return Ok(ExtractedText::empty(
                    path.to_path_buf(),
                    ExtractionStrategy::Fallback,
                ));
            }

            match document.page_text(index) {
                Ok(page) => text.push_str(&page),
                Err(e) => {
                    warn!("Skipping page {} of {:?}: {}", index + 1, path, e);
                    failed_pages.push(index);
                }
            }

            ctx.report(index + 1, total);
        }

        let lines = split_lines(&text);
        info!(
            "Extracted {} lines from {} pages of {:?} with {}",
            lines.len(),
            total,
            path,
            self.fallback.name()
        );

        Ok(ExtractedText {
            path: path.to_path_buf(),
            lines,
            strategy: ExtractionStrategy::Fallback,
            page_count: Some(total),
            failed_pages,
        })
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0b}'
            | '\u{0c}'
            | '\u{1c}'
            | '\u{1d}'
            | '\u{1e}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Split text into lines on every line-break boundary.
///
/// `\r\n` counts as one break, form feeds between pages end a line, and a
/// trailing break does not add an empty line.
pub fn split_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(text[start..idx].to_string());
        let mut end = idx + c.len_utf8();
        if c == '\r' {
            if let Some(&(next_idx, '\n')) = chars.peek() {
                chars.next();
                end = next_idx + 1;
            }
        }
        start = end;
    }

    if start < text.len() {
        lines.push(text[start..].to_string());
    }

    lines
}
