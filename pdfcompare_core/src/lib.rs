pub mod extractor;
#[cfg(feature = "pdf-backends")]
pub mod pdf_backends;
pub mod report;
pub mod task;
pub mod text_diff;

pub use extractor::{split_lines, ExtractionContext, TextExtractor};
#[cfg(feature = "pdf-backends")]
pub use pdf_backends::{LopdfBackend, PdfExtractBackend};
pub use report::{summary_line, RenderedReport, ReportLine, ResultFormatter};
pub use task::{
    CancellableTask, RunningFlag, TaskController, TaskEvent, TaskHandle, TaskStage, LEFT_SPAN,
    RIGHT_SPAN,
};
pub use text_diff::{DiffEngine, DiffOutput, RegexRule, TextDiffConfig};
