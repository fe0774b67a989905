#![cfg(feature = "pdf-backends")]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfcompare_common::{
    BackendError, ExtractionStrategy, PagedBackend, PagedDocument, TextBackend,
};
use pdfcompare_core::{
    CancellableTask, DiffEngine, ExtractionContext, LopdfBackend, RunningFlag, TaskEvent,
    TextExtractor, LEFT_SPAN,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Write a PDF with one text line per `BT`/`ET` block, one inner slice per page
fn write_pdf(path: &Path, pages: &[&[&str]]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let y = 750 - 20 * i as i64;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save pdf");
}

struct Fixture {
    _temp: TempDir,
    left: PathBuf,
    right: PathBuf,
}

impl Fixture {
    fn new(left: &[&[&str]], right: &[&[&str]]) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let left_path = temp.path().join("left.pdf");
        let right_path = temp.path().join("right.pdf");
        write_pdf(&left_path, left);
        write_pdf(&right_path, right);
        Fixture {
            _temp: temp,
            left: left_path,
            right: right_path,
        }
    }
}

struct AlwaysFails;

impl TextBackend for AlwaysFails {
    fn name(&self) -> &str {
        "always-fails"
    }

    fn extract_text(&self, _path: &Path) -> Result<String, BackendError> {
        Err(BackendError::Extraction("forced".to_string()))
    }
}

fn run(task: CancellableTask) -> Vec<TaskEvent> {
    task.spawn().expect("spawn").wait().expect("join")
}

#[test]
fn test_lopdf_backend_reads_pages() {
    let fixture = Fixture::new(&[&["Hello"], &["Second page"]], &[&["unused"]]);

    let document = LopdfBackend::new().open(&fixture.left).unwrap();

    assert_eq!(document.page_count(), 2);
    assert!(document.page_text(0).unwrap().contains("Hello"));
    assert!(document.page_text(1).unwrap().contains("Second page"));
    assert!(document.page_text(2).is_err());
}

#[test]
fn test_fallback_extraction_of_generated_pdf() {
    let fixture = Fixture::new(&[&["Hello", "World"], &["Again"]], &[&["unused"]]);
    let extractor = TextExtractor::new(Box::new(AlwaysFails), Box::new(LopdfBackend::new()));
    let running = RunningFlag::new();
    let progress = Mutex::new(Vec::new());
    let on_progress = |p: u8| progress.lock().unwrap().push(p);

    let text = extractor
        .extract(
            &fixture.left,
            &ExtractionContext::new(&running, LEFT_SPAN, &on_progress),
        )
        .unwrap();

    assert_eq!(text.strategy, ExtractionStrategy::Fallback);
    assert_eq!(text.page_count, Some(2));
    assert!(text.failed_pages.is_empty());
    let joined = text.lines.join("\n");
    assert!(joined.contains("Hello"));
    assert!(joined.contains("Again"));
    assert_eq!(*progress.lock().unwrap(), vec![15, 30]);
}

#[test]
fn test_default_backends_compare_generated_pdfs() {
    let fixture = Fixture::new(&[&["Hello", "World"]], &[&["Hello", "Rust"]]);
    let task = CancellableTask::new(
        &fixture.left,
        &fixture.right,
        Arc::new(TextExtractor::with_default_backends()),
        Arc::new(DiffEngine::new()),
    );

    let events = run(task);

    assert!(
        !events.iter().any(|e| matches!(e, TaskEvent::Error(_))),
        "unexpected error: {events:?}"
    );
    let report = events
        .iter()
        .find_map(|e| match e {
            TaskEvent::Result(report) => Some(report.clone()),
            _ => None,
        })
        .expect("result event");
    assert!(report.summary.has_changes());
    assert!(report.summary_line.starts_with("Total: "));
    assert_eq!(events.last(), Some(&TaskEvent::Finished));
}

#[test]
fn test_non_pdf_inputs_report_error() {
    let temp = TempDir::new().unwrap();
    let left = temp.path().join("left.pdf");
    let right = temp.path().join("right.pdf");
    std::fs::write(&left, "plain text").unwrap();
    std::fs::write(&right, "plain text").unwrap();

    let task = CancellableTask::new(
        &left,
        &right,
        Arc::new(TextExtractor::with_default_backends()),
        Arc::new(DiffEngine::new()),
    );
    let events = run(task);

    let errors: Vec<&TaskEvent> = events
        .iter()
        .filter(|e| matches!(e, TaskEvent::Error(_)))
        .collect();
    assert_eq!(errors.len(), 1);
    match errors[0] {
        TaskEvent::Error(message) => {
            assert!(message.starts_with("Error: Failed to extract text from"));
        }
        _ => unreachable!(),
    }
    assert!(!events.iter().any(|e| matches!(e, TaskEvent::Result(_))));
    assert_eq!(events.last(), Some(&TaskEvent::Finished));
}

#[test]
fn test_identical_pdfs_have_no_changes() {
    let fixture = Fixture::new(&[&["Same text"]], &[&["Same text"]]);
    let task = CancellableTask::new(
        &fixture.left,
        &fixture.right,
        Arc::new(TextExtractor::with_default_backends()),
        Arc::new(DiffEngine::new()),
    );

    let events = run(task);

    let report = events
        .iter()
        .find_map(|e| match e {
            TaskEvent::Result(report) => Some(report.clone()),
            _ => None,
        })
        .expect("result event");
    assert_eq!(report.summary_line, "Total: 0 additions, 0 deletions");
}
