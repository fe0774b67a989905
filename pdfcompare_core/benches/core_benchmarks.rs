use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crossbeam::channel::unbounded;
use pdfcompare_common::{BackendError, PagedBackend, PagedDocument, TextBackend};
use pdfcompare_core::{
    split_lines, CancellableTask, DiffEngine, ResultFormatter, TextDiffConfig, TextExtractor,
};
use std::path::Path;
use std::sync::Arc;

// Helper to build a document of `count` lines with every `stride`-th line edited
fn create_lines(count: usize, stride: usize, edited: bool) -> Vec<String> {
    (0..count)
        .map(|i| {
            if edited && stride > 0 && i % stride == 0 {
                format!("Paragraph {} was revised in the second draft.", i)
            } else {
                format!("Paragraph {} of the quarterly report.", i)
            }
        })
        .collect()
}

struct InMemoryText {
    left: String,
    right: String,
}

impl TextBackend for InMemoryText {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        if path.ends_with("left.pdf") {
            Ok(self.left.clone())
        } else {
            Ok(self.right.clone())
        }
    }
}

struct NoFallback;

impl PagedBackend for NoFallback {
    fn name(&self) -> &str {
        "none"
    }

    fn open(&self, _path: &Path) -> Result<Box<dyn PagedDocument>, BackendError> {
        Err(BackendError::Open("unused".to_string()))
    }
}

fn bench_diff_sizes(c: &mut Criterion) {
    let engine = DiffEngine::new();
    let mut group = c.benchmark_group("diff_sparse_edits");

    for size in [100, 1_000, 5_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let left = create_lines(size, 10, false);
            let right = create_lines(size, 10, true);

            b.iter(|| {
                let entries = engine.diff(black_box(&left), black_box(&right));
                black_box(entries);
            });
        });
    }

    group.finish();
}

fn bench_diff_without_hints(c: &mut Criterion) {
    let left = create_lines(2_000, 3, false);
    let right = create_lines(2_000, 3, true);
    let engine = DiffEngine::with_config(TextDiffConfig {
        intraline_hints: false,
        ..TextDiffConfig::default()
    });

    c.bench_function("diff_dense_edits_no_hints", |b| {
        b.iter(|| black_box(engine.diff(black_box(&left), black_box(&right))));
    });
}

fn bench_format(c: &mut Criterion) {
    let engine = DiffEngine::new();
    let left = create_lines(5_000, 10, false);
    let right = create_lines(5_000, 10, true);
    let entries = engine.diff(&left, &right);
    let summary = DiffEngine::summarize(&entries, left.len(), right.len());
    let formatter = ResultFormatter::new();

    c.bench_function("format_html_5000_lines", |b| {
        b.iter(|| {
            let report = formatter.format(black_box(&entries), black_box(&summary));
            black_box(report.to_html());
        });
    });
}

fn bench_split_lines(c: &mut Criterion) {
    let text = create_lines(10_000, 0, false).join("\r\n");

    c.bench_function("split_lines_10000", |b| {
        b.iter(|| black_box(split_lines(black_box(&text))));
    });
}

fn bench_full_task(c: &mut Criterion) {
    let extractor = Arc::new(TextExtractor::new(
        Box::new(InMemoryText {
            left: create_lines(1_000, 10, false).join("\n"),
            right: create_lines(1_000, 10, true).join("\n"),
        }),
        Box::new(NoFallback),
    ));
    let engine = Arc::new(DiffEngine::new());

    c.bench_function("task_pipeline_1000_lines", |b| {
        b.iter(|| {
            let (tx, rx) = unbounded();
            let task =
                CancellableTask::new("left.pdf", "right.pdf", extractor.clone(), engine.clone());
            task.run(&tx);
            black_box(rx.try_iter().count());
        });
    });
}

criterion_group!(diff_benches, bench_diff_sizes, bench_diff_without_hints);

criterion_group!(format_benches, bench_format, bench_split_lines);

criterion_group!(workflow_benches, bench_full_task);

criterion_main!(diff_benches, format_benches, workflow_benches);
