use crate::extractor::{ExtractionContext, TextExtractor};
use crate::report::{RenderedReport, ResultFormatter};
use crate::text_diff::DiffEngine;
use crossbeam::channel::{unbounded, Receiver, Sender};
use pdfcompare_common::{PdfCompareError, ProgressSpan, TaskId};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, info_span};

/// Fallback progress range of the left document
pub const LEFT_SPAN: ProgressSpan = ProgressSpan::new(0, 30);
/// Fallback progress range of the right document
pub const RIGHT_SPAN: ProgressSpan = ProgressSpan::new(30, 60);

/// Cross-thread "keep going" flag; cleared once to request cancellation
#[derive(Debug, Clone)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Request cancellation; idempotent
    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Notification sent from the worker to the invoking context
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Progress(u8),
    Status(String),
    Result(RenderedReport),
    Error(String),
    /// Always the last event of a run, sent exactly once
    Finished,
}

/// Lifecycle stage of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    Idle,
    ExtractingLeft,
    ExtractingRight,
    Comparing,
    Formatting,
    Completed,
    Cancelled,
    Failed,
}

impl TaskStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStage::Completed | TaskStage::Cancelled | TaskStage::Failed
        )
    }
}

enum Outcome {
    Completed,
    Cancelled,
}

/// Sends `Finished` when dropped, so it goes out on every exit path.
///
/// The flag is raised only after the event is queued.
struct FinishGuard<'a> {
    events: &'a Sender<TaskEvent>,
    finished: &'a AtomicBool,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        let _ = self.events.send(TaskEvent::Finished);
        self.finished.store(true, Ordering::SeqCst);
    }
}

/// Extract, diff and format two PDFs, reporting progress and honoring cancellation
pub struct CancellableTask {
    id: TaskId,
    left: PathBuf,
    right: PathBuf,
    extractor: Arc<TextExtractor>,
    engine: Arc<DiffEngine>,
    formatter: ResultFormatter,
    running: RunningFlag,
    stage: Arc<Mutex<TaskStage>>,
    finished: Arc<AtomicBool>,
}

impl CancellableTask {
    pub fn new(
        left: impl Into<PathBuf>,
        right: impl Into<PathBuf>,
        extractor: Arc<TextExtractor>,
        engine: Arc<DiffEngine>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            left: left.into(),
            right: right.into(),
            extractor,
            engine,
            formatter: ResultFormatter::new(),
            running: RunningFlag::new(),
            stage: Arc::new(Mutex::new(TaskStage::Idle)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Handle to the flag polled by the worker
    pub fn running_flag(&self) -> RunningFlag {
        self.running.clone()
    }

    pub fn cancel(&self) {
        self.running.stop();
    }

    pub fn stage(&self) -> TaskStage {
        self.stage.lock().map(|s| *s).unwrap_or(TaskStage::Failed)
    }

    /// Run the whole pipeline on the current thread
    pub fn run(&self, events: &Sender<TaskEvent>) {
        let _finish = FinishGuard {
            events,
            finished: &self.finished,
        };
        let span = info_span!("comparison", task = %self.id);
        let _enter = span.enter();

        info!("Comparing {:?} with {:?}", self.left, self.right);

        match panic::catch_unwind(AssertUnwindSafe(|| self.pipeline(events))) {
            Ok(Ok(Outcome::Completed)) => {
                self.set_stage(TaskStage::Completed);
                info!("Comparison completed");
            }
            Ok(Ok(Outcome::Cancelled)) => {
                self.set_stage(TaskStage::Cancelled);
                info!("Comparison cancelled");
            }
            Ok(Err(e)) => {
                error!("Comparison failed: {}", e);
                self.set_stage(TaskStage::Failed);
                let _ = events.send(TaskEvent::Error(format!("Error: {}", e)));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Comparison worker panicked: {}", message);
                self.set_stage(TaskStage::Failed);
                let _ = events.send(TaskEvent::Error(format!("Error: {}", message)));
            }
        }
    }

    /// Run the pipeline on a background thread
    pub fn spawn(self) -> Result<TaskHandle, PdfCompareError> {
        let (sender, receiver) = unbounded();
        let id = self.id;
        let running = self.running.clone();
        let stage = self.stage.clone();
        let finished = self.finished.clone();

        let join = thread::Builder::new()
            .name(format!("pdfcompare-{}", id))
            .spawn(move || self.run(&sender))?;

        Ok(TaskHandle {
            id,
            events: receiver,
            running,
            stage,
            finished,
            join: Some(join),
        })
    }

    fn pipeline(&self, events: &Sender<TaskEvent>) -> Result<Outcome, PdfCompareError> {
        let emit = |event: TaskEvent| {
            let _ = events.send(event);
        };
        let on_progress = |percent: u8| emit(TaskEvent::Progress(percent));

        if !self.enter(TaskStage::ExtractingLeft) {
            return Ok(Outcome::Cancelled);
        }
        emit(TaskEvent::Status(format!(
            "Extracting text from {}...",
            display_name(&self.left)
        )));
        let left = self.extractor.extract(
            &self.left,
            &ExtractionContext::new(&self.running, LEFT_SPAN, &on_progress),
        )?;

        if !self.enter(TaskStage::ExtractingRight) {
            return Ok(Outcome::Cancelled);
        }
        emit(TaskEvent::Progress(30));
        emit(TaskEvent::Status(format!(
            "Extracting text from {}...",
            display_name(&self.right)
        )));
        let right = self.extractor.extract(
            &self.right,
            &ExtractionContext::new(&self.running, RIGHT_SPAN, &on_progress),
        )?;

        if !self.enter(TaskStage::Comparing) {
            return Ok(Outcome::Cancelled);
        }
        emit(TaskEvent::Progress(60));
        emit(TaskEvent::Status("Comparing texts...".to_string()));
        let output = self.engine.compare(&left, &right)?;

        if !self.enter(TaskStage::Formatting) {
            return Ok(Outcome::Cancelled);
        }
        emit(TaskEvent::Progress(80));
        emit(TaskEvent::Status("Formatting results...".to_string()));
        let report = self.formatter.format(&output.entries, &output.summary);

        if !self.running.is_running() {
            return Ok(Outcome::Cancelled);
        }
        emit(TaskEvent::Result(report));
        emit(TaskEvent::Progress(100));
        emit(TaskEvent::Status(format!(
            "Comparison finished. {} to {} lines.",
            left.line_count(),
            right.line_count()
        )));

        Ok(Outcome::Completed)
    }

    /// Stage-entry checkpoint
    fn enter(&self, stage: TaskStage) -> bool {
        if !self.running.is_running() {
            debug!("Cancellation observed before {:?}", stage);
            return false;
        }
        debug!("Entering {:?}", stage);
        self.set_stage(stage);
        true
    }

    fn set_stage(&self, stage: TaskStage) {
        if let Ok(mut guard) = self.stage.lock() {
            *guard = stage;
        }
    }
}

/// Invoking-context side of a spawned comparison
pub struct TaskHandle {
    id: TaskId,
    events: Receiver<TaskEvent>,
    running: RunningFlag,
    stage: Arc<Mutex<TaskStage>>,
    finished: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn events(&self) -> &Receiver<TaskEvent> {
        &self.events
    }

    /// Request cooperative cancellation; takes effect at the worker's next checkpoint
    pub fn cancel(&self) {
        self.running.stop();
    }

    /// Flag shared with the worker, for cancelling from another thread
    pub fn running_flag(&self) -> RunningFlag {
        self.running.clone()
    }

    pub fn stage(&self) -> TaskStage {
        self.stage.lock().map(|s| *s).unwrap_or(TaskStage::Failed)
    }

    /// True once `Finished` has been sent
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Block until the worker thread exits
    pub fn join(&mut self) -> Result<(), PdfCompareError> {
        if let Some(join) = self.join.take() {
            join.join().map_err(|payload| {
                PdfCompareError::Comparison(format!(
                    "worker thread panicked: {}",
                    panic_message(payload.as_ref())
                ))
            })?;
        }
        Ok(())
    }

    /// Collect every event up to and including `Finished`, then join the worker
    pub fn wait(mut self) -> Result<Vec<TaskEvent>, PdfCompareError> {
        let mut collected = Vec::new();
        for event in self.events.iter() {
            let done = event == TaskEvent::Finished;
            collected.push(event);
            if done {
                break;
            }
        }
        self.join()?;
        Ok(collected)
    }
}

struct ActiveTask {
    running: RunningFlag,
    finished: Arc<AtomicBool>,
}

/// Starts comparisons one at a time
pub struct TaskController {
    extractor: Arc<TextExtractor>,
    engine: Arc<DiffEngine>,
    active: Mutex<Option<ActiveTask>>,
}

impl TaskController {
    pub fn new(extractor: TextExtractor, engine: DiffEngine) -> Self {
        Self {
            extractor: Arc::new(extractor),
            engine: Arc::new(engine),
            active: Mutex::new(None),
        }
    }

    /// Spawn a comparison unless the previous one has not finished yet
    pub fn start(
        &self,
        left: impl Into<PathBuf>,
        right: impl Into<PathBuf>,
    ) -> Result<TaskHandle, PdfCompareError> {
        self.start_with(left.into(), right.into(), CancellableTask::spawn)
    }

    /// The controller only tracks a task once its worker is running
    fn start_with(
        &self,
        left: PathBuf,
        right: PathBuf,
        spawn: impl FnOnce(CancellableTask) -> Result<TaskHandle, PdfCompareError>,
    ) -> Result<TaskHandle, PdfCompareError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| PdfCompareError::Comparison("controller state poisoned".to_string()))?;

        if let Some(previous) = active.as_ref() {
            if !previous.finished.load(Ordering::SeqCst) {
                return Err(PdfCompareError::Busy);
            }
        }

        let task = CancellableTask::new(left, right, self.extractor.clone(), self.engine.clone());
        let running = task.running_flag();
        let finished = task.finished.clone();

        let handle = spawn(task)?;
        *active = Some(ActiveTask { running, finished });
        Ok(handle)
    }

    /// Cancel the active comparison, if any
    pub fn cancel(&self) {
        if let Ok(guard) = self.active.lock() {
            if let Some(active) = guard.as_ref() {
                active.running.stop();
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .map(|guard| {
                guard
                    .as_ref()
                    .map_or(false, |a| !a.finished.load(Ordering::SeqCst))
            })
            .unwrap_or(false)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
