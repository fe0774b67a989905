use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Which extraction strategy produced a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Whole-document extraction in a single call
    Primary,
    /// Page-by-page extraction after the primary strategy failed
    Fallback,
}

/// Text extracted from one PDF document, split into lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub path: PathBuf,
    pub lines: Vec<String>,
    pub strategy: ExtractionStrategy,
    /// Number of pages walked by the fallback strategy
    pub page_count: Option<usize>,
    /// Zero-based indices of pages whose text was replaced by an empty string
    pub failed_pages: Vec<usize>,
}

impl ExtractedText {
    /// Result of an extraction that stopped early because the task was cancelled
    pub fn empty(path: PathBuf, strategy: ExtractionStrategy) -> Self {
        Self {
            path,
            lines: Vec::new(),
            strategy,
            page_count: None,
            failed_pages: Vec::new(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Classification of a single diff entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// Line present in both inputs
    Unchanged,
    /// Line present only in the right input
    Added,
    /// Line present only in the left input
    Removed,
    /// Marker line pointing at character differences of the preceding line.
    /// Never rendered and never counted.
    IntralineHint,
}

/// One classified line of a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub text: String,
}

impl DiffEntry {
    pub fn new(kind: DiffKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn unchanged(text: impl Into<String>) -> Self {
        Self::new(DiffKind::Unchanged, text)
    }

    pub fn added(text: impl Into<String>) -> Self {
        Self::new(DiffKind::Added, text)
    }

    pub fn removed(text: impl Into<String>) -> Self {
        Self::new(DiffKind::Removed, text)
    }

    pub fn hint(text: impl Into<String>) -> Self {
        Self::new(DiffKind::IntralineHint, text)
    }
}

/// Aggregate counts of a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Number of lines in the left input
    pub left_lines: usize,
    /// Number of lines in the right input
    pub right_lines: usize,
}

impl DiffSummary {
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Percentage range that a fallback extraction reports its page progress into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSpan {
    pub start: u8,
    pub end: u8,
}

impl ProgressSpan {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Interpolated progress after `processed` of `total` units
    pub fn at(&self, processed: usize, total: usize) -> u8 {
        if total == 0 || self.end <= self.start {
            return self.end.max(self.start);
        }
        let width = (self.end - self.start) as usize;
        let done = processed.min(total);
        self.start + (done * width / total) as u8
    }
}

impl Default for ProgressSpan {
    fn default() -> Self {
        Self::new(10, 50)
    }
}

/// Whitespace handling options for line comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhitespaceMode {
    /// Compare whitespace exactly
    #[default]
    Exact,
    /// Ignore all whitespace
    IgnoreAll,
    /// Ignore leading whitespace
    IgnoreLeading,
    /// Ignore trailing whitespace
    IgnoreTrailing,
    /// Treat any run of whitespace as a single space
    IgnoreChanges,
}

/// Textual form of a regex replacement rule as stored in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexRuleConfig {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

fn default_true() -> bool {
    true
}

fn default_cutoff() -> f32 {
    0.75
}

/// Diff options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Ignore case when comparing lines
    #[serde(default)]
    pub ignore_case: bool,

    #[serde(default)]
    pub whitespace_mode: WhitespaceMode,

    /// Emit intraline hint entries for similar replaced lines
    #[serde(default = "default_true")]
    pub intraline_hints: bool,

    /// Minimum similarity ratio for two lines to be paired as a modification
    #[serde(default = "default_cutoff")]
    pub intraline_cutoff: f32,

    /// Replacement rules applied to every line before comparison
    #[serde(default)]
    pub regex_rules: Vec<RegexRuleConfig>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            whitespace_mode: WhitespaceMode::Exact,
            intraline_hints: true,
            intraline_cutoff: default_cutoff(),
            regex_rules: Vec::new(),
        }
    }
}

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    #[default]
    Text,
    Html,
    Json,
}

/// Report options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    #[serde(default)]
    pub format: ReportFormat,

    /// Colorize terminal output
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            color: true,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub diff: DiffOptions,

    #[serde(default)]
    pub report: ReportOptions,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

/// Identifier of one comparison run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
