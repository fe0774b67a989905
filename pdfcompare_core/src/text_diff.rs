use pdfcompare_common::{
    DiffEntry, DiffKind, DiffOptions, DiffSummary, ExtractedText, PdfCompareError, WhitespaceMode,
};
use regex::Regex;
use similar::{capture_diff_slices, Algorithm, DiffTag, TextDiff};
use tracing::debug;

/// Replace blocks larger than this many line pairs are not searched for similar lines
const MAX_FANCY_PAIRS: usize = 40_000;

/// Regular expression rule for transforming lines before comparison
#[derive(Debug, Clone)]
pub struct RegexRule {
    pub pattern: Regex,
    pub replacement: String,
}

/// Configuration for line comparison
#[derive(Debug, Clone)]
pub struct TextDiffConfig {
    /// Ignore case when comparing
    pub ignore_case: bool,
    /// Whitespace handling mode
    pub whitespace_mode: WhitespaceMode,
    /// Regular expression rules to apply before comparison
    pub regex_rules: Vec<RegexRule>,
    /// Emit intraline hint entries for paired lines
    pub intraline_hints: bool,
    /// Similarity ratio at or above which a removed and an added line are paired
    pub intraline_cutoff: f32,
}

impl TextDiffConfig {
    pub fn new() -> Self {
        Self {
            ignore_case: false,
            whitespace_mode: WhitespaceMode::Exact,
            regex_rules: Vec::new(),
            intraline_hints: true,
            intraline_cutoff: 0.75,
        }
    }

    /// Build from the config file representation, compiling regex rules
    pub fn from_options(options: &DiffOptions) -> Result<Self, PdfCompareError> {
        let regex_rules = options
            .regex_rules
            .iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.pattern).map_err(|e| {
                    PdfCompareError::Config(format!("invalid regex '{}': {}", rule.pattern, e))
                })?;
                Ok(RegexRule {
                    pattern,
                    replacement: rule.replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>, PdfCompareError>>()?;

        Ok(Self {
            ignore_case: options.ignore_case,
            whitespace_mode: options.whitespace_mode,
            regex_rules,
            intraline_hints: options.intraline_hints,
            intraline_cutoff: options.intraline_cutoff,
        })
    }
}

impl Default for TextDiffConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Classified diff entries plus their counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutput {
    pub entries: Vec<DiffEntry>,
    pub summary: DiffSummary,
}

/// Line-level diff engine
pub struct DiffEngine {
    config: TextDiffConfig,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self {
            config: TextDiffConfig::new(),
        }
    }

    pub fn with_config(config: TextDiffConfig) -> Self {
        Self { config }
    }

    /// Comparison key of a line according to configuration options
    fn normalize_line(&self, line: &str) -> String {
        let mut result = if self.config.ignore_case {
            line.to_lowercase()
        } else {
            line.to_string()
        };

        for rule in &self.config.regex_rules {
            result = rule
                .pattern
                .replace_all(&result, rule.replacement.as_str())
                .into_owned();
        }

        match self.config.whitespace_mode {
            WhitespaceMode::Exact => result,
            WhitespaceMode::IgnoreAll => result.chars().filter(|c| !c.is_whitespace()).collect(),
            WhitespaceMode::IgnoreLeading => result.trim_start().to_string(),
            WhitespaceMode::IgnoreTrailing => result.trim_end().to_string(),
            WhitespaceMode::IgnoreChanges => result.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }

    /// Compare two extracted documents
    pub fn compare(
        &self,
        left: &ExtractedText,
        right: &ExtractedText,
    ) -> Result<DiffOutput, PdfCompareError> {
        let entries = self.diff(&left.lines, &right.lines);
        let summary = Self::summarize(&entries, left.line_count(), right.line_count());
        debug!(
            "Diff of {:?} and {:?}: {} entries, +{} -{}",
            left.path,
            right.path,
            entries.len(),
            summary.added,
            summary.removed
        );
        Ok(DiffOutput { entries, summary })
    }

    /// Diff two line sequences.
    ///
    /// Entries follow the edit script: unchanged lines carry the left text,
    /// and within a replaced block each similar pair is emitted as removed,
    /// hint, added, hint.
    pub fn diff(&self, left: &[String], right: &[String]) -> Vec<DiffEntry> {
        let left_keys: Vec<String> = left.iter().map(|l| self.normalize_line(l)).collect();
        let right_keys: Vec<String> = right.iter().map(|l| self.normalize_line(l)).collect();

        // Myers yields a minimal edit script, so counts are symmetric in the inputs
        let ops = capture_diff_slices(Algorithm::Myers, &left_keys, &right_keys);

        let mut differ = Differ {
            engine: self,
            left,
            right,
            left_keys: &left_keys,
            right_keys: &right_keys,
            out: Vec::with_capacity(left.len().max(right.len())),
        };

        for op in ops {
            let (tag, old, new) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => differ.dump(DiffKind::Unchanged, old.start, old.end),
                DiffTag::Delete => differ.dump(DiffKind::Removed, old.start, old.end),
                DiffTag::Insert => differ.dump(DiffKind::Added, new.start, new.end),
                DiffTag::Replace => differ.fancy_replace(old.start, old.end, new.start, new.end),
            }
        }

        differ.out
    }

    /// Count entries by kind; hints are ignored
    pub fn summarize(entries: &[DiffEntry], left_lines: usize, right_lines: usize) -> DiffSummary {
        let mut summary = DiffSummary {
            left_lines,
            right_lines,
            ..Default::default()
        };
        for entry in entries {
            match entry.kind {
                DiffKind::Added => summary.added += 1,
                DiffKind::Removed => summary.removed += 1,
                DiffKind::Unchanged => summary.unchanged += 1,
                DiffKind::IntralineHint => {}
            }
        }
        summary
    }

    /// Character markers for two similar lines.
    ///
    /// `-` marks a deleted, `+` an inserted and `^` a replaced character;
    /// trailing blanks are trimmed.
    pub fn intra_line_diff(&self, left_line: &str, right_line: &str) -> (String, String) {
        let diff = TextDiff::from_chars(left_line, right_line);
        let mut left_tags = String::new();
        let mut right_tags = String::new();

        for op in diff.ops() {
            let (tag, old, new) = op.as_tag_tuple();
            let (left_mark, right_mark) = match tag {
                DiffTag::Equal => (' ', ' '),
                DiffTag::Delete => ('-', ' '),
                DiffTag::Insert => (' ', '+'),
                DiffTag::Replace => ('^', '^'),
            };
            left_tags.extend(std::iter::repeat(left_mark).take(old.len()));
            right_tags.extend(std::iter::repeat(right_mark).take(new.len()));
        }

        (
            left_tags.trim_end().to_string(),
            right_tags.trim_end().to_string(),
        )
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Character similarity of two lines in `[0, 1]`
fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Upper bound of `similarity` computed from lengths only
fn length_bound(a: &str, b: &str) -> f32 {
    let la = a.chars().count();
    let lb = b.chars().count();
    if la + lb == 0 {
        return 1.0;
    }
    2.0 * la.min(lb) as f32 / (la + lb) as f32
}

struct Differ<'a> {
    engine: &'a DiffEngine,
    left: &'a [String],
    right: &'a [String],
    left_keys: &'a [String],
    right_keys: &'a [String],
    out: Vec<DiffEntry>,
}

impl Differ<'_> {
    fn dump(&mut self, kind: DiffKind, lo: usize, hi: usize) {
        let lines = match kind {
            DiffKind::Added => self.right,
            _ => self.left,
        };
        self.out
            .extend(lines[lo..hi].iter().map(|line| DiffEntry::new(kind, line.clone())));
    }

    fn plain_replace(&mut self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) {
        if b_hi - b_lo < a_hi - a_lo {
            self.dump(DiffKind::Added, b_lo, b_hi);
            self.dump(DiffKind::Removed, a_lo, a_hi);
        } else {
            self.dump(DiffKind::Removed, a_lo, a_hi);
            self.dump(DiffKind::Added, b_lo, b_hi);
        }
    }

    /// Pair up the most similar removed/added lines of a replaced block and
    /// recurse on both sides of the pair.
    fn fancy_replace(&mut self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) {
        if (a_hi - a_lo) * (b_hi - b_lo) > MAX_FANCY_PAIRS {
            self.plain_replace(a_lo, a_hi, b_lo, b_hi);
            return;
        }

        let cutoff = self.engine.config.intraline_cutoff;
        let mut best_ratio = cutoff - 0.01;
        let mut best: Option<(usize, usize)> = None;
        let mut identical: Option<(usize, usize)> = None;

        for j in b_lo..b_hi {
            let b = &self.right_keys[j];
            for i in a_lo..a_hi {
                let a = &self.left_keys[i];
                if a == b {
                    if identical.is_none() {
                        identical = Some((i, j));
                    }
                    continue;
                }
                if length_bound(a, b) > best_ratio {
                    let ratio = similarity(a, b);
                    if ratio > best_ratio {
                        best_ratio = ratio;
                        best = Some((i, j));
                    }
                }
            }
        }

        let (best_i, best_j, is_identical) = match best {
            Some((i, j)) if best_ratio >= cutoff => (i, j, false),
            _ => match identical {
                Some((i, j)) => (i, j, true),
                None => {
                    self.plain_replace(a_lo, a_hi, b_lo, b_hi);
                    return;
                }
            },
        };

        self.fancy_helper(a_lo, best_i, b_lo, best_j);

        if is_identical {
            self.out.push(DiffEntry::unchanged(self.left[best_i].clone()));
        } else {
            let left_line = &self.left[best_i];
            let right_line = &self.right[best_j];
            let hints = self
                .engine
                .config
                .intraline_hints
                .then(|| self.engine.intra_line_diff(left_line, right_line));

            self.out.push(DiffEntry::removed(left_line.clone()));
            if let Some((left_tags, _)) = &hints {
                if !left_tags.is_empty() {
                    self.out.push(DiffEntry::hint(left_tags.clone()));
                }
            }
            self.out.push(DiffEntry::added(right_line.clone()));
            if let Some((_, right_tags)) = &hints {
                if !right_tags.is_empty() {
                    self.out.push(DiffEntry::hint(right_tags.clone()));
                }
            }
        }

        self.fancy_helper(best_i + 1, a_hi, best_j + 1, b_hi);
    }

    fn fancy_helper(&mut self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) {
        if a_lo < a_hi {
            if b_lo < b_hi {
                self.fancy_replace(a_lo, a_hi, b_lo, b_hi);
            } else {
                self.dump(DiffKind::Removed, a_lo, a_hi);
            }
        } else if b_lo < b_hi {
            self.dump(DiffKind::Added, b_lo, b_hi);
        }
    }
}
