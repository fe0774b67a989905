use pdfcompare_common::{DiffEntry, DiffKind, DiffSummary};
use serde::Serialize;

/// One displayable line of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub kind: DiffKind,
    pub text: String,
}

impl ReportLine {
    /// Marker shown in front of the line text
    pub fn prefix(&self) -> &'static str {
        match self.kind {
            DiffKind::Removed => "- ",
            DiffKind::Added => "+ ",
            DiffKind::Unchanged | DiffKind::IntralineHint => "  ",
        }
    }

    fn css_class(&self) -> &'static str {
        match self.kind {
            DiffKind::Removed => "removed",
            DiffKind::Added => "added",
            DiffKind::Unchanged | DiffKind::IntralineHint => "unchanged",
        }
    }

    fn html_color(&self) -> &'static str {
        match self.kind {
            DiffKind::Removed => "red",
            DiffKind::Added => "green",
            DiffKind::Unchanged | DiffKind::IntralineHint => "gray",
        }
    }

    fn ansi_color(&self) -> &'static str {
        match self.kind {
            DiffKind::Removed => "\x1b[31m",                          // Red
            DiffKind::Added => "\x1b[32m",                            // Green
            DiffKind::Unchanged | DiffKind::IntralineHint => "\x1b[90m", // Gray
        }
    }
}

/// Display-ready diff with its summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    pub lines: Vec<ReportLine>,
    pub summary: DiffSummary,
    pub summary_line: String,
}

impl RenderedReport {
    /// Rich-text rendering: one colored span per line, joined with `<br>`,
    /// followed by the bold summary line
    pub fn to_html(&self) -> String {
        let mut parts: Vec<String> = self
            .lines
            .iter()
            .map(|line| {
                format!(
                    "<span class=\"{}\" style=\"color:{}\">{}{}</span>",
                    line.css_class(),
                    line.html_color(),
                    line.prefix(),
                    escape_html(&line.text)
                )
            })
            .collect();
        parts.push(format!("\n<b>{}</b>", escape_html(&self.summary_line)));
        parts.join("<br>")
    }

    /// Terminal rendering, optionally with ANSI colors
    pub fn to_text(&self, color: bool) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if color {
                out.push_str(line.ansi_color());
            }
            out.push_str(line.prefix());
            out.push_str(&line.text);
            if color {
                out.push_str("\x1b[0m");
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.summary_line);
        out.push('\n');
        out
    }
}

/// Turns diff entries into a report
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultFormatter;

impl ResultFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Map entries to report lines, dropping intraline hints, and attach the summary line
    pub fn format(&self, entries: &[DiffEntry], summary: &DiffSummary) -> RenderedReport {
        let lines = entries
            .iter()
            .filter(|entry| entry.kind != DiffKind::IntralineHint)
            .map(|entry| ReportLine {
                kind: entry.kind,
                text: entry.text.clone(),
            })
            .collect();

        RenderedReport {
            lines,
            summary: *summary,
            summary_line: summary_line(summary),
        }
    }
}

pub fn summary_line(summary: &DiffSummary) -> String {
    format!(
        "Total: {} additions, {} deletions",
        summary.added, summary.removed
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
