use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pdfcompare_common::{ensure_config, load_config, AppConfig, ReportFormat, WhitespaceMode};
use pdfcompare_core::{
    CancellableTask, DiffEngine, RenderedReport, RunningFlag, TaskEvent, TextDiffConfig,
    TextExtractor,
};
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdfcompare")]
#[command(author = "PDFCompare Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Compare the text content of two PDF documents", long_about = None)]
struct Cli {
    /// Show informational log output on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and diff the text of two PDF files
    Compare(CompareArgs),

    /// Show or create the configuration file
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,

        /// Use the configuration file next to the executable
        #[arg(long)]
        portable: bool,
    },
}

#[derive(Args)]
struct CompareArgs {
    /// Left (baseline) PDF file
    left: PathBuf,

    /// Right (modified) PDF file
    right: PathBuf,

    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable ANSI colors in text output
    #[arg(long)]
    no_color: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Ignore case when comparing lines
    #[arg(short, long)]
    ignore_case: bool,

    /// Whitespace handling
    #[arg(short, long, value_enum)]
    whitespace: Option<WhitespaceArg>,

    /// Do not pair similar lines when computing the diff
    #[arg(long)]
    no_hints: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Html,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Html => ReportFormat::Html,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WhitespaceArg {
    Exact,
    IgnoreAll,
    IgnoreLeading,
    IgnoreTrailing,
    IgnoreChanges,
}

impl From<WhitespaceArg> for WhitespaceMode {
    fn from(arg: WhitespaceArg) -> Self {
        match arg {
            WhitespaceArg::Exact => WhitespaceMode::Exact,
            WhitespaceArg::IgnoreAll => WhitespaceMode::IgnoreAll,
            WhitespaceArg::IgnoreLeading => WhitespaceMode::IgnoreLeading,
            WhitespaceArg::IgnoreTrailing => WhitespaceMode::IgnoreTrailing,
            WhitespaceArg::IgnoreChanges => WhitespaceMode::IgnoreChanges,
        }
    }
}

/// How a comparison run ended, as seen from its event stream
#[derive(Debug)]
enum CompareOutcome {
    Report(RenderedReport),
    Failed(String),
    Cancelled,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so reports on stdout stay clean
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let result = match cli.command {
        Commands::Compare(args) => run_compare(args),
        Commands::Config { init, portable } => run_config(init, portable),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_compare(args: CompareArgs) -> Result<()> {
    // Validate paths
    if !args.left.is_file() {
        bail!("Left file does not exist: {}", args.left.display());
    }
    if !args.right.is_file() {
        bail!("Right file does not exist: {}", args.right.display());
    }

    info!("Comparing:");
    info!("  Left:  {}", args.left.display());
    info!("  Right: {}", args.right.display());

    let loaded = load_config(false)?;
    if loaded.exists {
        info!("Using configuration {}", loaded.path.display());
    }
    let mut config = loaded.config;
    apply_overrides(&mut config, &args);

    let engine = DiffEngine::with_config(TextDiffConfig::from_options(&config.diff)?);
    let task = CancellableTask::new(
        &args.left,
        &args.right,
        Arc::new(TextExtractor::with_default_backends()),
        Arc::new(engine),
    );
    let mut handle = task.spawn()?;

    let running = handle.running_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        if on_interrupt(&running) {
            std::process::exit(130);
        }
    }) {
        warn!("Unable to install Ctrl-C handler: {}", e);
    }

    let show_progress = !args.no_progress && std::io::stderr().is_terminal();
    let progress = if show_progress {
        progress_bar()?
    } else {
        ProgressBar::hidden()
    };

    let outcome = collect_outcome(handle.events().iter(), &progress);
    handle.join()?;

    let report = match outcome {
        CompareOutcome::Report(report) => report,
        CompareOutcome::Failed(message) => bail!("{}", message),
        CompareOutcome::Cancelled => bail!("Comparison cancelled"),
    };

    let use_color = config.report.color
        && !args.no_color
        && args.output.is_none()
        && std::io::stdout().is_terminal();
    let rendered = render_report(&report, config.report.format, use_color)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}

fn run_config(init: bool, portable: bool) -> Result<()> {
    let loaded = if init {
        ensure_config(portable)?
    } else {
        load_config(portable)?
    };

    println!("Config file: {}", loaded.path.display());
    println!("Exists:      {}", init || loaded.exists);
    println!("Source:      {:?}", loaded.source);
    println!("Portable:    {}", loaded.is_portable());
    println!("Format:      {:?}", loaded.config.report.format);
    println!("Whitespace:  {:?}", loaded.config.diff.whitespace_mode);
    println!("Regex rules: {}", loaded.config.diff.regex_rules.len());
    Ok(())
}

/// Command-line flags take precedence over the configuration file
fn apply_overrides(config: &mut AppConfig, args: &CompareArgs) {
    if let Some(format) = args.format {
        config.report.format = format.into();
    }
    if args.no_color {
        config.report.color = false;
    }
    if args.ignore_case {
        config.diff.ignore_case = true;
    }
    if let Some(whitespace) = args.whitespace {
        config.diff.whitespace_mode = whitespace.into();
    }
    if args.no_hints {
        config.diff.intraline_hints = false;
    }
}

/// First interrupt cancels the comparison; returns true when the user insists
fn on_interrupt(running: &RunningFlag) -> bool {
    if running.is_running() {
        warn!("Interrupted, cancelling comparison (press Ctrl-C again to abort)");
        running.stop();
        false
    } else {
        true
    }
}

fn progress_bar() -> Result<ProgressBar> {
    let style = ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.green/dim}] {pos}%")?
        .progress_chars("=> ");
    let bar = ProgressBar::new(100);
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

/// Drain task events up to `Finished`, mirroring progress and status on the bar
fn collect_outcome(
    events: impl IntoIterator<Item = TaskEvent>,
    progress: &ProgressBar,
) -> CompareOutcome {
    let mut report = None;
    let mut failure = None;

    for event in events {
        match event {
            TaskEvent::Progress(percent) => progress.set_position(u64::from(percent)),
            TaskEvent::Status(message) => {
                info!("{}", message);
                progress.set_message(message);
            }
            TaskEvent::Result(rendered) => report = Some(rendered),
            TaskEvent::Error(message) => failure = Some(message),
            TaskEvent::Finished => break,
        }
    }
    progress.finish_and_clear();

    match (report, failure) {
        (_, Some(message)) => CompareOutcome::Failed(message),
        (Some(report), None) => CompareOutcome::Report(report),
        (None, None) => CompareOutcome::Cancelled,
    }
}

fn render_report(report: &RenderedReport, format: ReportFormat, color: bool) -> Result<String> {
    Ok(match format {
        ReportFormat::Text => report.to_text(color),
        ReportFormat::Html => format!("{}\n", report.to_html()),
        ReportFormat::Json => format!("{}\n", serde_json::to_string_pretty(report)?),
    })
}
