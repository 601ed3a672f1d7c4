use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use reposift::config::{DensityAnalyzerKind, NerMethod};
use reposift::format::{OutputFormat, create_formatter, write_records};
use reposift::{FileProcessor, FileRecord, FileScorer, ProgressInfo, ReposiftConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Plain,
    Json,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Plain => OutputFormat::Plain,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNerMethod {
    Pattern,
    Structural,
    Learned,
    Hybrid,
}

impl From<CliNerMethod> for NerMethod {
    fn from(m: CliNerMethod) -> Self {
        match m {
            CliNerMethod::Pattern => NerMethod::Pattern,
            CliNerMethod::Structural => NerMethod::Structural,
            CliNerMethod::Learned => NerMethod::Learned,
            CliNerMethod::Hybrid => NerMethod::Hybrid,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDensity {
    Line,
    Structural,
}

impl From<CliDensity> for DensityAnalyzerKind {
    fn from(d: CliDensity) -> Self {
        match d {
            CliDensity::Line => DensityAnalyzerKind::Line,
            CliDensity::Structural => DensityAnalyzerKind::Structural,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Select, score and summarize repository files for LLM context", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to ./reposift.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process every eligible file and print the result
    Scan(ScanArgs),

    /// Score every eligible file and print the JSON report
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Repository root
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Add ignore pattern (glob)
    #[arg(long)]
    ignore: Vec<String>,

    /// Add include pattern (glob) - only include matching files
    #[arg(long)]
    include: Vec<String>,

    /// Do not read .gitignore
    #[arg(long)]
    no_gitignore: bool,
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Output file path (stdout when absent)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    format: CliOutputFormat,

    /// Emit every file in full, never as a summary
    #[arg(long)]
    no_summary: bool,

    /// Files above this many bytes are summarized
    #[arg(long)]
    summary_threshold: Option<u64>,

    /// Add named entities to summaries using this backend
    #[arg(long, value_enum)]
    ner: Option<CliNerMethod>,

    /// Only process files the scorer selects
    #[arg(long)]
    select: bool,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Collect paths with a single walker
    #[arg(long)]
    sequential: bool,

    /// Maximum file size in bytes (skip larger files)
    #[arg(long)]
    max_size: Option<u64>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Minimum score for a file to be selected
    #[arg(long)]
    threshold: Option<f64>,

    /// Code density backend
    #[arg(long, value_enum)]
    density: Option<CliDensity>,

    /// Print only the selected paths, one per line
    #[arg(long)]
    selected: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment takes precedence; --verbose falls back to DEBUG.
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    // Explicit file, then ./reposift.toml, then defaults
    let config = match &cli.config {
        Some(path) => ReposiftConfig::load(path)?,
        None => ReposiftConfig::load_from_file().unwrap_or_default(),
    };

    match cli.command {
        Command::Scan(args) => scan(config, args),
        Command::Score(args) => score(config, args),
    }
}

/// CLI filters are added on top of the configured ones.
fn apply_filters(config: &mut ReposiftConfig, filter: &FilterArgs) {
    config.ignore_patterns.extend(filter.ignore.iter().cloned());
    if !filter.include.is_empty() {
        config.include_patterns = filter.include.clone();
    }
    if filter.no_gitignore {
        config.use_gitignore = false;
    }
}

fn scan(mut config: ReposiftConfig, args: ScanArgs) -> Result<()> {
    apply_filters(&mut config, &args.filter);
    if let Some(threads) = args.threads {
        config.processor.threads = threads;
    }
    if let Some(size) = args.max_size {
        config.processor.max_file_size = size;
    }
    if args.no_summary {
        config.summary.enabled = false;
    }
    if let Some(threshold) = args.summary_threshold {
        config.summary.size_threshold = threshold;
    }
    if let Some(method) = args.ner {
        config.summary.ner.enabled = true;
        config.summary.ner.method = method.into();
    }
    if args.select {
        config.scoring_enabled = true;
    }

    let root = args.filter.path.as_path();
    let matcher = config.build_matcher(root);
    let mut processor =
        FileProcessor::new(matcher.clone(), config.processor.clone()).with_summary_config(config.summary.clone());

    let bar = (!args.no_progress).then(create_progress_bar);
    if let Some(bar) = &bar {
        let bar = bar.clone();
        processor.set_progress_callback(move |info: &ProgressInfo| update_progress(&bar, info));
    }

    let records = if config.scoring_enabled {
        let scorer = FileScorer::new(config.scoring.clone(), matcher)
            .with_follow_symlinks(config.processor.follow_symlinks);
        let scored = scorer
            .score_repository(root)
            .with_context(|| format!("Failed to score {}", root.display()))?;
        let paths: Vec<PathBuf> = scorer
            .get_selected_files(&scored)
            .into_iter()
            .map(|rel| root.join(rel))
            .collect();
        processor.process_paths(paths, processor.new_tracker())
    } else {
        processor
            .process_directory(root, !args.sequential)
            .with_context(|| format!("Failed to scan {}", root.display()))?
    };
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    let records: Vec<FileRecord> = records
        .iter()
        .map(|record| processor.summarizer().summarized(record))
        .collect();

    let mut formatter = create_formatter(args.format.into());
    let mut output = open_output(args.output.as_deref())?;
    write_records(formatter.as_mut(), output.as_mut(), &records, root)?;
    output.flush()?;
    Ok(())
}

fn score(mut config: ReposiftConfig, args: ScoreArgs) -> Result<()> {
    apply_filters(&mut config, &args.filter);
    if let Some(threshold) = args.threshold {
        config.scoring.inclusion_threshold = threshold;
    }
    if let Some(density) = args.density {
        config.scoring.density_analyzer = density.into();
    }

    let root = args.filter.path.as_path();
    let scorer = FileScorer::new(config.scoring.clone(), config.build_matcher(root))
        .with_follow_symlinks(config.processor.follow_symlinks);
    let scored = scorer
        .score_repository(root)
        .with_context(|| format!("Failed to score {}", root.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.selected {
        for path in scorer.get_selected_files(&scored) {
            writeln!(out, "{}", path.display())?;
        }
    } else {
        serde_json::to_writer_pretty(&mut out, &scorer.report(&scored))?;
        writeln!(out)?;
    }
    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::BufWriter::new(std::io::stdout()))),
    }
}

fn create_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to create progress bar template: {}", e);
            ProgressStyle::default_bar()
        })
        .progress_chars("=>-");
    bar.set_style(style);
    bar.set_message("Scanning");
    bar
}

fn update_progress(bar: &ProgressBar, info: &ProgressInfo) {
    bar.set_length(info.total_files as u64);
    bar.set_position(info.completed() as u64);
}
