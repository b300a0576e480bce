//! trendscope: phrase-frequency analytics CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use trendscope::config::{build_ignore_set, load_config, write_default_config, CONFIG_FILENAME};
use trendscope::history::DEFAULT_PAGE_SIZE;
use trendscope::logging::{init_logging, LogFormat};
use trendscope::reporter::{ConsoleReporter, JsonReporter};
use trendscope::source::load_documents;
use trendscope::{list_runs, AnalysisEngine, JsonFileStore};

/// trendscope: phrase-frequency analytics over batches of JSON documents
#[derive(Parser, Debug)]
#[command(name = "trendscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (also enables debug logging)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Diagnostic log format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a page file or a directory of page files and record the run
    Analyze {
        /// JSON page file, or directory of *.json page files
        path: PathBuf,

        /// Output the run as JSON
        #[arg(long, short)]
        json: bool,

        /// Quiet mode (one summary line)
        #[arg(long, short)]
        quiet: bool,

        /// Run history file (default: .trendscope-history.jsonl)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Path to config file (default: search .trendscoperc.json from the input location upward)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Label recorded as the analyzed endpoint (default: the input path)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// List recorded runs, newest first
    List {
        /// Feed file or directory whose .trendscoperc.json selects the store (default: current dir)
        path: Option<PathBuf>,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Runs per page (1 to 1000)
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Output the page as JSON
        #[arg(long, short)]
        json: bool,

        /// Run history file (default: .trendscope-history.jsonl)
        #[arg(long)]
        store: Option<PathBuf>,

        /// Path to config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create .trendscoperc.json with default settings
    Init {
        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose, args.log_format);

    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    match args.command {
        Commands::Analyze {
            path,
            json,
            quiet,
            store,
            config,
            endpoint,
        } => run_analyze(
            &cwd,
            AnalyzeOptions {
                path,
                json,
                quiet,
                verbose: args.verbose,
                store,
                config,
                endpoint,
            },
        ),
        Commands::List {
            path,
            page,
            page_size,
            json,
            store,
            config,
        } => run_list(
            &cwd,
            ListOptions {
                path,
                page,
                page_size,
                json,
                store,
                config,
            },
        ),
        Commands::Init { dir } => run_init(&cwd, dir.as_deref()),
    }
}

struct AnalyzeOptions {
    path: PathBuf,
    json: bool,
    quiet: bool,
    verbose: bool,
    store: Option<PathBuf>,
    config: Option<PathBuf>,
    endpoint: Option<String>,
}

struct ListOptions {
    path: Option<PathBuf>,
    page: usize,
    page_size: usize,
    json: bool,
    store: Option<PathBuf>,
    config: Option<PathBuf>,
}

/// Config is searched from the input location: the directory itself, or a file's parent
fn config_dir<'a>(cwd: &'a Path, path: &'a Path) -> &'a Path {
    if path.is_file() {
        path.parent().unwrap_or(cwd)
    } else {
        path
    }
}

fn run_analyze(cwd: &Path, opts: AnalyzeOptions) -> Result<ExitCode> {
    let path = absolute(cwd, &opts.path);
    let work_dir = config_dir(cwd, &path);
    let config_path = opts.config.as_deref().map(|c| absolute(cwd, c));
    let store_override = opts.store.as_deref().map(|s| absolute(cwd, s));
    let config = load_config(work_dir, config_path.as_deref())?
        .merge_with_cli(store_override.as_deref(), opts.endpoint.as_deref());

    let ignore_set = if config.ignore.is_empty() {
        None
    } else {
        Some(build_ignore_set(&config.ignore)?)
    };

    let documents = load_documents(&path, ignore_set.as_ref())?;
    if documents.is_empty() && !opts.json {
        eprintln!(
            "{}: no documents found in {}; recording an empty run",
            "Warning".yellow(),
            path.display()
        );
    }

    let default_endpoint = opts.path.display().to_string();
    let endpoint = config.endpoint_or(&default_endpoint);
    let mut store = JsonFileStore::new(config.store_path(cwd));
    let run = AnalysisEngine::new(config.to_engine_settings())
        .run(&mut store, &documents, endpoint)
        .context("Analysis failed")?;

    if opts.json {
        println!("{}", JsonReporter::new().pretty().report(&run));
    } else if opts.quiet {
        ConsoleReporter::new().report_quiet(&run);
    } else {
        let reporter = if opts.verbose {
            ConsoleReporter::new().verbose()
        } else {
            ConsoleReporter::new()
        };
        reporter.report(&run);
        eprintln!(
            "{} Run {} saved to {}",
            "Done".green().bold(),
            run.id,
            store.path().display()
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn run_list(cwd: &Path, opts: ListOptions) -> Result<ExitCode> {
    let path = opts.path.as_deref().map(|p| absolute(cwd, p));
    let work_dir = path.as_deref().map_or(cwd, |p| config_dir(cwd, p));
    let config_path = opts.config.as_deref().map(|c| absolute(cwd, c));
    let store_override = opts.store.as_deref().map(|s| absolute(cwd, s));
    let config = load_config(work_dir, config_path.as_deref())?
        .merge_with_cli(store_override.as_deref(), None);
    let store = JsonFileStore::new(config.store_path(cwd));

    let page = list_runs(&store, opts.page, opts.page_size)
        .with_context(|| format!("Failed to read run history: {}", store.path().display()))?;

    if opts.json {
        println!("{}", JsonReporter::new().pretty().report_page(&page));
    } else {
        ConsoleReporter::new().report_page(&page);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_init(cwd: &Path, dir: Option<&Path>) -> Result<ExitCode> {
    let dir = dir.map(|d| absolute(cwd, d)).unwrap_or_else(|| cwd.to_path_buf());
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() {
        eprintln!(
            "{}: {} already exists; use --dir to write elsewhere or remove it first",
            "Warning".yellow(),
            config_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let written = write_default_config(&dir)?;
    println!("{} Created {}", "Done".green().bold(), written.display());
    println!(
        "{}: edit significanceLevel, trendWindow and store to suit your feeds",
        "Info".blue()
    );
    Ok(ExitCode::SUCCESS)
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
