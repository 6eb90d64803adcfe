//! pdfsplit CLI - split PDFs by page ranges and manage the offline asset cache

mod fetch;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfsplit::cache::{
    CacheStorage, DiskCacheStorage, OfflineWorker, PrecacheManifest, Request, WorkerConfig,
    WorkerMessage,
};
use pdfsplit::{
    DirectorySink, DownloadSink, FileNaming, SkipReason, SourceDocument, SplitOptions,
    SplitStatus, Splitter,
};

use crate::fetch::HttpFetcher;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pdfsplit")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Split PDF files by page ranges", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Split a PDF into one file per range expression
    Split {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Range expression (e.g., "1-10", "1,3,5-7"); repeat for more files
        #[arg(short, long = "range", value_name = "EXPR", required = true)]
        ranges: Vec<String>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Drop pages past the end of the document instead of failing
        #[arg(long)]
        skip_missing: bool,

        /// Process ranges one at a time
        #[arg(long)]
        sequential: bool,

        /// Name outputs by position only
        #[arg(long)]
        index_names: bool,

        /// Accept input files without a .pdf extension
        #[arg(long)]
        force: bool,
    },

    /// Manage the offline asset cache
    Cache {
        /// Cache directory
        #[arg(
            long,
            global = true,
            value_name = "DIR",
            env = "PDFSPLIT_CACHE_DIR",
            default_value = ".pdfsplit-cache"
        )]
        cache_dir: PathBuf,

        /// Origin that asset paths are resolved against
        #[arg(long, global = true, value_name = "URL", env = "PDFSPLIT_ORIGIN")]
        origin: Option<String>,

        /// Build version naming the cache
        #[arg(
            long = "version",
            id = "build_version",
            global = true,
            value_name = "VERSION",
            env = "PDFSPLIT_VERSION"
        )]
        build_version: Option<String>,

        /// Precache manifest (JSON with "build" and "files" lists)
        #[arg(long, global = true, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Network timeout in seconds
        #[arg(long, global = true, default_value = "30")]
        timeout: u64,

        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Precache the manifest assets for a version
    Install {
        /// Activate right after installing
        #[arg(long)]
        skip_waiting: bool,
    },

    /// Activate an installed version, deleting every other cache
    Activate,

    /// Fetch a URL through the active worker
    Fetch {
        /// URL to request
        #[arg(value_name = "URL")]
        url: String,

        /// Write the body here (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List caches and their entries
    List,

    /// Delete every cache
    Clear,
}

/// Settings shared by the cache subcommands.
struct CacheSettings {
    cache_dir: PathBuf,
    origin: Option<String>,
    version: Option<String>,
    manifest: Option<PathBuf>,
    timeout: Duration,
}

impl CacheSettings {
    fn storage(&self) -> Arc<DiskCacheStorage> {
        Arc::new(DiskCacheStorage::new(&self.cache_dir))
    }

    fn worker_config(&self) -> Result<WorkerConfig, Box<dyn std::error::Error>> {
        let origin = self
            .origin
            .as_deref()
            .ok_or("missing --origin (or PDFSPLIT_ORIGIN)")?;
        let version = self
            .version
            .as_deref()
            .ok_or("missing --version (or PDFSPLIT_VERSION)")?;
        let manifest = match &self.manifest {
            Some(path) => PrecacheManifest::from_path(path)?,
            None => PrecacheManifest::default(),
        };
        Ok(WorkerConfig::new(origin, version, manifest)?)
    }

    fn fetcher(&self) -> Result<Arc<HttpFetcher>, Box<dyn std::error::Error>> {
        Ok(Arc::new(HttpFetcher::new(self.timeout)?))
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::Split {
            input,
            ranges,
            output,
            skip_missing,
            sequential,
            index_names,
            force,
        } => {
            let mut options = SplitOptions::new().with_parallel(!sequential);
            if skip_missing {
                options = options.skip_missing();
            }
            if index_names {
                options = options.with_naming(FileNaming::Index);
            }
            cmd_split(&input, &ranges, output.as_deref(), options, force)
        }
        Commands::Cache {
            cache_dir,
            origin,
            build_version,
            manifest,
            timeout,
            action,
        } => {
            let settings = CacheSettings {
                cache_dir,
                origin,
                version: build_version,
                manifest,
                timeout: Duration::from_secs(timeout),
            };
            cmd_cache(&settings, action)
        }
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn cmd_info(input: &Path, json: bool) -> CmdResult {
    let size = fs::metadata(input)?.len();
    let source = SourceDocument::open(input)?;

    if json {
        let info = serde_json::json!({
            "file": input.display().to_string(),
            "version": source.version(),
            "pages": source.page_count(),
            "size": size,
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), source.version());
    println!("{}: {}", "Pages".bold(), source.page_count());
    println!("{}: {} bytes", "Size".bold(), size);

    Ok(())
}

/// Directory sink that advances a progress bar per delivered file.
struct ProgressSink {
    inner: DirectorySink,
    bar: ProgressBar,
}

impl DownloadSink for ProgressSink {
    fn deliver(&self, data: &[u8], filename: &str, mime: &str) -> pdfsplit::Result<()> {
        self.inner.deliver(data, filename, mime)?;
        self.bar.set_message(filename.to_string());
        self.bar.inc(1);
        Ok(())
    }
}

fn cmd_split(
    input: &Path,
    ranges: &[String],
    output: Option<&Path>,
    options: SplitOptions,
    force: bool,
) -> CmdResult {
    if !force && !has_pdf_extension(input) {
        return Err(format!(
            "{} is not a .pdf file (use --force to split it anyway)",
            input.display()
        )
        .into());
    }

    let output_dir = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_split", stem))
    });

    let source = SourceDocument::open(input)?;
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pb = ProgressBar::new(ranges.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    let sink = ProgressSink {
        inner: DirectorySink::new(&output_dir),
        bar: pb.clone(),
    };

    let report = Splitter::new(&source)
        .with_options(options)
        .with_file_name(&file_name)
        .run(ranges, &sink);
    pb.finish_and_clear();

    println!(
        "{} {} ({} pages)",
        "Source:".cyan().bold(),
        input.display(),
        source.page_count()
    );
    for result in &report.results {
        let label = format!("#{} {:?}", result.index + 1, result.expression);
        match &result.status {
            SplitStatus::Saved { filename, pages } => {
                println!(
                    "  {} {} -> {} ({} pages)",
                    "✓".green(),
                    label,
                    output_dir.join(filename).display(),
                    pages
                );
            }
            SplitStatus::Skipped(reason) => {
                let why = match reason {
                    SkipReason::Blank => "empty expression",
                    SkipReason::NoPages => "no pages selected",
                };
                println!("  {} {} skipped: {}", "-".yellow(), label, why);
            }
            SplitStatus::Failed(e) => {
                println!("  {} {} failed: {}", "✗".red(), label, e);
            }
        }
        for token in &result.rejected {
            println!(
                "      {} ignored '{}': {}",
                "!".yellow(),
                token.token,
                token.reason
            );
        }
    }

    println!(
        "\n{} {} saved, {} skipped, {} failed",
        "Done!".green().bold(),
        report.saved(),
        report.skipped(),
        report.failed()
    );

    if !report.results.is_empty() && report.failed() == report.results.len() {
        return Err(format!("all {} ranges failed", report.failed()).into());
    }
    Ok(())
}

fn cmd_cache(settings: &CacheSettings, action: CacheCommand) -> CmdResult {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match action {
            CacheCommand::Install { skip_waiting } => cache_install(settings, skip_waiting).await,
            CacheCommand::Activate => cache_activate(settings).await,
            CacheCommand::Fetch { url, output } => {
                cache_fetch(settings, &url, output.as_deref()).await
            }
            CacheCommand::List => cache_list(settings).await,
            CacheCommand::Clear => cache_clear(settings).await,
        }
    })
}

async fn cache_install(settings: &CacheSettings, skip_waiting: bool) -> CmdResult {
    let config = settings.worker_config()?;
    let worker = OfflineWorker::new(config, settings.storage(), settings.fetcher()?);

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!(
        "Precaching {} assets into {}...",
        worker.assets().len(),
        worker.cache_name()
    ));
    pb.enable_steady_tick(Duration::from_millis(100));
    let installed = worker.install().await;
    pb.finish_and_clear();
    installed?;

    println!(
        "{} {} ({} assets)",
        "Installed".green(),
        worker.cache_name(),
        worker.assets().len()
    );

    if skip_waiting && worker.handle_message(&WorkerMessage::SkipWaiting).await? {
        println!("{} {}", "Activated".green(), worker.cache_name());
    }
    Ok(())
}

async fn cache_activate(settings: &CacheSettings) -> CmdResult {
    let config = settings.worker_config()?;
    let storage = settings.storage();
    if !storage.has(&config.cache_name()).await? {
        return Err(format!("{} is not installed", config.cache_name()).into());
    }

    let worker = OfflineWorker::installed(config, storage, settings.fetcher()?);
    worker.activate().await?;
    println!("{} {}", "Activated".green(), worker.cache_name());
    Ok(())
}

async fn cache_fetch(settings: &CacheSettings, url: &str, output: Option<&Path>) -> CmdResult {
    let config = settings.worker_config()?;
    let storage = settings.storage();
    if !storage.has(&config.cache_name()).await? {
        log::warn!("{} is not installed; responses come from the network", config.cache_name());
    }

    let worker = OfflineWorker::attach(config, storage, settings.fetcher()?);
    let request = Request::get(url)?;
    let response = worker
        .handle_fetch(&request)
        .await
        .ok_or("request was not handled by the worker")?;

    let status = if response.is_ok() {
        response.status.to_string().green()
    } else {
        response.status.to_string().red()
    };
    eprintln!("{} {} ({} bytes)", status, url, response.body.len());

    if let Some(path) = output {
        fs::write(path, &response.body)?;
        eprintln!("{} {}", "Saved to".green(), path.display());
    } else {
        std::io::stdout().write_all(&response.body)?;
    }
    Ok(())
}

async fn cache_list(settings: &CacheSettings) -> CmdResult {
    let storage = settings.storage();
    let names = storage.keys().await?;
    if names.is_empty() {
        println!("{}", "No caches".dimmed());
        return Ok(());
    }

    for name in names {
        let cache = storage.open(&name).await?;
        let keys = cache.keys().await?;
        println!("{} ({} entries)", name.cyan().bold(), keys.len());
        for (i, key) in keys.iter().enumerate() {
            let branch = if i + 1 == keys.len() { "└─" } else { "├─" };
            println!("  {} {}", branch.dimmed(), key);
        }
    }
    Ok(())
}

async fn cache_clear(settings: &CacheSettings) -> CmdResult {
    let storage = settings.storage();
    let mut removed = 0;
    for name in storage.keys().await? {
        if storage.delete(&name).await? {
            removed += 1;
        }
    }
    println!("{} {} caches removed", "Done!".green().bold(), removed);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfsplit".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF page range splitter");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/pdfsplit".dimmed());
    println!("License: MIT");
}
