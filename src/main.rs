use clap::{Parser, Subcommand};
use rawshelf::preview::PreviewCache;
use rawshelf::{config, output, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rawshelf")]
#[command(about = "Serve a directory of camera RAW files with cached JPEG previews")]
#[command(long_about = "\
Serve a directory of camera RAW files with cached JPEG previews

RAW files are listed with their EXIF tags, rendered to bounded JPEG previews
on first request, and re-rendered only when the RAW file's modification time
changes. Previews and the validity ledger live next to each other:

  raw_images/                # Source RAW files (CR2, NEF, ARW, DNG, ...)
  converted_images/          # Rendered previews (IMG_0001.CR2 → IMG_0001.jpg)
  process_info.json          # RAW file name → mtime at last render

HTTP routes (rawshelf serve):

  GET /images                    RAW inventory with EXIF tags
  GET /image-preview/{filename}  JPEG preview, rendered if stale
  GET /download/{filename}       Original RAW file

Set RUST_LOG (e.g. RUST_LOG=rawshelf=debug) to change log verbosity.
Run 'rawshelf gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// RAW directory (overrides config)
    #[arg(long, global = true)]
    raw_dir: Option<PathBuf>,

    /// Preview directory (overrides config)
    #[arg(long, global = true)]
    preview_dir: Option<PathBuf>,

    /// Validity ledger file (overrides config)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// List RAW files with their EXIF tags
    List,
    /// Bring one file's preview up to date
    Preview {
        /// RAW file name inside the RAW directory
        filename: String,
    },
    /// Bring every preview up to date, in parallel
    Warm,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Serve => {
            let config = load_config(&cli)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(&config))?;
        }
        Command::List => {
            let config = load_config(&cli)?;
            let cache = PreviewCache::from_config(&config)?;
            output::print_listing(&cache.listing()?);
        }
        Command::Preview { filename } => {
            let config = load_config(&cli)?;
            let cache = PreviewCache::from_config(&config)?;
            let result = cache.refresh(filename);
            println!("{}", output::format_refresh(filename, &result));
            result?;
        }
        Command::Warm => {
            let config = load_config(&cli)?;
            init_thread_pool(&config.processing);
            let cache = PreviewCache::from_config(&config)?;
            let report = cache.warm()?;
            output::print_warm_report(&report);
            if report.stats.failed > 0 {
                return Err(format!("{} preview(s) failed", report.stats.failed).into());
            }
        }
    }

    Ok(())
}

/// Load the config file and apply command-line overrides; the result is
/// validated only once the overrides are in place.
fn load_config(cli: &Cli) -> Result<config::ServerConfig, config::ConfigError> {
    config::load_config_with(&cli.config, |config| {
        if let Some(dir) = &cli.raw_dir {
            config.raw_dir = dir.clone();
        }
        if let Some(dir) = &cli.preview_dir {
            config.preview_dir = dir.clone();
        }
        if let Some(path) = &cli.ledger {
            config.ledger_file = path.clone();
        }
    })
}

/// Log to stderr; `RUST_LOG` overrides the default `rawshelf=info`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rawshelf=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
