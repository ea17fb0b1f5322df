//! CLI definition, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use adoptedtexts_core::{HarvestProgress, HarvestReport, run_harvest};
use adoptedtexts_crawler::{HttpFetcher, WalkEnd};
use adoptedtexts_dataset::{DatasetSink, HubCredentials, HubSink, JsonlSink};
use adoptedtexts_shared::{AppConfig, DocumentRecord, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// AdoptedTexts: harvest European Parliament adopted texts (Dutch) into a dataset.
#[derive(Parser)]
#[command(
    name = "adoptedtexts",
    version,
    about = "Crawl the European Parliament's Dutch adopted texts and publish them as a dataset.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.adoptedtexts/adoptedtexts.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Local JSON Lines output path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after this many table-of-contents pages.
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Write the local file only; never upload.
    #[arg(long)]
    pub no_push: bool,

    /// Keep records whose content page yielded no text.
    #[arg(long)]
    pub keep_empty: bool,

    /// Without a subcommand, run the harvest.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "adoptedtexts=info",
        1 => "adoptedtexts=debug",
        _ => "adoptedtexts=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&cli),
        },
        None => cmd_harvest(&cli).await,
    }
}

/// Load the config file and apply command-line overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    if let Some(output) = &cli.output {
        config.dataset.output_path = output.clone();
    }
    if cli.max_pages.is_some() {
        config.crawl.max_pages = cli.max_pages;
    }
    if cli.keep_empty {
        config.extract.keep_empty_records = true;
    }

    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_harvest(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let fetcher = HttpFetcher::new(&config.crawl)?;

    let mut sinks: Vec<Box<dyn DatasetSink>> =
        vec![Box::new(JsonlSink::new(&config.dataset.output_path))];

    if cli.no_push {
        info!("upload disabled, records stay local");
    } else {
        match HubCredentials::from_env(&config.hub, &config.dataset) {
            Some(credentials) => {
                let hub = HubSink::new(&config.hub, &config.dataset, &credentials)?;
                info!(repo = hub.repo_id(), "uploading to Hugging Face Hub after the crawl");
                sinks.push(Box::new(hub));
            }
            None => info!(
                token_env = %config.hub.token_env,
                "no Hugging Face token set, records stay local"
            ),
        }
    }

    info!(seed = %config.crawl.seed_url, "harvesting adopted texts");

    let reporter = CliProgress::new();
    let report = run_harvest(&config, &fetcher, &sinks, &reporter).await?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &HarvestReport) {
    println!();
    match &report.end {
        WalkEnd::Done { reason } => println!("  Harvest finished: {reason}"),
        WalkEnd::Failed { error } => println!("  Harvest stopped early: {error}"),
    }
    if let Some(toc) = &report.last_toc {
        println!("  Last TOC:  {toc}");
    }
    println!("  Pages:     {}", report.pages_visited);
    println!("  Records:   {}", report.records_collected);
    if report.empty_filtered > 0 {
        println!("  Empty:     {} dropped", report.empty_filtered);
    }
    if report.receipts.is_empty() {
        println!("  Output:    nothing written (no data scraped)");
    }
    for receipt in &report.receipts {
        println!(
            "  Output:    {} records -> {} ({})",
            receipt.records, receipt.location, receipt.sink
        );
    }
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix} {msg}")
                .expect("valid spinner template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl HarvestProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn toc_visited(&self, url: &Url, count: usize) {
        let page = url.path_segments().and_then(|mut s| s.next_back()).unwrap_or("");
        self.spinner.set_message(format!("TOC [{count}] {page}"));
    }

    fn record_collected(&self, _record: &DocumentRecord, total: usize) {
        self.spinner.set_prefix(format!("[{total} texts]"));
    }

    fn done(&self, _report: &HarvestReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_runs_harvest() {
        let cli = Cli::try_parse_from(["adoptedtexts"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.no_push);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = std::env::temp_dir().join(format!("adoptedtexts-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("adoptedtexts.toml");
        std::fs::write(&path, "[crawl]\nmax_pages = 10\n\n[dataset]\nname = \"Custom\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "adoptedtexts",
            "--config",
            path.to_str().unwrap(),
            "--output",
            "out/texts.jsonl",
            "--max-pages",
            "3",
            "--keep-empty",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();

        assert_eq!(config.crawl.max_pages, Some(3));
        assert_eq!(config.dataset.output_path, PathBuf::from("out/texts.jsonl"));
        assert_eq!(config.dataset.name, "Custom");
        assert!(config.extract.keep_empty_records);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn config_subcommand_parses_with_global_flags() {
        let cli = Cli::try_parse_from(["adoptedtexts", "config", "show", "-vv"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Show
            })
        ));
        assert_eq!(cli.verbose, 2);
    }
}
