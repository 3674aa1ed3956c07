//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use certscrape_core::{Locations, ProgressReporter};
use certscrape_document::{DocumentSource, HttpSource, StaticSite};
use certscrape_shared::{
    AppConfig, NavigationConfig, RequestFlags, ScrapeEnvelope, ScrapeRequest, init_config,
    load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// certscrape: pull credential records out of profile pages.
#[derive(Parser)]
#[command(
    name = "certscrape",
    version,
    about = "Extract licence and certification records from profile pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
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
    /// Scrape one profile and print the result envelope.
    Scrape(ScrapeArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct ScrapeArgs {
    /// Profile (or detail view) location.
    url: String,

    /// Upper bound for each wait, in milliseconds.
    #[arg(long)]
    max_wait: Option<u64>,

    /// Only try the detail view.
    #[arg(long)]
    detail_only: bool,

    /// Never trigger the "show all" control.
    #[arg(long)]
    no_expand: bool,

    /// Saved detail-view page to replay instead of fetching.
    #[arg(long, value_name = "FILE")]
    detail_html: Option<PathBuf>,

    /// Saved profile page to replay instead of fetching.
    #[arg(long, value_name = "FILE")]
    profile_html: Option<PathBuf>,

    /// Write the envelope here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Single-line JSON.
    #[arg(long)]
    compact: bool,
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

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "certscrape=info",
        1 => "certscrape=debug",
        _ => "certscrape=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    match cli.command {
        Command::Scrape(args) => cmd_scrape(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn cmd_scrape(args: ScrapeArgs) -> Result<()> {
    let config = load_config()?;
    let target = Url::parse(&args.url).map_err(|e| eyre!("invalid URL '{}': {e}", args.url))?;

    let mut flags = RequestFlags::from(&config.defaults);
    if let Some(ms) = args.max_wait {
        flags.max_wait_ms = ms;
    }
    flags.detail_only |= args.detail_only;
    flags.expand_all &= !args.no_expand;

    // Replay runs without pacing pauses.
    let replay = args.detail_html.is_some() || args.profile_html.is_some();
    let source: Box<dyn DocumentSource> = if replay {
        Box::new(replay_site(
            &config,
            &target,
            args.detail_html.as_deref(),
            args.profile_html.as_deref(),
        )?)
    } else {
        Box::new(HttpSource::new(&config.http)?)
    };
    let nav = if replay {
        NavigationConfig {
            detail_suffix: config.site.detail_suffix.clone(),
            ..NavigationConfig::immediate()
        }
    } else {
        NavigationConfig::from(&config)
    };

    info!(
        url = %target,
        source = source.name(),
        max_wait_ms = flags.max_wait_ms,
        detail_only = flags.detail_only,
        expand_all = flags.expand_all,
        "scraping"
    );

    let request = ScrapeRequest { target, flags };
    let reporter = CliProgress::new();
    let result = certscrape_core::scrape(source.as_ref(), &request, &nav, &reporter).await;
    // `done` only runs on success.
    reporter.spinner.finish_and_clear();
    let envelope = result?;

    let json = if args.compact {
        serde_json::to_string(&envelope)?
    } else {
        serde_json::to_string_pretty(&envelope)?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), records = envelope.total_records, "envelope written");
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Serve saved pages at the locations the request will visit.
fn replay_site(
    config: &AppConfig,
    target: &Url,
    detail_html: Option<&Path>,
    profile_html: Option<&Path>,
) -> Result<StaticSite> {
    let locations = Locations::resolve(target, &config.site.detail_suffix)?;
    let mut site = StaticSite::new();

    for (path, location) in [(detail_html, &locations.detail), (profile_html, &locations.profile)] {
        if let Some(path) = path {
            let html = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            site = site.with_page(location, html);
        }
    }

    Ok(site)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _envelope: &ScrapeEnvelope) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
