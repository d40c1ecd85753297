//! Outreach-Scout main entry point
//!
//! This is the command-line interface for the Outreach-Scout pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use outreach_scout::config::{load_config, Config, Credentials};
use outreach_scout::output::{load_statistics, print_run_summary, print_statistics};
use outreach_scout::pipeline::{self, Mode};
use outreach_scout::storage::open_store;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Pause before exiting after a failed run, so a supervisor restarting the
/// process does not hammer the platform
const FAILURE_GRACE: Duration = Duration::from_secs(10);

/// Outreach-Scout: keyword-to-inbox outreach with resumable state
///
/// Outreach-Scout searches a social platform for keywords, resolves each
/// matching content item to its owner's handle, screens the candidate and
/// sends a multi-part message. Every outcome is recorded in a state file, so
/// interrupted runs resume without contacting anyone twice.
#[derive(Parser, Debug)]
#[command(name = "outreach-scout")]
#[command(version = "1.0.0")]
#[command(about = "Keyword-to-inbox outreach with resumable state", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Validate config and show what the command would do without opening a browser
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Record candidates for every keyword without sending anything
    Discover,
    /// Discover for every keyword, then message every pending candidate
    DiscoverSend,
    /// Message each candidate as soon as it is discovered
    SearchSend,
    /// Detect replies and send follow-ups to candidates contacted long enough ago
    FollowUp,
    /// Show statistics from the state file and exit
    Stats,
}

impl Command {
    fn mode(self) -> Option<Mode> {
        match self {
            Self::Discover => Some(Mode::Discover),
            Self::DiscoverSend => Some(Mode::DiscoverAndSend),
            Self::SearchSend => Some(Mode::SearchAndSend),
            Self::FollowUp => Some(Mode::FollowUp),
            Self::Stats => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match dispatch(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    // A missing .env file is fine; variables may come from the environment
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Ignoring unreadable .env file: {}", e);
        }
    }

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!(
        "Configuration loaded successfully (message template {})",
        config.messages.fingerprint()
    );

    let Some(mode) = cli.command.mode() else {
        return handle_stats(&config);
    };

    if cli.dry_run {
        handle_dry_run(&config, mode);
        return Ok(());
    }

    handle_run(&config, mode).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("outreach_scout=info,warn"),
            1 => EnvFilter::new("outreach_scout=debug,info"),
            2 => EnvFilter::new("outreach_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: shows the plan without touching the browser or the state file
fn handle_dry_run(config: &Config, mode: Mode) {
    println!("=== Outreach-Scout Dry Run ===\n");

    println!("Platform:");
    println!("  Name: {}", config.platform.name);
    println!("  Base URL: {}", config.platform.base_url);
    println!("  Operator: {}", config.platform.operator_handle);
    println!(
        "  WebDriver: {} ({})",
        config.webdriver.endpoint, config.webdriver.browser_name
    );

    println!("\nSearch ({} keywords):", config.search.keywords.len());
    for keyword in &config.search.keywords {
        println!("  - {}", keyword);
    }
    println!(
        "  Up to {} suggestions per keyword, {} items per suggestion",
        config.search.max_suggestions, config.search.max_items_per_suggestion
    );

    println!("\nMessages:");
    println!("  Parts: {}", config.messages.parts.len());
    println!("  Follow-up parts: {}", config.messages.follow_up.len());
    println!("  Category greetings: {}", config.messages.greetings.len());

    println!("\nPacing:");
    println!("  Between parts: {}ms", config.pacing.pause_between_parts_ms);
    println!(
        "  Between candidates: {}ms",
        config.pacing.pause_between_candidates_ms
    );
    println!("  Max sends per run: {}", config.pacing.max_sends_per_run);

    println!("\nStorage:");
    println!("  State file: {}", config.storage.state_path);
    println!("  Session file: {}", config.storage.session_path);
    println!("  Diagnostics: {}", config.storage.diagnostics_dir);

    match &config.classifier {
        Some(classifier) => println!("\nClassification: {}", classifier.endpoint),
        None => println!("\nClassification: disabled"),
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would run {:?}", mode);
}

/// Handles the stats command: summarises the state file
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("State file: {}\n", config.storage.state_path);

    let store = open_store(Path::new(&config.storage.state_path));
    let stats = load_statistics(&store, chrono::Utc::now(), config.follow_up.window())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles a pipeline run
async fn handle_run(config: &Config, mode: Mode) -> anyhow::Result<()> {
    // Credentials are checked before any browser is started
    let credentials = Credentials::from_env()?;

    tracing::info!(
        "Keywords: {}, send cap: {}",
        config.search.keywords.len(),
        config.pacing.max_sends_per_run
    );

    match pipeline::run(config, &credentials, mode).await {
        Ok(summary) => {
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "Run failed; state has been saved. Exiting in {}s",
                FAILURE_GRACE.as_secs()
            );
            tokio::time::sleep(FAILURE_GRACE).await;
            Err(e.into())
        }
    }
}
