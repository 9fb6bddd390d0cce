//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use coalwire_core::{CycleDeps, CycleKind, CycleReport, run_cycle};
use coalwire_discovery::SearchClient;
use coalwire_publish::{ChannelClient, DocStoreClient, Orchestrator};
use coalwire_reconcile::{ReconcileOptions, SitePublisher, reconcile};
use coalwire_shared::{
    AppConfig, credential, expand_path, init_config, load_config, validate_credentials,
};
use coalwire_storage::{Store, import_legacy_db, import_legacy_state};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Coalwire — coal-market news discovery and publication.
#[derive(Parser)]
#[command(
    name = "coalwire",
    version,
    about = "Discover, select, and publish coal-market news to channel and web.",
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
    /// Run publication cycles.
    Run {
        /// Run a single cycle and exit.
        #[arg(long)]
        once: bool,

        /// Seconds between cycles when looping.
        #[arg(long, default_value = "3600")]
        interval: u64,
    },

    /// Rebuild the static site from the document store.
    Reconcile {
        /// Trailing window in days (defaults to the configured window).
        #[arg(long, conflicts_with = "all")]
        days: Option<u32>,

        /// Rebuild the full corpus instead of a trailing window.
        #[arg(long)]
        all: bool,

        /// Site repo checkout to write into (defaults to the configured path).
        #[arg(long)]
        out: Option<String>,

        /// Commit and push the site repo after writing.
        #[arg(long)]
        push: bool,
    },

    /// Import publication history from the legacy bot.
    ImportLegacy {
        /// Legacy state.json file.
        #[arg(long)]
        state_json: Option<PathBuf>,

        /// Legacy SQLite database.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Show publication ledger statistics.
    Stats,

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
        0 => "coalwire=info",
        1 => "coalwire=debug",
        _ => "coalwire=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { once, interval } => cmd_run(once, interval).await,
        Command::Reconcile {
            days,
            all,
            out,
            push,
        } => cmd_reconcile(days, all, out.as_deref(), push).await,
        Command::ImportLegacy { state_json, db } => {
            cmd_import_legacy(state_json.as_deref(), db.as_deref()).await
        }
        Command::Stats => cmd_stats().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// Build one cycle's dependency set from config. Fresh per cycle so a
/// long-running loop never holds stale clients.
async fn build_deps(config: &AppConfig) -> Result<CycleDeps> {
    validate_credentials(config)?;

    let store = Store::open(&expand_path(&config.storage.db_path)).await?;

    let search_key = credential(&config.search.api_key_env)?;
    let source = SearchClient::new(&config.search, search_key.clone())?;
    let generator = SearchClient::new(&config.search, search_key)?;

    let channel = ChannelClient::new(&config.channel, credential(&config.channel.bot_token_env)?)?;
    let docstore = DocStoreClient::new(&config.docstore, credential(&config.docstore.token_env)?)?;
    let orchestrator = Orchestrator::new(channel, docstore, config.scoring.clone())?;

    Ok(CycleDeps {
        config: config.clone(),
        store,
        source: Box::new(source),
        generator: Box::new(generator),
        orchestrator,
    })
}

fn print_cycle_report(report: &CycleReport) {
    let kind = match report.kind {
        CycleKind::News => "news",
        CycleKind::Filler => "filler",
    };
    println!();
    println!("  Cycle finished.");
    println!("  Kind:      {kind}");
    if let Some(title) = &report.title {
        println!("  Item:      {title}");
    }
    println!(
        "  Published: {}",
        if report.published() { "yes" } else { "no" }
    );
    println!("  Detail:    {}", report.detail);
    println!();
}

async fn cmd_run(once: bool, interval: u64) -> Result<()> {
    let config = load_config()?;

    loop {
        let result: Result<CycleReport> = async {
            let deps = build_deps(&config).await?;
            Ok(run_cycle(&deps).await?)
        }
        .await;

        match result {
            Ok(report) => print_cycle_report(&report),
            Err(e) if once => return Err(e),
            Err(e) => warn!(error = %e, "cycle failed"),
        }

        if once {
            return Ok(());
        }
        info!(interval_secs = interval, "sleeping until next cycle");
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }
}

async fn cmd_reconcile(days: Option<u32>, all: bool, out: Option<&str>, push: bool) -> Result<()> {
    let config = load_config()?;
    let token = credential(&config.docstore.token_env)?;
    let docstore = DocStoreClient::new(&config.docstore, token)?;

    let window_days = if all {
        None
    } else {
        Some(days.unwrap_or(u32::try_from(config.site.window_days.max(0)).unwrap_or(30)))
    };
    let options = ReconcileOptions {
        window_days,
        base_url: config.site.base_url.trim_end_matches('/').to_string(),
        out_dir: config.site.out_dir.clone(),
    };

    let files = reconcile(&docstore, &options).await?;
    let article_count = files.len().saturating_sub(3);

    let repo = match out {
        Some(p) => PathBuf::from(p),
        None => expand_path(&config.site.repo_path),
    };
    let publisher = SitePublisher::new(&repo);
    publisher.write_files(&files)?;

    if push {
        publisher.commit_and_push(&format!("Update site: {article_count} articles"))?;
    }

    println!();
    println!("  Site reconciled.");
    println!("  Articles:  {article_count}");
    println!("  Files:     {}", files.len());
    println!("  Repo:      {}", repo.display());
    println!("  Pushed:    {}", if push { "yes" } else { "no" });
    println!();
    Ok(())
}

async fn cmd_import_legacy(state_json: Option<&std::path::Path>, db: Option<&std::path::Path>) -> Result<()> {
    if state_json.is_none() && db.is_none() {
        return Err(eyre!("nothing to import: pass --state-json and/or --db"));
    }

    let config = load_config()?;
    let store = Store::open(&expand_path(&config.storage.db_path)).await?;

    let mut total = 0;
    if let Some(path) = state_json {
        let imported = import_legacy_state(&store, path).await?;
        println!("  Imported {imported} records from {}", path.display());
        total += imported;
    }
    if let Some(path) = db {
        let imported = import_legacy_db(&store, path).await?;
        println!("  Imported {imported} records from {}", path.display());
        total += imported;
    }
    println!("  Total imported: {total}");
    Ok(())
}

async fn cmd_stats() -> Result<()> {
    let config = load_config()?;
    let store = Store::open_readonly(&expand_path(&config.storage.db_path)).await?;

    let stats = store.publication_stats().await?;
    let cadence = store.load_cadence().await?;

    println!();
    println!("  Publication ledger");
    println!("  Total:     {}", stats.total);
    println!("  Channel:   {}", stats.channel_delivered);
    println!("  DocStore:  {}", stats.docstore_delivered);
    println!();
    println!("  By category:");
    for (category, count) in &stats.by_category {
        println!("    {category:<10} {count}");
    }
    println!();
    println!("  Cadence");
    println!("  Post count:     {}", cadence.post_count);
    println!("  Filler topics:  {}", cadence.freight_topics.len());
    println!();
    Ok(())
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
