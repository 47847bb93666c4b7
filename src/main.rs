//! intelcache: refresh the community-intel cache for a skill.
//!
//! Usage:
//!   intelcache                         → refresh if due, print one status line
//!   intelcache --cache-dir ./cache     → same, explicit cache location
//!   intelcache reset                   → delete the cached artifact and metadata
//!   intelcache init-config             → print the default config

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use intelcache::config::{resolve_cache_dir, RefreshConfig};
use intelcache::logging::init_tracing;
use intelcache::refresh::reset::reset_cache;
use intelcache::refresh::{
    run_prepared, CachePaths, CommandProvider, ProviderCommand, RefreshCycle,
};

#[derive(Parser)]
#[command(
    name = "intelcache",
    about = "Periodic community-research cache refresher",
    version = env!("CARGO_PKG_VERSION"),
    long_about = "intelcache keeps a rendered research digest fresh on disk.\n\
                   Default: refresh the cache if it is due and print one JSON status line.\n\
                   Exits 0 unless --strict is given and the run failed."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Cache directory (or set INTELCACHE_DIR, or CLAUDE_PLUGIN_ROOT)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Path to config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Topic to research; repeat to override the configured topic set
    #[arg(long = "topic")]
    topics: Vec<String>,

    /// Per-query timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Exit non-zero when the run ends failed or no_cache
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the cache if it is due (default)
    Refresh,
    /// Delete the cached artifact and metadata
    Reset,
    /// Print the default config as TOML
    InitConfig {
        /// Save to the config path instead of printing
        #[arg(long, default_value_t = false)]
        write: bool,
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref(), cli.json_logs);

    let config_path = cli.config.clone().or_else(RefreshConfig::default_path);

    let result = match &cli.command {
        None | Some(Commands::Refresh) => return refresh(&cli, config_path.as_deref()).await,
        Some(Commands::Reset) => reset(&cli, config_path.as_deref()),
        Some(Commands::InitConfig { write, force }) => {
            init_config(config_path.as_deref(), *write, *force)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> RefreshConfig {
    path.map(RefreshConfig::load).unwrap_or_default()
}

async fn refresh(cli: &Cli, config_path: Option<&Path>) -> ExitCode {
    let mut config = load_config(config_path);
    if !cli.topics.is_empty() {
        config.topics = cli.topics.clone();
    }
    if let Some(ms) = cli.timeout_ms {
        config.schedule.query_timeout_ms = ms;
    }
    let strict = cli.strict || config.strict_exit;

    let provider = CommandProvider::new(
        ProviderCommand::from_config(&config.provider),
        config.schedule.query_timeout(),
    );
    let prepared = RefreshCycle::prepare(&config, cli.cache_dir.as_deref());
    let report = run_prepared(prepared, &provider, Utc::now()).await;
    report.emit();

    ExitCode::from(report.exit_code(strict))
}

fn reset(cli: &Cli, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path);
    let dir = resolve_cache_dir(cli.cache_dir.as_deref(), &config.cache.skill)?;
    let paths = CachePaths::new(dir, &config.cache);
    for entry in reset_cache(&paths)? {
        println!("{entry}");
    }
    println!("cache reset complete");
    Ok(())
}

fn init_config(path: Option<&Path>, write: bool, force: bool) -> anyhow::Result<()> {
    let toml = RefreshConfig::default().to_toml();
    if !write {
        print!("{toml}");
        return Ok(());
    }
    let path = path.context("no config path given and no config directory on this system")?;
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, toml)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
