//! netstat command - TCP state and UDP socket counts.
//!
//! Periodically reads the host's socket tables and prints one record per
//! cycle with host-wide counts, and optionally one record per remote
//! endpoint, in line protocol or JSON.

mod output;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use netstat::{Collector, Config, DESCRIPTION, ProcNetSource, SAMPLE_CONFIG};
use tokio::time::MissedTickBehavior;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "netstat", version, about = "TCP state and UDP socket counts")]
struct Cli {
    /// Read configuration from this TOML file.
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Don't emit host-wide totals.
    #[arg(long)]
    no_total: bool,

    /// Emit one record per remote address.
    #[arg(short = 'r', long)]
    per_remote: bool,

    /// Only count connections to this remote (repeatable).
    #[arg(long = "remote", value_name = "ADDR:PORT")]
    remotes: Vec<String>,

    /// Directory holding the tcp, tcp6, udp and udp6 tables.
    #[arg(long, value_name = "DIR", default_value = ProcNetSource::DEFAULT_ROOT)]
    proc_root: PathBuf,

    /// Seconds between collection cycles.
    #[arg(
        short = 'i',
        long,
        value_name = "SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval: u64,

    /// Run a single collection cycle and exit.
    #[arg(long)]
    once: bool,

    /// Output format.
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print the sample configuration and exit.
    #[arg(long)]
    sample_config: bool,

    /// Log at debug level.
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if cli.sample_config {
        println!("# {}", DESCRIPTION);
        print!("{}", SAMPLE_CONFIG);
        return Ok(());
    }

    let config = build_config(&cli)?;
    if config.is_noop() {
        tracing::warn!("total and per-remote emission are both disabled, nothing will be reported");
    }

    let collector = Arc::new(Collector::new(
        ProcNetSource::with_root(&cli.proc_root),
        config,
    ));

    if cli.once {
        run_cycle(collector, cli.format).await?;
        return Ok(());
    }

    run_loop(collector, cli.format, Duration::from_secs(cli.interval)).await;
    Ok(())
}

/// Merge the config file (if any) with command-line overrides.
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };

    if cli.no_total {
        config.emit_total = false;
    }
    if cli.per_remote {
        config.emit_per_remote = true;
    }
    if !cli.remotes.is_empty() {
        config.remote_allow_list = Some(cli.remotes.clone());
        config.validate()?;
    }

    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

/// Run collection cycles until interrupted.
///
/// A failed cycle is logged and the next one runs on schedule.
async fn run_loop(
    collector: Arc<Collector<ProcNetSource>>,
    format: OutputFormat,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("interrupted, stopping collection");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(Arc::clone(&collector), format).await {
                    tracing::error!("collection cycle failed: {:#}", e);
                }
            }
        }
    }
}

/// Run one cycle on the blocking pool and write its records to stdout.
async fn run_cycle(
    collector: Arc<Collector<ProcNetSource>>,
    format: OutputFormat,
) -> anyhow::Result<usize> {
    let emitted = tokio::task::spawn_blocking(move || {
        let mut sink = output::sink(format, std::io::stdout().lock());
        collector.gather(&mut sink)
    })
    .await
    .context("collection task panicked")??;

    tracing::debug!(records = emitted, "collection cycle complete");
    Ok(emitted)
}
