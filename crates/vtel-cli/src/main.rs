//! `vtel` – vehicle telemetry command line interface.
//!
//! | Command | Effect |
//! |---|---|
//! | `vtel replay <FEED>` | Replay a JSON-lines sample feed through the full ingestion stack. |
//! | `vtel check-config` | Load, override and validate the configuration, then print it. |
//! | `vtel init-config` | Write a default `~/.vtel/config.toml`. |
//!
//! `--config <PATH>` points any command at another config file.  Ctrl-C
//! during a replay stops it after the current sample and tears the vehicle
//! connection down cleanly.

mod config;
mod replay;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::warn;

use vtel_hal::SimVehicleClient;
use vtel_kernel::Validator;
use vtel_middleware::{BusSubscriber, DiagnosticSink, Dispatcher, ReadingBus, TracingSink};
use vtel_runtime::{IngestionPipeline, LifecycleManager};
use vtel_types::Topic;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "vtel", version, about = "Vehicle telemetry fan-out engine")]
struct Cli {
    /// Config file (default: ~/.vtel/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded JSON-lines feed.
    Replay {
        feed: PathBuf,

        /// Delay between samples in milliseconds (overrides the config).
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Do not print each delivered reading.
        #[arg(long)]
        quiet: bool,
    },
    /// Validate and print the effective configuration.
    CheckConfig,
    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let _guard = vtel_runtime::telemetry::init_tracing("vtel");
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config::config_path);

    match cli.command {
        Command::Replay {
            feed,
            interval_ms,
            quiet,
        } => {
            let cfg = config::load_or_default(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            let interval = Duration::from_millis(interval_ms.unwrap_or(cfg.replay.interval_ms));
            run_replay(&cfg, &feed, interval, quiet)
        }
        Command::CheckConfig => {
            let cfg = config::load_or_default(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            println!("{} {}", "✓".green().bold(), path.display().to_string().bold());
            print!("{}", toml::to_string_pretty(&cfg)?);
            Ok(())
        }
        Command::InitConfig { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config::save_to(&Config::default(), &path)?;
            println!("{} wrote {}", "✓".green().bold(), path.display().to_string().bold());
            Ok(())
        }
    }
}

fn run_replay(cfg: &Config, feed: &std::path::Path, interval: Duration, quiet: bool) -> Result<()> {
    let events = replay::load_feed(feed)?;
    println!(
        "  Replaying {} sample(s) from {}",
        events.len(),
        feed.display().to_string().bold()
    );

    // ── Composition root ──────────────────────────────────────────────────
    let dispatcher = Arc::new(Dispatcher::new());
    if !quiet {
        dispatcher.register(Arc::new(replay::ConsoleSubscriber));
    }
    let bus = ReadingBus::new(cfg.replay.bus_capacity);
    let speed_rx = bus.subscribe_topic(Topic::Speed);
    dispatcher.register(Arc::new(BusSubscriber::new(bus)));

    let sink: Arc<dyn DiagnosticSink> = match cfg.diagnostics_limit() {
        Some(limit) => Arc::new(TracingSink::rate_limited(limit)),
        None => Arc::new(TracingSink::new()),
    };
    let pipeline = Arc::new(IngestionPipeline::with_validator(
        Validator::new(cfg.validation.max_speed_kmh),
        dispatcher.clone(),
        sink,
    ));
    let client = Arc::new(SimVehicleClient::builder().build());
    let manager = LifecycleManager::new(client.clone(), pipeline.clone());

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping replay …".yellow().bold());
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; replay cannot be interrupted cleanly");
    }

    let runtime = tokio::runtime::Runtime::new().context("starting Tokio runtime")?;
    let (progress, speed) = runtime.block_on(async {
        let tracker = tokio::spawn(replay::track_speed(speed_rx));

        if !manager.initialize_sdk() {
            bail!("vehicle SDK initialisation failed");
        }
        if !manager.connect_vehicle() {
            manager.deinitialize_sdk();
            bail!("vehicle connection failed");
        }

        let progress = replay::replay_feed(&client, &events, interval, &shutdown).await;

        manager.disconnect_vehicle();
        manager.deinitialize_sdk();
        // Dropping the bus subscriber closes the channel and ends the tracker.
        dispatcher.clear();
        let speed = tracker.await.context("speed tracker task")?;
        Ok::<_, anyhow::Error>((progress, speed))
    })?;

    let stats = pipeline.stats();
    println!();
    println!("{}", "  Replay summary".bold().cyan());
    println!("    emitted   {}", progress.emitted);
    if progress.dropped > 0 {
        println!("    dropped   {}", progress.dropped.to_string().yellow());
    }
    println!("    accepted  {}", stats.accepted.to_string().green());
    println!("    rejected  {}", stats.rejected.to_string().red());
    println!("    ignored   {}", stats.ignored);
    if speed.samples > 0 {
        println!(
            "    speed     min {:.1} / mean {:.1} / max {:.1} km/h",
            speed.min_kmh, speed.mean_kmh, speed.max_kmh
        );
    }
    println!("    state     {}", manager.state());
    if progress.interrupted {
        println!("{}", "  Replay interrupted.".yellow());
    }
    Ok(())
}
