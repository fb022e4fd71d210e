//! diskmap
//!
//! Command line front end: discovers the storage topology of the host,
//! lists it, and drives slot locate indicators.
//!
//! With no subcommand and a piped stdin, `diskmap` runs `mangle`, so that
//! `zpool status | diskmap` annotates device names with enclosure aliases.

use clap::{CommandFactory, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diskmap::listing;
use diskmap::{
    apply_indicator, draw_glyph, Correlator, DiskmapConfig, Error, Glyph, IndicatorReport,
    Inventory, JsonSnapshotStore, ProcessRunner, Result, Sas2IrcuIndicator, ToolRunnerRef,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// diskmap - map disks to controllers, enclosures, slots and pools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "DISKMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Snapshot file (overrides the configuration)
    #[arg(long, env = "DISKMAP_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Per-tool timeout in seconds (overrides the configuration)
    #[arg(long, env = "DISKMAP_TOOL_TIMEOUT")]
    tool_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover controllers, enclosures, disks and pools, then save
    #[command(alias = "refresh")]
    Discover,
    /// Show detected controllers
    Controllers,
    /// Show detected enclosures
    Enclosures,
    /// Show detected disks
    Disks {
        /// Full records
        #[arg(short, long)]
        verbose: bool,
    },
    /// Turn locate indicators on (`all`, an enclosure, or a disk)
    Ledon { target: String },
    /// Turn locate indicators off (`all`, an enclosure, or a disk)
    Ledoff { target: String },
    /// Draw a letter on a 4x6 enclosure with locate indicators
    Drawletter { glyph: String, enclosure: String },
    /// List aliases, name an enclosure, or remove an alias with -r
    Alias {
        /// Remove the alias given by name or enclosure
        #[arg(short = 'r', long = "remove", value_name = "NAME|ENCLOSURE")]
        remove: Option<String>,
        enclosure: Option<String>,
        name: Option<String>,
    },
    /// Annotate device names read from stdin with enclosure aliases
    Mangle,
    /// Save the inventory to a file (default: the snapshot file)
    Save { path: Option<PathBuf> },
    /// Load the inventory from a file and make it the current snapshot
    Load { path: Option<PathBuf> },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    let config = load_config(&args)?;
    let command = match args.command {
        Some(command) => command,
        None if !std::io::stdin().is_terminal() => Command::Mangle,
        None => {
            Args::command().print_help()?;
            return Ok(());
        }
    };

    info!(version = diskmap::VERSION, snapshot = %config.snapshot_path.display(), "starting");

    let runner: ToolRunnerRef = Arc::new(ProcessRunner::new(config.tool_timeout()));
    let store = Arc::new(JsonSnapshotStore::new(config.snapshot_path.clone()));
    let correlator = Correlator::new(runner.clone(), config.clone());

    let mut inventory = if matches!(command, Command::Discover) {
        let mut inventory = Inventory::new(correlator, store);
        // keep aliases from the previous snapshot
        if let Err(e) = inventory.reload() {
            warn!(error = %e, "no previous snapshot");
        }
        inventory
    } else {
        Inventory::open(correlator, store).await?
    };
    let indicator = Sas2IrcuIndicator::new(runner, config.tools.sas2ircu.clone());

    match command {
        Command::Discover => {
            let report = inventory.discover().await?;
            println!(
                "Controllers : {}   Enclosures : {}   Disks : {}   Mapped : {}",
                report.controllers, report.enclosures, report.disks, report.mapped
            );
            for warning in &report.warnings {
                eprintln!("warning: {}", warning);
            }
        }
        Command::Controllers => {
            let controllers: Vec<_> = inventory.topology().controllers().collect();
            println!("{}", serde_json::to_string_pretty(&controllers)?);
        }
        Command::Enclosures => {
            for enclosure in inventory.topology().enclosures() {
                let alias = inventory.aliases().alias_for(&enclosure.id).unwrap_or("-");
                println!(
                    "{:<5}  {:<24}  {:>3} slots  {}",
                    enclosure.address(),
                    enclosure.id,
                    enclosure.slot_count,
                    alias
                );
            }
        }
        Command::Disks { verbose } => {
            if verbose {
                let disks = listing::sorted_disks(inventory.topology());
                println!("{}", serde_json::to_string_pretty(&disks)?);
            } else {
                for line in listing::disk_listing(inventory.topology(), &config.device_dir) {
                    println!("{}", line);
                }
            }
        }
        Command::Ledon { target } => set_leds(&inventory, &indicator, &target, true).await?,
        Command::Ledoff { target } => set_leds(&inventory, &indicator, &target, false).await?,
        Command::Drawletter { glyph, enclosure } => {
            let glyph: Glyph = glyph.parse()?;
            let resolver = inventory.resolver();
            let all = resolver
                .enclosure_disks(&enclosure)
                .ok_or_else(|| Error::EnclosureNotFound {
                    token: enclosure.clone(),
                })?;
            let lit = resolver.resolve_glyph(glyph, &enclosure)?;
            let cancel = cancel_on_interrupt();
            let report = draw_glyph(&indicator, &all, &lit, Some(&cancel)).await;
            finish_indicator(report)?;
        }
        Command::Alias {
            remove: Some(token),
            ..
        } => {
            let (alias, enclosure) = inventory.remove_alias(&token)?;
            println!("removed {} -> {}", alias, enclosure);
        }
        Command::Alias {
            enclosure: Some(enclosure),
            name: Some(name),
            ..
        } => {
            let target = inventory.set_alias(&enclosure, &name)?;
            println!("{} -> {}", name.trim(), target.id);
        }
        Command::Alias {
            enclosure: Some(_),
            name: None,
            ..
        } => {
            return Err(Error::Configuration(
                "usage: alias <enclosure> <name> | alias -r <name|enclosure>".to_string(),
            ));
        }
        Command::Alias { .. } => {
            for (alias, enclosure) in inventory.aliases().iter() {
                println!("{:<16}  {}", alias, enclosure);
            }
        }
        Command::Mangle => mangle(&inventory).await?,
        Command::Save { path } => {
            let path = path.unwrap_or_else(|| config.snapshot_path.clone());
            inventory.save_to(&path)?;
            println!("saved to {}", path.display());
        }
        Command::Load { path } => {
            let path = path.unwrap_or_else(|| config.snapshot_path.clone());
            inventory.load_from(&path)?;
            inventory.save()?;
            println!(
                "loaded {} disks from {}",
                inventory.topology().disk_count(),
                path.display()
            );
        }
    }

    Ok(())
}

// =============================================================================
// Configuration
// =============================================================================

fn load_config(args: &Args) -> Result<DiskmapConfig> {
    let mut config = match &args.config {
        Some(path) => DiskmapConfig::from_file(path)?,
        None => DiskmapConfig::default(),
    };
    if let Some(snapshot) = &args.snapshot {
        config.snapshot_path = snapshot.clone();
    }
    if let Some(secs) = args.tool_timeout {
        config.tool_timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries command output
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

// =============================================================================
// Indicators
// =============================================================================

fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current slot");
            child.cancel();
        }
    });
    token
}

async fn set_leds(
    inventory: &Inventory,
    indicator: &Sas2IrcuIndicator,
    target: &str,
    on: bool,
) -> Result<()> {
    let disks = inventory.resolver().resolve_targets(target);
    if disks.is_empty() {
        return Err(Error::NoMatch {
            token: target.to_string(),
        });
    }
    let cancel = cancel_on_interrupt();
    let report = apply_indicator(indicator, &disks, on, Some(&cancel)).await;
    println!(
        "Turning leds {} : {}/{}",
        if on { "on" } else { "off" },
        report.applied.len(),
        disks.len()
    );
    finish_indicator(report)
}

fn finish_indicator(report: IndicatorReport) -> Result<()> {
    for failure in &report.failed {
        eprintln!("{} ({}): {}", failure.address, failure.serial, failure.reason);
    }
    if report.cancelled {
        return Err(Error::Cancelled);
    }
    match report.failed.into_iter().next() {
        Some(first) => Err(Error::IndicatorFailed {
            controller: first.address.controller,
            enclosure_index: first.address.enclosure_index,
            slot: first.address.slot,
            reason: first.reason,
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Mangle
// =============================================================================

async fn mangle(inventory: &Inventory) -> Result<()> {
    let rules = inventory.mangle_rules();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        println!("{}", Inventory::mangle_line(&rules, &line));
    }
    Ok(())
}
