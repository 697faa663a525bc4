//! Splitter daemon: replays scripted calls against an in-memory ledger.

mod journal;
mod script;

use anyhow::{bail, Context};
use clap::Parser;
use splitter_ledger::{LedgerSnapshot, Splitter, SplitterConfig};
use splitter_types::Address;
use std::path::{Path, PathBuf};

use crate::journal::PaymentJournal;
use crate::script::Script;

#[derive(Parser)]
#[command(name = "splitter-daemon", about = "Split/claim ledger replay tool")]
struct Cli {
    /// Path to a TOML ledger configuration file (`owner`, `max_peers`).
    /// CLI flags and env vars override its values.
    #[arg(long, env = "SPLITTER_CONFIG")]
    config: Option<PathBuf>,

    /// Owner identity (0x-prefixed, 40 hex digits).
    #[arg(long, env = "SPLITTER_OWNER")]
    owner: Option<Address>,

    /// Maximum number of active peers.
    #[arg(long, env = "SPLITTER_MAX_PEERS")]
    max_peers: Option<usize>,

    /// Log level used when RUST_LOG is unset: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "SPLITTER_LOG_LEVEL")]
    log_level: String,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a script of calls and print the resulting ledger as JSON.
    Replay {
        /// TOML script with `[[call]]` entries.
        script: PathBuf,

        /// Start from a previously saved snapshot instead of an empty ledger.
        #[arg(long)]
        snapshot_in: Option<PathBuf>,

        /// Save a snapshot of the final ledger here.
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },
}

/// Merge the optional config file with CLI overrides.
fn load_config(cli: &Cli) -> anyhow::Result<SplitterConfig> {
    let file_config = match cli.config {
        Some(ref path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let cfg = SplitterConfig::from_toml_str(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            Some(cfg)
        }
        None => None,
    };

    let config = match (file_config, cli.owner) {
        (Some(file_cfg), owner) => SplitterConfig {
            owner: owner.unwrap_or(file_cfg.owner),
            max_peers: cli.max_peers.or(file_cfg.max_peers),
        },
        (None, Some(owner)) => {
            let config = SplitterConfig::new(owner);
            match cli.max_peers {
                Some(max) => config.with_max_peers(Some(max)),
                None => config,
            }
        }
        (None, None) => bail!("no owner configured: pass --owner or --config"),
    };
    config.validate()?;
    Ok(config)
}

fn open_ledger(config: SplitterConfig, snapshot_in: Option<&Path>) -> anyhow::Result<Splitter> {
    let Some(path) = snapshot_in else {
        return Ok(Splitter::new(config)?);
    };
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let splitter = Splitter::restore(LedgerSnapshot::from_bytes(&bytes)?)?;
    if splitter.owner() != config.owner {
        tracing::warn!(
            snapshot_owner = %splitter.owner(),
            configured_owner = %config.owner,
            "snapshot owner differs from configuration; keeping snapshot owner"
        );
    }
    let snapshot_cap = splitter.registry().capacity();
    if snapshot_cap != config.max_peers {
        tracing::warn!(
            snapshot_max_peers = ?snapshot_cap,
            configured_max_peers = ?config.max_peers,
            "snapshot peer cap differs from configuration; keeping snapshot cap"
        );
    }
    Ok(splitter)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    splitter_utils::init_tracing(&cli.log_level);

    let config = load_config(&cli)?;

    match cli.command {
        Command::Replay {
            script: ref script_path,
            ref snapshot_in,
            ref snapshot_out,
        } => {
            let contents = std::fs::read_to_string(script_path)
                .with_context(|| format!("failed to read script {}", script_path.display()))?;
            let script = Script::from_toml_str(&contents)
                .with_context(|| format!("failed to parse script {}", script_path.display()))?;

            let mut splitter = open_ledger(config, snapshot_in.as_deref())?;
            let mut journal = PaymentJournal::new(script.refusing.clone());
            tracing::info!(
                "Replaying {} calls (owner {}, {} peers)",
                script.calls.len(),
                splitter.owner(),
                splitter.peer_count()
            );

            let outcomes = script::replay(&mut splitter, &mut journal, &script.calls);
            let failed = outcomes.iter().filter(|o| !o.ok).count();
            tracing::info!("Replay finished: {} ok, {} failed", outcomes.len() - failed, failed);

            if let Some(path) = snapshot_out {
                let bytes = splitter.snapshot().to_bytes()?;
                std::fs::write(path, bytes)
                    .with_context(|| format!("failed to write snapshot {}", path.display()))?;
                tracing::info!("Snapshot written to {}", path.display());
            }

            let report = script::report(&splitter, &journal, outcomes);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
