//! `rollctl` — restart one node of a sharded storage cluster without
//! losing shard availability.
//!
//! # Usage
//!
//! ```text
//! rollctl -s rs4.dc1                        # drain, restart, undrain rs4
//! rollctl -s rs4.dc1:60020 -d 500 -u 5000   # custom pacing
//! rollctl -s rs4.dc1 -o                     # drain and stop, leave it down
//! rollctl -c                                # clear every blacklist entry
//! rollctl --config ./rollctl.toml -s rs4    # explicit config file
//! ```

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use rollover_cluster::clear_all_blacklists;
use rollover_cluster::http::{self, HttpClusterAdmin, HttpNodeConnector, HttpShardReader};
use rollover_engine::{Collaborators, RestartMode, RestartOrchestrator, RestartReport};
use rollover_lifecycle::SshController;
use rollover_types::{NodeAddress, RestartState};
use tracing::info;

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "rollctl",
    version,
    about = "Safely restart one node of a sharded storage cluster"
)]
struct Cli {
    /// Node to restart, as `host[:port]`.
    #[arg(short, long)]
    server: Option<String>,

    /// Clear every blacklisted node and exit.
    #[arg(short, long)]
    clear: bool,

    /// Path to TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the cluster admin service.
    #[arg(long, env = "ROLLOVER_ADMIN_URL")]
    admin_url: Option<String>,

    /// Pause after each shard moved off the node (ms).
    #[arg(short, long = "drain-interval-ms")]
    drain_interval: Option<u64>,

    /// Pause after each shard moved back (ms).
    #[arg(short, long = "undrain-interval-ms")]
    undrain_interval: Option<u64>,

    /// Settle time before stopping the node (ms).
    #[arg(short = 'b', long = "settle-before-ms")]
    settle_before: Option<u64>,

    /// Settle time after the node is back online (ms).
    #[arg(short = 'r', long = "settle-after-ms")]
    settle_after: Option<u64>,

    /// Interval between availability probe reads (ms).
    #[arg(short = 'g', long = "probe-frequency-ms")]
    probe_frequency: Option<u64>,

    /// How long one move may stay unconfirmed (ms).
    #[arg(long = "move-timeout-ms")]
    move_timeout: Option<u64>,

    /// How many times an unconfirmed move is reissued.
    #[arg(long)]
    move_retries: Option<u32>,

    /// Control the node with its daemon script instead of the service manager.
    #[arg(long)]
    daemon_script: bool,

    /// Drain and stop the node, then leave it stopped and blacklisted.
    #[arg(short = 'o', long)]
    drain_and_stop_only: bool,
}

impl Cli {
    /// Fold command-line overrides into the file configuration.
    fn apply_overrides(&self, config: &mut CliConfig) {
        if let Some(url) = &self.admin_url {
            config.admin.url = url.clone();
        }
        if let Some(ms) = self.drain_interval {
            config.restart.drain_interval_ms = Some(ms);
        }
        if let Some(ms) = self.undrain_interval {
            config.restart.undrain_interval_ms = Some(ms);
        }
        if let Some(ms) = self.settle_before {
            config.restart.settle_before_restart_ms = Some(ms);
        }
        if let Some(ms) = self.settle_after {
            config.restart.settle_after_restart_ms = Some(ms);
        }
        if let Some(ms) = self.probe_frequency {
            config.probe.frequency_ms = Some(ms);
        }
        if let Some(ms) = self.move_timeout {
            config.migration.move_timeout_ms = Some(ms);
        }
        if let Some(n) = self.move_retries {
            config.migration.move_retries = Some(n);
        }
        if self.daemon_script {
            config.lifecycle.use_daemon_script = true;
        }
    }
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Nothing to do: show usage and touch nothing.
    if cli.server.is_none() && !cli.clear {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;
    cli.apply_overrides(&mut config);
    telemetry::init(&config.log.level);

    let client = http::client(config.request_timeout()).context("failed to build HTTP client")?;
    let admin = Arc::new(
        HttpClusterAdmin::new(client.clone(), &config.admin.url)
            .context("invalid admin service URL")?,
    );

    if cli.clear {
        return clear_all_blacklists(admin.as_ref())
            .await
            .context("failed to clear blacklists");
    }

    let Some(server) = cli.server.as_deref() else {
        return Ok(());
    };
    let target: NodeAddress = server
        .parse()
        .with_context(|| format!("invalid server address {server:?}"))?;
    let mode = if cli.drain_and_stop_only {
        RestartMode::DrainAndHold
    } else {
        RestartMode::Full
    };

    cmd_restart(&config, client, admin, target, mode).await
}

// -----------------------------------------------------------------------
// rollctl -s <server>
// -----------------------------------------------------------------------

async fn cmd_restart(
    config: &CliConfig,
    client: http::Client,
    admin: Arc<HttpClusterAdmin>,
    target: NodeAddress,
    mode: RestartMode,
) -> Result<()> {
    let restart = config.restart_config();
    info!(
        node = %target,
        ?mode,
        admin = %config.admin.url,
        move_timeout_ms = restart.migration.move_timeout.as_millis() as u64,
        move_retries = restart.migration.move_retries,
        "restart configuration"
    );

    let controller = SshController::new(&config.lifecycle.user, config.control_mechanism())
        .with_ssh_program(&config.lifecycle.ssh_program);
    let reader = HttpShardReader::new(client.clone(), config.gateway_url())
        .context("invalid read gateway URL")?;
    let collaborators = Collaborators {
        admin,
        connector: Arc::new(HttpNodeConnector::new(client)),
        reader: Arc::new(reader),
        controller: Arc::new(controller),
    };

    let report = RestartOrchestrator::new(target, restart, collaborators)
        .with_mode(mode)
        .run()
        .await;
    print_report(&report);

    match (report.failed_stage, &report.error) {
        (Some(stage), Some(e)) => {
            bail!("rolling restart of {} failed during {stage}: {e}", report.target)
        }
        _ => Ok(()),
    }
}

fn print_report(report: &RestartReport) {
    println!("Rolling restart of {}: {}", report.target, report.final_state);
    println!(
        "  drain: {} moved, {} skipped; undrain: {} moved, {} skipped",
        report.drain.moved, report.drain.skipped, report.undrain.moved, report.undrain.skipped,
    );
    if !report.probes.is_empty() {
        println!("Availability ({} shards):", report.probes.len());
        for summary in &report.probes {
            println!("  {summary}");
        }
    }
    if let Some(guidance) = report.guidance() {
        println!("{guidance}");
    }
    let blacklisted = report.failed_stage != Some(RestartState::Setup);
    if report.mode == RestartMode::Full && blacklisted && !report.blacklist_cleared {
        println!("The node may still be blacklisted; run `rollctl -c` to clear it.");
    }
}
