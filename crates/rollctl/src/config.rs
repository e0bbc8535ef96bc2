//! TOML configuration for `rollctl`.
//!
//! Every field is optional. Without `--config`, the file at
//! `$XDG_CONFIG_HOME/rollover/rollctl.toml` is read if it exists; otherwise
//! the built-in defaults apply. Command-line flags override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rollover_lifecycle::ControlMechanism;
use rollover_types::{MigrationConfig, RestartConfig};
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Admin service and read gateway endpoints.
    pub admin: AdminSection,
    /// Stage pacing and settle times.
    pub restart: RestartSection,
    /// Per-move timeout and retries.
    pub migration: MigrationSection,
    /// Availability probes.
    pub probe: ProbeSection,
    /// Remote stop/start of the node.
    pub lifecycle: LifecycleSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[admin]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AdminSection {
    /// Base URL of the cluster admin service.
    pub url: String,
    /// Base URL of the read gateway. Defaults to the admin URL.
    pub gateway_url: Option<String>,
    /// Per-request HTTP timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for AdminSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:60010".to_string(),
            gateway_url: None,
            request_timeout_ms: 10_000,
        }
    }
}

/// `[restart]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RestartSection {
    pub drain_interval_ms: Option<u64>,
    pub undrain_interval_ms: Option<u64>,
    pub settle_before_restart_ms: Option<u64>,
    pub settle_after_restart_ms: Option<u64>,
    pub liveness_poll_interval_ms: Option<u64>,
    /// Give up on the restarted node after this many seconds.
    pub liveness_timeout_secs: Option<u64>,
}

/// `[migration]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MigrationSection {
    pub move_timeout_ms: Option<u64>,
    pub move_retries: Option<u32>,
    pub poll_interval_ms: Option<u64>,
}

/// `[probe]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProbeSection {
    /// Milliseconds between reads of each probed shard.
    pub frequency_ms: Option<u64>,
}

/// `[lifecycle]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LifecycleSection {
    /// Remote user for `ssh`.
    pub user: String,
    /// The `ssh` binary to run.
    pub ssh_program: String,
    /// Service manager invoked as `<service_ctl> stop|start <service>`.
    pub service_ctl: String,
    /// Daemon script invoked as `<daemon_script> stop|start <service>`.
    pub daemon_script: String,
    /// Name of the storage service on the node.
    pub service: String,
    /// Use the daemon script instead of the service manager.
    pub use_daemon_script: bool,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            user: "hadoop".to_string(),
            ssh_program: "ssh".to_string(),
            service_ctl: "hadoopctl".to_string(),
            daemon_script: "/usr/lib/hbase/bin/hbase-daemon.sh".to_string(),
            service: "regionserver".to_string(),
            use_daemon_script: false,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from `path`, or from the default location if it exists.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) if p.is_file() => p,
                _ => return Ok(Self::default()),
            },
        };
        let content = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Effective read gateway URL.
    pub fn gateway_url(&self) -> &str {
        self.admin.gateway_url.as_deref().unwrap_or(&self.admin.url)
    }

    /// Effective HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.admin.request_timeout_ms)
    }

    /// Timing configuration for the run, defaults filled in.
    pub fn restart_config(&self) -> RestartConfig {
        let defaults = RestartConfig::default();
        let migration_defaults = MigrationConfig::default();
        let restart = &self.restart;
        let migration = &self.migration;

        RestartConfig {
            drain_interval: millis_or(restart.drain_interval_ms, defaults.drain_interval),
            undrain_interval: millis_or(restart.undrain_interval_ms, defaults.undrain_interval),
            settle_before_restart: millis_or(
                restart.settle_before_restart_ms,
                defaults.settle_before_restart,
            ),
            settle_after_restart: millis_or(
                restart.settle_after_restart_ms,
                defaults.settle_after_restart,
            ),
            probe_frequency: millis_or(self.probe.frequency_ms, defaults.probe_frequency),
            liveness_poll_interval: millis_or(
                restart.liveness_poll_interval_ms,
                defaults.liveness_poll_interval,
            ),
            liveness_timeout: restart
                .liveness_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.liveness_timeout),
            migration: MigrationConfig {
                move_timeout: millis_or(migration.move_timeout_ms, migration_defaults.move_timeout),
                move_retries: migration
                    .move_retries
                    .unwrap_or(migration_defaults.move_retries),
                poll_interval: millis_or(
                    migration.poll_interval_ms,
                    migration_defaults.poll_interval,
                ),
            },
        }
    }

    /// How the node's storage process is stopped and started.
    pub fn control_mechanism(&self) -> ControlMechanism {
        let lifecycle = &self.lifecycle;
        if lifecycle.use_daemon_script {
            ControlMechanism::DaemonScript {
                script: lifecycle.daemon_script.clone(),
                daemon: lifecycle.service.clone(),
            }
        } else {
            ControlMechanism::ServiceCtl {
                program: lifecycle.service_ctl.clone(),
                service: lifecycle.service.clone(),
            }
        }
    }
}

/// `$XDG_CONFIG_HOME/rollover/rollctl.toml`, if a config dir is known.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rollover").join("rollctl.toml"))
}

fn millis_or(value: Option<u64>, default: Duration) -> Duration {
    value.map(Duration::from_millis).unwrap_or(default)
}
