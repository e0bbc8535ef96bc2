//! Lifecycle control by running a command on the node over `ssh`.

use async_trait::async_trait;
use rollover_types::NodeAddress;
use tokio::process::Command;
use tracing::info;

use crate::controller::{ExitStatus, NodeAction, NodeController};
use crate::error::LifecycleError;

/// How the storage process is controlled on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMechanism {
    /// A service manager, invoked as `<program> <verb> <service>`.
    ServiceCtl {
        /// Service manager binary, e.g. `systemctl`.
        program: String,
        /// Unit or service name.
        service: String,
    },
    /// The storage distribution's daemon script, invoked as
    /// `<script> <verb> <daemon>`.
    DaemonScript {
        /// Absolute path of the script on the node.
        script: String,
        /// Daemon name passed to the script.
        daemon: String,
    },
}

impl ControlMechanism {
    /// The shell command executed on the node for `action`.
    pub fn remote_command(&self, action: NodeAction) -> String {
        match self {
            Self::ServiceCtl { program, service } => {
                format!("{program} {} {service}", action.verb())
            }
            Self::DaemonScript { script, daemon } => {
                format!("{script} {} {daemon}", action.verb())
            }
        }
    }
}

/// [`NodeController`] that runs the control command through `ssh`.
#[derive(Debug, Clone)]
pub struct SshController {
    ssh_program: String,
    user: String,
    mechanism: ControlMechanism,
}

impl SshController {
    /// Control nodes as `user` with the given mechanism.
    pub fn new(user: impl Into<String>, mechanism: ControlMechanism) -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            user: user.into(),
            mechanism,
        }
    }

    /// Use a different `ssh` binary (or wrapper).
    pub fn with_ssh_program(mut self, program: impl Into<String>) -> Self {
        self.ssh_program = program.into();
        self
    }

    /// Arguments passed to the ssh program for `action` on `node`.
    pub fn ssh_args(&self, action: NodeAction, node: &NodeAddress) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            format!("{}@{}", self.user, node.host),
            self.mechanism.remote_command(action),
        ]
    }

    async fn run(&self, action: NodeAction, node: &NodeAddress) -> Result<ExitStatus, LifecycleError> {
        let args = self.ssh_args(action, node);
        info!(%node, %action, command = %args.join(" "), "executing lifecycle command");

        let status = Command::new(&self.ssh_program)
            .args(&args)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| LifecycleError::Spawn {
                command: self.ssh_program.clone(),
                source,
            })?;

        Ok(status.into())
    }
}

#[async_trait]
impl NodeController for SshController {
    async fn stop(&self, node: &NodeAddress) -> Result<ExitStatus, LifecycleError> {
        self.run(NodeAction::Stop, node).await
    }

    async fn start(&self, node: &NodeAddress) -> Result<ExitStatus, LifecycleError> {
        self.run(NodeAction::Start, node).await
    }
}
