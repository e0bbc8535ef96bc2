//! The lifecycle controller contract.

use std::fmt;

use async_trait::async_trait;
use rollover_types::NodeAddress;
use tracing::{error, info};

use crate::error::LifecycleError;

/// An action on a node's storage process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    /// Shut the process down.
    Stop,
    /// Bring the process up.
    Start,
}

impl NodeAction {
    /// The verb passed to the control command.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
        }
    }
}

impl fmt::Display for NodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Completion status of a control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, `None` if terminated by a signal.
    pub code: Option<i32>,
}

impl ExitStatus {
    /// A status with the given exit code.
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Whether the command exited with code 0.
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Stops and starts the storage process on a node.
#[async_trait]
pub trait NodeController: Send + Sync {
    /// Stop the storage process on `node`.
    async fn stop(&self, node: &NodeAddress) -> Result<ExitStatus, LifecycleError>;

    /// Start the storage process on `node`.
    async fn start(&self, node: &NodeAddress) -> Result<ExitStatus, LifecycleError>;
}

/// Run `action` on `node`, treating a non-zero exit as fatal.
pub async fn run_checked(
    controller: &dyn NodeController,
    action: NodeAction,
    node: &NodeAddress,
) -> Result<(), LifecycleError> {
    let status = match action {
        NodeAction::Stop => controller.stop(node).await?,
        NodeAction::Start => controller.start(node).await?,
    };

    info!(%node, %action, code = ?status.code, "lifecycle command finished");

    if !status.success() {
        error!(%node, %action, "lifecycle command failed, aborting");
        return Err(LifecycleError::CommandFailed {
            action,
            node: node.clone(),
            code: status.code,
        });
    }
    Ok(())
}
