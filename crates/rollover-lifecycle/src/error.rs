//! Error types for lifecycle control.

use rollover_types::NodeAddress;

use crate::controller::NodeAction;

/// Errors raised while stopping or starting a node.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The control command ran but exited unsuccessfully.
    #[error("{action} of {node} exited with status {}", describe_code(.code))]
    CommandFailed {
        /// Which action was attempted.
        action: NodeAction,
        /// The node being controlled.
        node: NodeAddress,
        /// Exit code, `None` if the process was killed by a signal.
        code: Option<i32>,
    },

    /// The control command could not be launched.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        /// The program that failed to launch.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The node did not report live within the allowed time after start.
    #[error("{node} did not come back online within {waited_secs}s")]
    NotLive {
        /// The restarted node.
        node: NodeAddress,
        /// How long we waited.
        waited_secs: u64,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
