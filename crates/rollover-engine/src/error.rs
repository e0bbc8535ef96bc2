//! Error types for a restart run.

use rollover_cluster::ClusterError;
use rollover_lifecycle::LifecycleError;
use rollover_migrate::MigrateError;

/// Fatal errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum RestartError {
    /// The target or the admin service could not be reached during setup.
    #[error("setup failed: {0}")]
    Setup(#[from] ClusterError),

    /// A shard move exhausted its retry budget.
    #[error("migration failed: {0}")]
    Migration(#[from] MigrateError),

    /// Stopping or starting the node failed.
    #[error("lifecycle failed: {0}")]
    Lifecycle(#[from] LifecycleError),
}
