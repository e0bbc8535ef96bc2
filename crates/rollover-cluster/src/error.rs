//! Error types for the cluster collaborators.

use rollover_types::NodeAddress;

/// Errors produced while talking to the admin service or a node.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The node could not be reached.
    #[error("node {node} unreachable: {reason}")]
    Unreachable {
        /// The node that was contacted.
        node: NodeAddress,
        /// What went wrong.
        reason: String,
    },

    /// The admin service refused or failed a request.
    #[error("admin service error: {0}")]
    Admin(String),

    /// A point lookup could not be served.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// An endpoint answered with a non-success HTTP status.
    #[error("{url} returned status {status}")]
    Status {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A configured base URL cannot carry path segments.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    /// HTTP client error (connect, timeout, decode).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
