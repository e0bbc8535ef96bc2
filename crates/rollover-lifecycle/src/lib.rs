//! Node lifecycle control for rollover.
//!
//! - [`NodeController`] — stop/start a node's storage process.
//! - [`SshController`] — runs the control command on the node over `ssh`.
//! - [`run_checked`] — runs one action and turns a non-zero exit into an error.

mod controller;
mod error;
mod ssh;

pub use controller::{ExitStatus, NodeAction, NodeController, run_checked};
pub use error::LifecycleError;
pub use ssh::{ControlMechanism, SshController};
