//! Restart orchestration for rollover.
//!
//! The [`RestartOrchestrator`] drives one node through
//! `Setup → Drain → RestartingNode → Undrain → Complete`, moving to
//! `Failed` on the first unrecoverable error, and always stops its probes
//! and lifts the node's blacklist entry before returning.
//!
//! - [`Collaborators`] — the cluster-facing handles a run needs.
//! - [`RestartMode`] — full restart, or drain-and-hold.
//! - [`RestartReport`] — final state, failing stage and probe summaries.
//! - [`guidance`] — what an operator should do after a failed stage.

pub mod error;
pub mod orchestrator;
pub mod report;

pub use error::RestartError;
pub use orchestrator::{Collaborators, RestartMode, RestartOrchestrator};
pub use report::{PhaseCounts, RestartReport, guidance};
