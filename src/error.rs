use std::io;

use thiserror::Error;

/// Errors produced by the crate itself, as opposed to the domain errors
/// carried inside an [`Outcome`](crate::Outcome).
#[derive(Debug, Error)]
pub enum Error {
    /// At least one future handed to [`join`](crate::join) did not succeed.
    #[error("{failed} of {total} joined futures failed")]
    JoinFailed { failed: usize, total: usize },
    /// A host runtime was already installed for this process.
    #[error("a runtime dispatcher is already installed")]
    AlreadyInstalled,
    /// A worker thread of the built-in pool could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}
