use std::io;

use thiserror::Error;

// -----------------------------------------------------------------------------
// BuildError

/// Failure to bring a [`TaskPool`](crate::TaskPool) up.
///
/// Construction is all-or-nothing: on a spawn failure, every worker that
/// already started is told to exit and joined before the error is returned.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The requested worker count is outside `1..=65535`.
    #[error("worker count must be between 1 and 65535, got {0}")]
    InvalidSize(usize),

    /// The operating system refused to start a worker thread.
    #[error("failed to spawn a worker thread")]
    Spawn(#[from] io::Error),
}

// -----------------------------------------------------------------------------
// InitError

/// Failure to initialize the ambient pool in [`global`](crate::global).
#[derive(Debug, Error)]
pub enum InitError {
    /// [`global::init`](crate::global::init) was called while a pool from an
    /// earlier `init` is still running.
    #[error("the shared task pool is already running")]
    AlreadyRunning,

    /// The underlying pool failed to build.
    #[error(transparent)]
    Build(#[from] BuildError),
}

// -----------------------------------------------------------------------------
// Unavailable

/// A submission was made through [`global`](crate::global) while no pool is
/// running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the shared task pool is not running")]
pub struct Unavailable;
