//! A work-stealing task execution engine over a fixed pool of OS threads.
//!
//! Work is submitted as a closure. [`TaskPool::spawn`] returns a [`Task`]
//! handle whose [`join`] blocks until the closure has run and yields its
//! return value; [`TaskPool::spawn_detached`] fires and forgets. A thread
//! blocked in [`join`] does not sleep — it steals and executes other pending
//! work until its own task completes, so nested submissions and more joiners
//! than workers always make progress.
//!
//! Pools are ordinary values (see [`TaskPool`] and [`TaskPoolBuilder`]);
//! dropping a pool drains the work enqueued so far and joins every worker.
//! For call sites that want an ambient, process-wide pool instead, the
//! [`global`] module exposes the same engine behind `init` / `shutdown` /
//! `spawn` free functions.
//!
//! [`join`]: Task::join

// -----------------------------------------------------------------------------
// Modules

mod error;
mod executor;
mod pool;
mod task;
mod xor_shift;

pub mod global;

// -----------------------------------------------------------------------------
// Exports

pub use error::{BuildError, InitError, Unavailable};
pub use pool::{MAX_WORKERS, Spawner, TaskPool, TaskPoolBuilder};
pub use task::Task;
