//! An ambient, process-wide task pool.
//!
//! This module wraps one [`TaskPool`] in a module-level slot so call sites
//! (deep library layers, callbacks) can submit work without threading a
//! pool value around. The slot is empty until [`init`] fills it and empty
//! again after [`shutdown`]; at most one pool lives in it at a time. Prefer
//! an explicit [`TaskPool`] where ergonomics allow — the contracts are
//! identical and independent pools compose.
//!
//! # Examples
//!
//! ```
//! weft_task::global::init(4).unwrap();
//! assert!(weft_task::global::is_available());
//!
//! let task = weft_task::global::spawn(|| 6 * 7).unwrap();
//! assert_eq!(task.join(), 42);
//!
//! weft_task::global::shutdown();
//! assert!(!weft_task::global::is_available());
//! ```

use parking_lot::Mutex;

use crate::error::{InitError, Unavailable};
use crate::pool::{Spawner, TaskPool, TaskPoolBuilder};
use crate::task::Task;

// -----------------------------------------------------------------------------
// The shared slot

static SHARED: Mutex<Option<TaskPool>> = Mutex::new(None);

// -----------------------------------------------------------------------------
// Lifecycle

/// Starts the ambient pool with `worker_num` workers.
///
/// # Errors
///
/// [`InitError::AlreadyRunning`] when a pool from an earlier `init` has not
/// been shut down yet; [`InitError::Build`] when the pool fails to build
/// (invalid size, thread spawn failure). The slot stays empty on error.
pub fn init(worker_num: usize) -> Result<(), InitError> {
    let mut shared = SHARED.lock();
    if shared.is_some() {
        return Err(InitError::AlreadyRunning);
    }

    let pool = TaskPoolBuilder::new()
        .worker_num(worker_num)
        .thread_name(String::from("weft global"))
        .build()?;
    *shared = Some(pool);
    Ok(())
}

/// Shuts the ambient pool down, draining work enqueued so far.
///
/// Blocks until every worker has exited. A no-op when no pool is running, so
/// calling it twice is harmless. Callers are expected to quiesce submission
/// first; a submission racing this call may be rejected with
/// [`Unavailable`].
pub fn shutdown() {
    // Take the pool out first so the slot is unlocked while workers join;
    // a task calling back into this module must not deadlock.
    let pool = SHARED.lock().take();
    drop(pool);
}

/// Returns `true` while an initialized pool is running.
#[inline]
pub fn is_available() -> bool {
    SHARED.lock().is_some()
}

// -----------------------------------------------------------------------------
// Submission

fn spawner() -> Result<Spawner, Unavailable> {
    SHARED.lock().as_ref().map(TaskPool::spawner).ok_or(Unavailable)
}

/// Spawns a closure onto the ambient pool, returning a handle for its
/// result.
///
/// See [`TaskPool::spawn`].
///
/// # Errors
///
/// [`Unavailable`] when no pool is running.
pub fn spawn<T, F>(func: F) -> Result<Task<T>, Unavailable>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Ok(spawner()?.spawn(func))
}

/// Spawns a closure onto the ambient pool without keeping a handle.
///
/// See [`TaskPool::spawn_detached`].
///
/// # Errors
///
/// [`Unavailable`] when no pool is running.
pub fn spawn_detached<F>(func: F) -> Result<(), Unavailable>
where
    F: FnOnce() + Send + 'static,
{
    spawner()?.spawn_detached(func);
    Ok(())
}

// -----------------------------------------------------------------------------
// Tests
