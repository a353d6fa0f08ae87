use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::executor::Executor;
use crate::xor_shift;

// -----------------------------------------------------------------------------
// Runnable

/// A type-erased unit of work as it sits in a queue.
///
/// Running it executes the submitted closure exactly once. For awaited
/// submissions the closure also publishes its result into the paired
/// [`Task`]; for detached submissions there is nothing to publish and the
/// allocation is freed the moment the closure returns.
pub(crate) type Runnable = Box<dyn FnOnce() + Send>;

// -----------------------------------------------------------------------------
// Completion states

const PENDING: u8 = 0;
const DONE: u8 = 1;

// -----------------------------------------------------------------------------
// Inner

/// Completion record shared between a runnable and its [`Task`] handle.
///
/// The payload write happens-before any observation of `DONE`: the executing
/// thread stores the payload and then release-stores the state, and readers
/// acquire-load the state before touching the payload.
struct Inner<T> {
    state: AtomicU8,
    payload: Mutex<Option<thread::Result<T>>>,
}

impl<T> Inner<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            payload: Mutex::new(None),
        }
    }

    fn complete(&self, result: thread::Result<T>) {
        *self.payload.lock() = Some(result);
        self.state.store(DONE, Ordering::Release);
    }

    fn is_done(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }
}

// -----------------------------------------------------------------------------
// Submission

/// Builds the runnable/handle pair for an awaited submission.
///
/// The caller is responsible for enqueuing the runnable.
pub(crate) fn awaited<T, F>(executor: Arc<Executor>, func: F) -> (Runnable, Task<T>)
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let inner = Arc::new(Inner::new());
    let shared = Arc::clone(&inner);

    let runnable: Runnable = Box::new(move || {
        shared.complete(panic::catch_unwind(AssertUnwindSafe(func)));
    });

    (runnable, Task { inner, executor })
}

/// Builds the runnable for a detached submission.
///
/// No completion record is allocated; a panic in the closure is logged and
/// discarded because no one is left to observe it.
pub(crate) fn detached<F>(func: F) -> Runnable
where
    F: FnOnce() + Send + 'static,
{
    Box::new(move || {
        if panic::catch_unwind(AssertUnwindSafe(func)).is_err() {
            log::error!("detached task panicked; discarding the panic payload");
        }
    })
}

// -----------------------------------------------------------------------------
// Task

/// Handle to a spawned unit of work.
///
/// [`join`] blocks until the closure has run and returns its value. While
/// blocked, the calling thread helps the pool: it steals and executes other
/// pending work instead of sleeping, so progress is guaranteed even when
/// every worker is busy or the joiner *is* a worker.
///
/// `join` takes the handle by value, so a task can be joined at most once.
/// Dropping the handle does not cancel the task — it still runs, its result
/// is discarded.
///
/// [`join`]: Self::join
#[must_use = "dropping a task handle discards its result; call `.join()` to retrieve it \
              or `.detach()` to make the discard explicit"]
pub struct Task<T> {
    inner: Arc<Inner<T>>,
    executor: Arc<Executor>,
}

impl<T> Task<T> {
    /// Blocks until the task completes and returns its value.
    ///
    /// The calling thread helps drain the pool while it waits: each
    /// iteration steals one pending runnable, starting from a random seat,
    /// and executes it. It may briefly block on a queue mutex but never
    /// sleeps waiting for a signal.
    ///
    /// # Panics
    ///
    /// If the task's closure panicked, the panic is resumed here.
    pub fn join(self) -> T {
        while !self.inner.is_done() {
            let home = xor_shift::next_index(self.executor.seat_count());
            match self.executor.steal_pop(home) {
                Some(runnable) => runnable(),
                None => core::hint::spin_loop(),
            }
        }

        let payload = self.inner.payload.lock().take();
        match payload {
            Some(Ok(value)) => value,
            Some(Err(cause)) => panic::resume_unwind(cause),
            None => unreachable!("completed task has no payload"),
        }
    }

    /// Drops the handle, letting the task run in the background.
    ///
    /// Equivalent to dropping the handle, but spells the intent out.
    #[inline]
    pub fn detach(self) {}

    /// Returns `true` if the task has finished executing.
    ///
    /// Unlike [`join`] this never blocks and does not consume the handle.
    ///
    /// [`join`]: Self::join
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.inner.is_done()
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{Task, awaited, detached};
    use crate::executor::Executor;

    /// Runs `f` with the panic hook silenced so expected panics don't spam
    /// the test output.
    fn quiet_unwind<R>(f: impl FnOnce() -> R) -> Result<R, Box<dyn Any + Send>> {
        let prev_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));

        let result = panic::catch_unwind(AssertUnwindSafe(f));

        panic::set_hook(prev_hook);
        result
    }

    #[test]
    fn is_sync_send() {
        fn is_sync<T: Sync>() {}
        is_sync::<Task<()>>();

        fn is_send<T: Send>() {}
        is_send::<Task<()>>();
    }

    #[test]
    fn completes_and_joins() {
        let executor = Arc::new(Executor::new(1));
        let (runnable, task) = awaited(executor, || 41 + 1);

        assert!(!task.is_finished());
        runnable();
        assert!(task.is_finished());
        assert_eq!(task.join(), 42);
    }

    #[test]
    fn join_resumes_task_panic() {
        let executor = Arc::new(Executor::new(1));
        let (runnable, task) = awaited::<(), _>(executor, || panic!("boom"));

        // The runnable itself never unwinds; the panic travels in the payload.
        assert!(quiet_unwind(runnable).is_ok());

        let outcome = quiet_unwind(move || task.join());
        assert!(outcome.is_err());
    }

    #[test]
    fn detached_runs_and_swallows_panic() {
        let hits = Arc::new(AtomicUsize::new(0));

        let counted = Arc::clone(&hits);
        let runnable = detached(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });
        runnable();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let panicky = detached(|| panic!("nobody is listening"));
        assert!(quiet_unwind(panicky).is_ok());
    }
}
