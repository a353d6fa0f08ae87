use core::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::BuildError;
use crate::executor::{self, Executor};
use crate::task::{self, Task};

// -----------------------------------------------------------------------------
// Config

/// Largest admissible worker count.
pub const MAX_WORKERS: usize = u16::MAX as usize;

// -----------------------------------------------------------------------------
// TaskPoolBuilder

/// Builder for creating a [`TaskPool`].
///
/// Configurable parameters:
///
/// - [`worker_num`]: Number of worker threads, `1..=65535`. Defaults to the
///   number of logical cores on the system.
///
/// - [`thread_name`]: Thread name prefix. If set, threads are named in the
///   format `{thread_name} ({id})`, e.g. `computor (1)`.
///   Default: `weft worker ({id})`.
///
/// - [`stack_size`]: Stack size for worker threads. Default is
///   system-dependent.
///
/// [`worker_num`]: Self::worker_num
/// [`thread_name`]: Self::thread_name
/// [`stack_size`]: Self::stack_size
#[derive(Default)]
#[must_use]
pub struct TaskPoolBuilder {
    /// Number of workers. If `None`, uses the logical core count.
    worker_num: Option<usize>,
    /// Custom stack size.
    stack_size: Option<usize>,
    /// Thread name prefix.
    thread_name: Option<String>,
}

impl TaskPoolBuilder {
    /// Creates a new [`TaskPoolBuilder`].
    #[inline]
    pub const fn new() -> Self {
        Self {
            worker_num: None,
            stack_size: None,
            thread_name: None,
        }
    }

    /// Sets the number of worker threads in the pool.
    ///
    /// If unset, defaults to the system's logical core count. The count is
    /// validated by [`build`](Self::build).
    #[inline]
    pub fn worker_num(mut self, worker_num: usize) -> Self {
        self.worker_num = Some(worker_num);
        self
    }

    /// Overrides the stack size of the threads created for the pool.
    #[inline]
    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Sets the thread name prefix.
    ///
    /// Threads will be named `<thread_name> (<worker_index>)`.
    #[inline]
    pub fn thread_name(mut self, thread_name: String) -> Self {
        self.thread_name = Some(thread_name);
        self
    }

    /// Creates a [`TaskPool`] with the configured options.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidSize`] when the worker count is outside
    /// `1..=65535`; [`BuildError::Spawn`] when the OS refuses to start a
    /// worker thread, in which case every worker that already started has
    /// been shut down again.
    #[inline]
    pub fn build(self) -> Result<TaskPool, BuildError> {
        TaskPool::new_internal(self)
    }
}

// -----------------------------------------------------------------------------
// TaskPool

/// A fixed-size pool of worker threads executing submitted closures.
///
/// Work enters through [`spawn`] (returning a joinable [`Task`]) or
/// [`spawn_detached`] (fire-and-forget). Each submission is appended to one
/// of the per-worker queues, chosen by a bounded non-blocking sweep from a
/// random starting seat, and the owning worker is signalled. Idle workers
/// steal from their neighbours' queues, so load spreads without any central
/// queue.
///
/// Dropping the pool shuts it down: every worker receives one final wakeup
/// with a latched exit flag, finishes the work enqueued so far, and is
/// joined. Work submitted before the drop is guaranteed to run; submitting
/// concurrently with the drop is the caller's race to lose.
///
/// # Examples
///
/// ```
/// use weft_task::TaskPoolBuilder;
///
/// let pool = TaskPoolBuilder::new().worker_num(2).build().unwrap();
///
/// let task = pool.spawn(|| 2 + 2);
/// assert_eq!(task.join(), 4);
/// ```
///
/// [`spawn`]: Self::spawn
/// [`spawn_detached`]: Self::spawn_detached
#[derive(Debug)]
pub struct TaskPool {
    /// Shared scheduling state; also held by every [`Task`] and [`Spawner`].
    executor: Arc<Executor>,
    /// Worker threads, joined on drop.
    threads: Box<[JoinHandle<()>]>,
}

impl TaskPool {
    /// Creates a pool with default configuration.
    ///
    /// The worker count defaults to [`std::thread::available_parallelism`].
    ///
    /// # Errors
    ///
    /// See [`TaskPoolBuilder::build`].
    pub fn new() -> Result<Self, BuildError> {
        TaskPoolBuilder::new().build()
    }

    fn new_internal(builder: TaskPoolBuilder) -> Result<Self, BuildError> {
        let worker_num = builder
            .worker_num
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, usize::from));

        if worker_num == 0 || worker_num > MAX_WORKERS {
            return Err(BuildError::InvalidSize(worker_num));
        }

        let executor = Arc::new(Executor::new(worker_num));

        let mut threads = Vec::with_capacity(worker_num);
        for home in 0..worker_num {
            let thread_name = if let Some(prefix) = builder.thread_name.as_deref() {
                format!("{prefix} ({home})")
            } else {
                format!("weft worker ({home})")
            };

            let mut thread_builder = thread::Builder::new().name(thread_name);
            if let Some(stack_size) = builder.stack_size {
                thread_builder = thread_builder.stack_size(stack_size);
            }

            let shared = Arc::clone(&executor);
            match thread_builder.spawn(move || executor::worker_loop(&shared, home)) {
                Ok(handle) => threads.push(handle),
                Err(cause) => {
                    // Roll back the workers that did start before reporting.
                    executor.signal_death_all();
                    for handle in threads {
                        let _ = handle.join();
                    }
                    return Err(BuildError::Spawn(cause));
                }
            }
        }

        log::debug!("task pool online with {worker_num} workers");

        Ok(Self {
            executor,
            threads: threads.into_boxed_slice(),
        })
    }

    /// Returns the number of worker threads in the pool.
    #[inline]
    pub fn worker_num(&self) -> usize {
        self.threads.len()
    }

    /// Spawns a closure onto the pool, returning a handle for its result.
    ///
    /// The closure runs exactly once, on whichever worker (or helping
    /// joiner) dequeues it first. Submissions from inside a running task
    /// are fine; see [`spawner`] for a handle a task can capture.
    ///
    /// [`spawner`]: Self::spawner
    #[inline]
    pub fn spawn<T, F>(&self, func: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        submit(&self.executor, func)
    }

    /// Spawns a closure onto the pool without keeping a handle.
    ///
    /// The engine owns the task: it runs exactly once and its storage is
    /// released the moment it returns. There is no way to observe its
    /// completion other than its side effects.
    #[inline]
    pub fn spawn_detached<F>(&self, func: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.executor.push(task::detached(func));
    }

    /// Returns a cheap, cloneable submission handle.
    ///
    /// A [`Spawner`] can be captured by tasks so they submit further work to
    /// the pool they run on. It keeps the queues alive but not the workers:
    /// submissions made after the pool is dropped are only ever executed by
    /// a thread joining one of them.
    #[inline]
    pub fn spawner(&self) -> Spawner {
        Spawner {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        log::debug!("task pool shutting down");

        self.executor.signal_death_all();

        let panicking = thread::panicking();
        let threads = mem::replace(&mut self.threads, Box::new([]));
        for handle in threads {
            let res = handle.join();
            if !panicking {
                res.expect("worker thread panicked");
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Spawner

/// A cloneable handle for submitting work to a [`TaskPool`].
///
/// Unlike the pool itself, a `Spawner` is `Clone + Send + 'static`, so tasks
/// can capture one and spawn nested work:
///
/// ```
/// use weft_task::TaskPoolBuilder;
///
/// let pool = TaskPoolBuilder::new().worker_num(1).build().unwrap();
///
/// let spawner = pool.spawner();
/// let outer = pool.spawn(move || spawner.spawn(|| 7).join());
/// assert_eq!(outer.join(), 7);
/// ```
#[derive(Clone)]
pub struct Spawner {
    executor: Arc<Executor>,
}

impl Spawner {
    /// Spawns a closure, returning a handle for its result.
    ///
    /// See [`TaskPool::spawn`].
    #[inline]
    pub fn spawn<T, F>(&self, func: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        submit(&self.executor, func)
    }

    /// Spawns a closure without keeping a handle.
    ///
    /// See [`TaskPool::spawn_detached`].
    #[inline]
    pub fn spawn_detached<F>(&self, func: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.executor.push(task::detached(func));
    }
}

impl core::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.pad("Spawner { .. }")
    }
}

// -----------------------------------------------------------------------------
// Submission

fn submit<T, F>(executor: &Arc<Executor>, func: F) -> Task<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (runnable, task) = task::awaited(Arc::clone(executor), func);
    executor.push(runnable);
    task
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::{MAX_WORKERS, TaskPoolBuilder};
    use crate::error::BuildError;

    #[test]
    fn build_rejects_bad_sizes() {
        assert!(matches!(
            TaskPoolBuilder::new().worker_num(0).build(),
            Err(BuildError::InvalidSize(0))
        ));
        assert!(matches!(
            TaskPoolBuilder::new().worker_num(MAX_WORKERS + 1).build(),
            Err(BuildError::InvalidSize(_))
        ));
    }

    #[test]
    fn spawn_and_join() {
        let pool = TaskPoolBuilder::new().worker_num(4).build().unwrap();
        let task = pool.spawn(|| 42);
        assert_eq!(task.join(), 42);
    }

    #[test]
    fn joins_deliver_matching_results() {
        let pool = TaskPoolBuilder::new().worker_num(8).build().unwrap();

        let tasks: Vec<_> = (0..100_u64).map(|i| pool.spawn(move || i * i)).collect();
        let results: Vec<_> = tasks.into_iter().map(|task| task.join()).collect();

        let expected: Vec<_> = (0..100_u64).map(|i| i * i).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn nested_spawn_on_single_worker() {
        // The single worker must execute the inner tasks from inside the
        // outer join.
        let pool = TaskPoolBuilder::new().worker_num(1).build().unwrap();

        let spawner = pool.spawner();
        let outer = pool.spawn(move || {
            let a = spawner.spawn(|| 3_u32);
            let b = spawner.spawn(|| 4_u32);
            a.join() + b.join()
        });

        assert_eq!(outer.join(), 7);
    }

    #[test]
    fn detached_tasks_drain_on_drop() {
        const COUNT: usize = 1_000;

        let pool = TaskPoolBuilder::new().worker_num(2).build().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..COUNT {
            let counter = Arc::clone(&counter);
            pool.spawn_detached(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        // No spin-wait: shutdown itself must finish the enqueued work.
        drop(pool);
        assert_eq!(counter.load(Ordering::SeqCst), COUNT);
    }

    #[test]
    fn more_joiners_than_workers() {
        let pool = TaskPoolBuilder::new().worker_num(1).build().unwrap();

        thread::scope(|scope| {
            for i in 0..4_u64 {
                let task = pool.spawn(move || i + 100);
                scope.spawn(move || {
                    assert_eq!(task.join(), i + 100);
                });
            }
        });
    }
}
