use core::fmt;

use crossbeam_utils::CachePadded;
use weft_sync::{LockQueue, WakeCounter};

use crate::task::Runnable;
use crate::xor_shift;

// -----------------------------------------------------------------------------
// Config

/// Non-blocking passes over the full seat array before a push or pop falls
/// back to its blocking variant.
///
/// The sweep length scales with the seat count, so wider pools absorb more
/// contention misses before anyone is made to wait on a lock.
const SWEEP_ROUNDS: usize = 4;

// -----------------------------------------------------------------------------
// Seat

/// One worker's position in the pool: its queue and its wake counter.
///
/// Submissions that land in a seat's queue signal the same seat's counter,
/// so the matching worker wakes at least once per runnable it was handed.
struct Seat {
    queue: LockQueue<Runnable>,
    wake: WakeCounter,
}

impl Seat {
    const fn new() -> Self {
        Self {
            queue: LockQueue::new(),
            wake: WakeCounter::new(),
        }
    }
}

// -----------------------------------------------------------------------------
// Executor

/// Shared scheduling state of a pool: the seat array.
///
/// The array is immutable between construction and drop; all interior
/// mutability sits behind the per-seat queue and wake-counter locks, so
/// submitters, workers and helping joiners reach any seat without further
/// synchronization.
pub(crate) struct Executor {
    seats: Box<[CachePadded<Seat>]>,
}

impl Executor {
    /// Creates the seat array for `seat_count` workers.
    pub(crate) fn new(seat_count: usize) -> Self {
        Self {
            seats: (0..seat_count)
                .map(|_| CachePadded::new(Seat::new()))
                .collect(),
        }
    }

    /// Returns the number of seats (= workers) in the pool.
    #[inline]
    pub(crate) fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// Enqueues a runnable on some seat and signals the matching worker.
    ///
    /// Starting from a random seat, the runnable is offered to each queue
    /// in turn with a non-blocking push. If every attempt misses, the push
    /// falls back to a blocking append on the starting seat so submission
    /// always makes progress.
    pub(crate) fn push(&self, mut runnable: Runnable) {
        let width = self.seats.len();
        let start = xor_shift::next_index(width);

        for k in 0..SWEEP_ROUNDS * width {
            let seat = &self.seats[(start + k) % width];
            match seat.queue.try_push(runnable) {
                Ok(()) => {
                    seat.wake.signal();
                    return;
                }
                Err(back) => runnable = back,
            }
        }

        let seat = &self.seats[start];
        seat.queue.push(runnable);
        seat.wake.signal();
    }

    /// Dequeues a runnable, stealing from other seats when `home` is dry.
    ///
    /// Probes every queue non-blockingly starting at `home`, then falls back
    /// to a blocking pop on `home`, which may still find the queue genuinely
    /// empty and return `None`.
    pub(crate) fn steal_pop(&self, home: usize) -> Option<Runnable> {
        let width = self.seats.len();

        for k in 0..SWEEP_ROUNDS * width {
            if let Some(runnable) = self.seats[(home + k) % width].queue.try_pop() {
                return Some(runnable);
            }
        }

        self.seats[home].queue.pop()
    }

    /// Parks the worker owning `home` until it is signalled; returns `true`
    /// when the worker should exit.
    #[inline]
    pub(crate) fn wait_or_death(&self, home: usize) -> bool {
        self.seats[home].wake.wait_or_death()
    }

    /// Latches the death flag on every seat, one final wakeup each.
    pub(crate) fn signal_death_all(&self) {
        for seat in self.seats.iter() {
            seat.wake.signal_death();
        }
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("seat_count", &self.seat_count())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Worker loop

/// Scheduling loop run by each worker thread.
///
/// Each iteration consumes one wake notification, then steals and executes at
/// most one runnable. The loop exits once the death notification posted by
/// shutdown has drained all earlier wakeups; the pop in the same iteration
/// still runs, so a worker may finish one last task after observing death.
pub(crate) fn worker_loop(executor: &Executor, home: usize) {
    log::trace!("worker {home} online");

    let mut alive = true;
    while alive {
        alive = !executor.wait_or_death(home);
        if let Some(runnable) = executor.steal_pop(home) {
            runnable();
        }
    }

    log::trace!("worker {home} retiring");
}

// -----------------------------------------------------------------------------
// Tests
