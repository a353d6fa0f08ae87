use core::fmt;
use std::collections::VecDeque;

use parking_lot::Mutex;

// -----------------------------------------------------------------------------
// LockQueue

/// An unbounded MPMC FIFO guarded by a single mutex.
///
/// Besides the blocking [`push`]/[`pop`] pair, the queue offers [`try_push`]
/// and [`try_pop`], which attempt the lock without waiting and back off when
/// it is contended, so callers sweeping over many queues never wait behind a
/// busy one. Within one queue, pops observe pushes in first-in/first-out
/// order; no ordering is implied across queues.
///
/// # Examples
///
/// ```
/// use weft_sync::LockQueue;
///
/// let q = LockQueue::new();
/// q.push(1);
/// assert_eq!(q.pop(), Some(1));
/// assert!(q.pop().is_none());
/// ```
///
/// [`push`]: Self::push
/// [`pop`]: Self::pop
/// [`try_push`]: Self::try_push
/// [`try_pop`]: Self::try_pop
pub struct LockQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> LockQueue<T> {
    /// Creates an empty queue.
    #[inline]
    pub const fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends `value` at the tail, waiting for the lock if necessary.
    #[inline]
    pub fn push(&self, value: T) {
        self.items.lock().push_back(value);
    }

    /// Attempts to append `value` without waiting.
    ///
    /// Returns `Err(value)` when the lock is contended, handing the value
    /// back so the caller can try elsewhere. Nothing is enqueued in that
    /// case.
    #[inline]
    pub fn try_push(&self, value: T) -> Result<(), T> {
        match self.items.try_lock() {
            Some(mut items) => {
                items.push_back(value);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Removes the head, waiting for the lock if necessary.
    ///
    /// Returns `None` when the queue is empty at the moment the lock is
    /// acquired.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Attempts to remove the head without waiting.
    ///
    /// Returns `None` both when the queue is empty and when the lock is
    /// contended; callers that must distinguish the two should use [`pop`].
    ///
    /// [`pop`]: Self::pop
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        self.items.try_lock()?.pop_front()
    }
}

impl<T> Default for LockQueue<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LockQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("LockQueue { .. }")
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::scope;

    use super::LockQueue;

    #[test]
    fn smoke() {
        let q = LockQueue::new();
        q.push(7);
        assert_eq!(q.pop(), Some(7));

        q.push(8);
        assert_eq!(q.pop(), Some(8));
        assert!(q.pop().is_none());
    }

    #[test]
    fn fifo_order() {
        let q = LockQueue::new();
        for i in 0..50 {
            q.push(i);
        }
        for i in 0..50 {
            assert_eq!(q.pop(), Some(i));
        }
        assert!(q.pop().is_none());
    }

    #[test]
    fn try_variants_uncontended() {
        let q = LockQueue::new();
        assert!(q.try_push(1).is_ok());
        assert!(q.try_push(2).is_ok());
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn mpmc() {
        const COUNT: usize = 25_000;
        const THREADS: usize = 4;

        let q = LockQueue::<usize>::new();
        let v = (0..COUNT).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>();

        scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for _ in 0..COUNT {
                        let n = loop {
                            if let Some(x) = q.pop() {
                                break x;
                            }
                        };
                        v[n].fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for i in 0..COUNT {
                        q.push(i);
                    }
                });
            }
        });

        for c in v {
            assert_eq!(c.load(Ordering::SeqCst), THREADS);
        }
    }

    // The try variants must deliver every element exactly once when producers
    // and consumers retry around contention misses.
    #[test]
    fn mpmc_try_variants() {
        const COUNT: usize = 10_000;
        const THREADS: usize = 4;

        let q = LockQueue::<usize>::new();
        let taken = AtomicUsize::new(0);

        scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    while taken.load(Ordering::SeqCst) < COUNT * THREADS {
                        if q.try_pop().is_some() {
                            taken.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
            for _ in 0..THREADS {
                scope.spawn(|| {
                    for i in 0..COUNT {
                        let mut value = i;
                        while let Err(back) = q.try_push(value) {
                            value = back;
                        }
                    }
                });
            }
        });

        assert_eq!(taken.load(Ordering::SeqCst), COUNT * THREADS);
        assert!(q.pop().is_none());
    }
}
