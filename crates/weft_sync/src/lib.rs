//! Synchronization primitives backing the `weft` task engine.
//!
//! ## Primitives
//!
//! - [`LockQueue`] : A mutex-guarded FIFO with non-blocking `try` variants of
//!   push and pop. The `try` operations give up immediately when the lock is
//!   contended, which lets callers sweep over several queues without ever
//!   waiting on a busy one.
//! - [`WakeCounter`] : A counted notification primitive with a latched
//!   shutdown flag. A consumer parks here while it has nothing to do;
//!   producers post one notification per unit of work, and teardown posts a
//!   final notification that also latches the flag so no wakeup is lost.

// -----------------------------------------------------------------------------
// Modules

mod lock_queue;
mod wake_counter;

// -----------------------------------------------------------------------------
// Exports

pub use lock_queue::LockQueue;
pub use wake_counter::WakeCounter;
