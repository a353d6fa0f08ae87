use core::fmt;

use parking_lot::{Condvar, Mutex};

// -----------------------------------------------------------------------------
// Signals

/// Shared state behind the counter's mutex.
struct Signals {
    /// Outstanding "you have work" notifications not yet consumed.
    pending: usize,
    /// Latched once at teardown; never cleared.
    death: bool,
}

// -----------------------------------------------------------------------------
// WakeCounter

/// A counted notification primitive with a latched death flag.
///
/// One consumer parks on the counter while it has nothing to do. Producers
/// call [`signal`] once per unit of work made available; teardown calls
/// [`signal_death`], which posts one more notification *and* latches the
/// death flag.
///
/// Because death always arrives together with a notification, a consumer that
/// still has ordinary notifications queued keeps waking and draining them; it
/// only observes death once the count runs dry. That makes teardown graceful:
/// no wakeup posted before death is ever lost.
///
/// [`signal`]: Self::signal
/// [`signal_death`]: Self::signal_death
pub struct WakeCounter {
    signals: Mutex<Signals>,
    wakeup: Condvar,
}

impl WakeCounter {
    /// Creates a counter with no pending notifications and death unlatched.
    #[inline]
    pub const fn new() -> Self {
        Self {
            signals: Mutex::new(Signals {
                pending: 0,
                death: false,
            }),
            wakeup: Condvar::new(),
        }
    }

    /// Blocks until a notification is available, consumes it, and reports
    /// whether the consumer should exit.
    ///
    /// Returns `true` exactly when the consumed notification was the last
    /// one outstanding *and* death has been latched. Any earlier notification
    /// returns `false`, so queued work posted before teardown is still
    /// drained one wakeup at a time.
    pub fn wait_or_death(&self) -> bool {
        let mut signals = self.signals.lock();
        while signals.pending == 0 && !signals.death {
            self.wakeup.wait(&mut signals);
        }
        if signals.pending > 0 {
            signals.pending -= 1;
        }
        signals.pending == 0 && signals.death
    }

    /// Posts one notification and wakes the consumer.
    #[inline]
    pub fn signal(&self) {
        self.signals.lock().pending += 1;
        self.wakeup.notify_one();
    }

    /// Posts one final notification and latches the death flag.
    ///
    /// The flag stays latched forever; further [`signal`] calls are legal but
    /// pointless.
    ///
    /// [`signal`]: Self::signal
    #[inline]
    pub fn signal_death(&self) {
        let mut signals = self.signals.lock();
        signals.pending += 1;
        signals.death = true;
        drop(signals);
        self.wakeup.notify_one();
    }
}

impl Default for WakeCounter {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WakeCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("WakeCounter { .. }")
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::scope;

    use super::WakeCounter;

    #[test]
    fn signal_then_wait() {
        let wake = WakeCounter::new();
        wake.signal();
        assert!(!wake.wait_or_death());
    }

    #[test]
    fn death_alone_reports_exit() {
        let wake = WakeCounter::new();
        wake.signal_death();
        assert!(wake.wait_or_death());
    }

    #[test]
    fn death_drains_after_pending_work() {
        let wake = WakeCounter::new();
        wake.signal();
        wake.signal();
        wake.signal_death();

        assert!(!wake.wait_or_death());
        assert!(!wake.wait_or_death());
        assert!(wake.wait_or_death());
    }

    #[test]
    fn cross_thread_wakeup() {
        const ROUNDS: usize = 1_000;

        let wake = WakeCounter::new();
        let seen = AtomicUsize::new(0);

        scope(|scope| {
            scope.spawn(|| {
                loop {
                    let dead = wake.wait_or_death();
                    seen.fetch_add(1, Ordering::SeqCst);
                    if dead {
                        break;
                    }
                }
            });
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    wake.signal();
                }
                wake.signal_death();
            });
        });

        // One consumption per signal plus the death notification.
        assert_eq!(seen.load(Ordering::SeqCst), ROUNDS + 1);
    }
}
