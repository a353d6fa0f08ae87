use core::cell::Cell;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::hash::{BuildHasher, RandomState};

// -----------------------------------------------------------------------------
// Thread-local xorshift*

// [xorshift*] tolerates weak seeding as long as the state is never zero, so
// zero doubles as the "not seeded yet" marker.
//
// [xorshift*]: https://en.wikipedia.org/wiki/Xorshift#xorshift*
thread_local! {
    static STATE: Cell<u64> = const { Cell::new(0) };
}

/// Derives a non-zero per-thread seed from the hash of a global counter.
#[cold]
fn seed() -> u64 {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    let hasher = RandomState::new();
    loop {
        let seed = hasher.hash_one(COUNTER.fetch_add(1, Ordering::Relaxed));
        if seed != 0 {
            return seed;
        }
    }
}

/// Returns a value from `0..n`, sequenced per thread.
///
/// This only spreads the starting seat of submission and stealing sweeps
/// across threads; distribution quality beyond that is irrelevant.
pub(crate) fn next_index(n: usize) -> usize {
    debug_assert!(n > 0);

    let raw = STATE.with(|state| {
        let mut x = state.get();
        if x == 0 {
            x = seed();
        }
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        state.set(x);
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    });

    (raw % n as u64) as usize
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::next_index;

    #[test]
    fn stays_in_range() {
        for n in 1..17 {
            for _ in 0..1_000 {
                assert!(next_index(n) < n);
            }
        }
    }

    #[test]
    fn advances() {
        // With a 64-bit state, 32 identical draws in a row would mean the
        // generator is stuck.
        let first = next_index(1 << 16);
        assert!((0..32).any(|_| next_index(1 << 16) != first));
    }
}
