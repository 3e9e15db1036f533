//! Per-block height counters
//!
//! The height of block (i, j) is the number of pivot rounds the block has
//! been finalised through. Heights only ever grow. Readers spin on the
//! atomic first and only fall back to a condition variable, striped per
//! block row, when the height they need has not been reached yet.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Stripe {
    lock: Mutex<()>,
    raised: Condvar,
}

/// Monotonic completion counters for every block of a square grid
#[derive(Debug)]
pub struct HeightCounters {
    grid: usize,
    heights: Vec<AtomicUsize>,
    stripes: Vec<Stripe>,
}

impl HeightCounters {
    /// Creates counters for a `grid` x `grid` block matrix, all at height zero
    pub fn new(grid: usize) -> Self {
        HeightCounters {
            grid,
            heights: (0..grid * grid).map(|_| AtomicUsize::new(0)).collect(),
            stripes: (0..grid).map(|_| Stripe::default()).collect(),
        }
    }

    /// Lowers every height back to zero
    ///
    /// Needs exclusive access, so no worker can be waiting on the counters.
    pub fn reset(&mut self) {
        for height in &mut self.heights {
            *height.get_mut() = 0;
        }
    }

    /// Grid extent the counters were created for
    pub fn grid(&self) -> usize {
        self.grid
    }

    /// Current height of block (`i`, `j`)
    #[inline]
    pub fn height(&self, i: usize, j: usize) -> usize {
        self.heights[i * self.grid + j].load(Ordering::Acquire)
    }

    /// Returns true if block (`i`, `j`) has reached `height`
    #[inline]
    pub fn is_at_least(&self, i: usize, j: usize, height: usize) -> bool {
        self.height(i, j) >= height
    }

    /// Blocks the calling thread until block (`i`, `j`) reaches `height`
    ///
    /// Returns true if the thread actually had to sleep.
    pub fn wait_until(&self, i: usize, j: usize, height: usize) -> bool {
        if self.is_at_least(i, j, height) {
            return false;
        }
        let stripe = &self.stripes[i];
        let mut guard = stripe.lock.lock();
        while !self.is_at_least(i, j, height) {
            stripe.raised.wait(&mut guard);
        }
        true
    }

    /// Raises block (`i`, `j`) to `height` and wakes every waiter on its row
    ///
    /// Lowering a height is a no-op.
    pub fn notify(&self, i: usize, j: usize, height: usize) {
        let stripe = &self.stripes[i];
        {
            // raised under the lock so that a waiter cannot miss the wakeup
            let _guard = stripe.lock.lock();
            self.heights[i * self.grid + j].fetch_max(height, Ordering::Release);
        }
        stripe.raised.notify_all();
    }
}
