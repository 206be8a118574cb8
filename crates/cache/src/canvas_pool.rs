//! Bounded pool of scratch rasters
//!
//! Render operations paint into an off-screen scratch raster before blitting
//! the result onto an item's surface. Allocating a fresh multi-megabyte buffer
//! per paint churns the allocator under continuous scrolling, so released
//! buffers are kept on a fixed-capacity free-list and resized in place on the
//! next acquire.

use pagestream_render::Raster;

/// Default number of pooled scratch rasters
pub const DEFAULT_CANVAS_POOL_SIZE: usize = 6;

/// Statistics about pool usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Rasters currently on the free-list
    pub pooled: usize,

    /// Maximum rasters the free-list will hold
    pub capacity: usize,

    /// Acquires served from the free-list
    pub reused: u64,

    /// Acquires that had to allocate
    pub allocated: u64,

    /// Releases dropped because the free-list was full
    pub discarded: u64,
}

impl PoolStats {
    /// Fraction of acquires served without allocating (0.0 to 1.0)
    pub fn reuse_rate(&self) -> f64 {
        let total = self.reused + self.allocated;
        if total == 0 {
            0.0
        } else {
            self.reused as f64 / total as f64
        }
    }
}

/// Fixed-capacity free-list of scratch rasters
///
/// Accessed only from the scheduler's thread; a raster handed out by
/// [`CanvasPool::acquire`] must be given back through [`CanvasPool::release`]
/// once its contents have been blitted and not retained afterwards.
///
/// # Example
///
/// ```
/// use pagestream_cache::CanvasPool;
///
/// let mut pool = CanvasPool::new(2);
///
/// let scratch = pool.acquire(800, 1000);
/// assert_eq!(scratch.width(), 800);
/// pool.release(scratch);
///
/// // The next acquire reuses the same allocation at the new size
/// let scratch = pool.acquire(400, 500);
/// assert_eq!(pool.stats().reused, 1);
/// pool.release(scratch);
/// ```
#[derive(Debug)]
pub struct CanvasPool {
    free: Vec<Raster>,
    capacity: usize,
    stats: PoolStats,
}

impl CanvasPool {
    /// Create an empty pool holding at most `capacity` rasters
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            stats: PoolStats { capacity, ..Default::default() },
        }
    }

    /// Take a raster sized `width` x `height`
    ///
    /// Reuses a pooled raster when one is available, resizing it in place.
    pub fn acquire(&mut self, width: u32, height: u32) -> Raster {
        match self.free.pop() {
            Some(mut raster) => {
                raster.resize_in_place(width, height);
                self.stats.reused += 1;
                self.stats.pooled = self.free.len();
                raster
            }
            None => {
                self.stats.allocated += 1;
                Raster::new(width, height)
            }
        }
    }

    /// Return a raster to the pool
    ///
    /// Rasters beyond capacity are dropped. Returns `true` if pooled.
    pub fn release(&mut self, raster: Raster) -> bool {
        if self.free.len() >= self.capacity {
            self.stats.discarded += 1;
            tracing::trace!(capacity = self.capacity, "canvas pool full, dropping raster");
            return false;
        }
        self.free.push(raster);
        self.stats.pooled = self.free.len();
        true
    }

    /// Drop every pooled raster
    ///
    /// Called when the source document changes.
    pub fn clear(&mut self) {
        self.free.clear();
        self.stats.pooled = 0;
    }

    /// Number of rasters currently pooled
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes held by pooled rasters
    pub fn pooled_bytes(&self) -> usize {
        self.free.iter().map(Raster::capacity_bytes).sum()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

impl Default for CanvasPool {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_acquire_allocates_when_empty() {
        let mut pool = CanvasPool::new(2);
        let raster = pool.acquire(10, 20);

        assert_eq!(raster.width(), 10);
        assert_eq!(raster.height(), 20);
        assert_eq!(pool.stats().allocated, 1);
        assert_eq!(pool.stats().reused, 0);
    }

    #[test]
    fn test_release_and_reuse() {
        let mut pool = CanvasPool::new(2);
        let raster = pool.acquire(100, 100);
        let capacity = raster.capacity_bytes();
        assert!(pool.release(raster));
        assert_eq!(pool.len(), 1);

        let reused = pool.acquire(50, 40);
        assert_eq!(reused.width(), 50);
        assert_eq!(reused.height(), 40);
        assert_eq!(reused.capacity_bytes(), capacity);
        assert_eq!(pool.stats().reused, 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_release_beyond_capacity_is_dropped() {
        let mut pool = CanvasPool::new(1);
        assert!(pool.release(Raster::new(1, 1)));
        assert!(!pool.release(Raster::new(1, 1)));

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.stats().discarded, 1);
    }

    #[test]
    fn test_zero_capacity_never_pools() {
        let mut pool = CanvasPool::new(0);
        assert!(!pool.release(Raster::new(4, 4)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut pool = CanvasPool::new(3);
        pool.release(Raster::new(8, 8));
        pool.release(Raster::new(8, 8));
        assert_eq!(pool.pooled_bytes(), 2 * 8 * 8 * 4);

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.stats().pooled, 0);
        assert_eq!(pool.pooled_bytes(), 0);
    }

    #[test]
    fn test_reuse_rate() {
        let mut pool = CanvasPool::new(1);
        let raster = pool.acquire(1, 1);
        pool.release(raster);
        let raster = pool.acquire(1, 1);
        pool.release(raster);

        assert!((pool.stats().reuse_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_random_churn_never_exceeds_capacity() {
        let mut rng = rand::thread_rng();
        let mut pool = CanvasPool::new(4);
        let mut held = Vec::new();

        for _ in 0..500 {
            if rng.gen_bool(0.5) || held.is_empty() {
                held.push(pool.acquire(rng.gen_range(1..64), rng.gen_range(1..64)));
            } else {
                let idx = rng.gen_range(0..held.len());
                pool.release(held.swap_remove(idx));
            }
            assert!(pool.len() <= pool.capacity());
        }
    }
}
