//! Pagestream Cache Library
//!
//! Scratch raster pooling for the progressive render scheduler.

pub mod canvas_pool;

pub use canvas_pool::{CanvasPool, PoolStats, DEFAULT_CANVAS_POOL_SIZE};
