//! Pagestream Scheduler Library
//!
//! Progressive render scheduling for a virtualized item viewer.
//!
//! Visible items are painted twice: a fast low-resolution pass that runs as
//! soon as the visible set changes, then a quality pass once scrolling and
//! zooming have settled. Work is ordered by distance from the viewport
//! midpoint, runs in concurrency-limited batches and is abandoned between
//! batches as soon as a newer scheduling invocation supersedes it.
//!
//! # Example
//!
//! ```
//! use pagestream_render::{Raster, SurfaceStore};
//! use pagestream_scheduler::{
//!     CancellationToken, PaintOperation, PaintPoll, PaintRequest, Painter,
//!     ProgressiveRenderScheduler, RenderCandidate, SchedulerConfig, SchedulerEvent,
//! };
//! use std::time::{Duration, Instant};
//!
//! struct Grey;
//!
//! impl Painter for Grey {
//!     fn begin_paint(&mut self, _req: &PaintRequest, _token: CancellationToken) -> Box<dyn PaintOperation> {
//!         Box::new(|target: &mut Raster| {
//!             target.fill([128, 128, 128, 255]);
//!             PaintPoll::Ready(Ok(()))
//!         })
//!     }
//! }
//!
//! let start = Instant::now();
//! let mut scheduler = ProgressiveRenderScheduler::new(SchedulerConfig::default());
//! let mut surfaces = SurfaceStore::new();
//!
//! let visible = vec![
//!     RenderCandidate::new(1, 612.0, 792.0, -400.0),
//!     RenderCandidate::new(2, 612.0, 792.0, 400.0),
//! ];
//! scheduler.set_visible(visible, 1.0, start);
//!
//! let mut events = Vec::new();
//! for _ in 0..4 {
//!     events.extend(scheduler.pump(start, &mut Grey, &mut surfaces));
//! }
//! assert!(matches!(events.last(), Some(SchedulerEvent::PassCommitted { painted: 2, .. })));
//!
//! // After the upgrade delay the quality pass repaints both items
//! let settled = start + Duration::from_millis(600);
//! for _ in 0..4 {
//!     scheduler.pump(settled, &mut Grey, &mut surfaces);
//! }
//! assert_eq!(scheduler.rendered(1).map(|r| r.scale), Some(2.0));
//! ```

mod cancel;
mod painter;
mod priority;
mod scheduler;
mod timer;

// Re-export public API
pub use cancel::CancellationToken;
pub use painter::{PaintOperation, PaintPoll, PaintRequest, Painter};
pub use priority::{Batch, RenderCandidate, WorkList};
pub use scheduler::{
    GenerationCounter, ProgressiveRenderScheduler, SchedulerConfig, SchedulerEvent,
    SchedulerStats, FAST_SCALE_FLOOR, LOW_ZOOM_BATCH_MULTIPLIER, LOW_ZOOM_THRESHOLD,
    MAX_RENDER_EDGE_PX,
};
pub use timer::{
    Debounce, DebounceState, COMMIT_COOLDOWN, MODE_SWITCH_RECENTER_DELAY,
    QUALITY_UPGRADE_DELAY, SETTLE_WINDOW,
};
