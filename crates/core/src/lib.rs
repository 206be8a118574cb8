//! Pagestream Core Library
//!
//! Viewport virtualization for long sequences of paginated items: the layout
//! engine, the visibility tracker and the [`Viewer`] session that feeds the
//! progressive render scheduler.
//!
//! # Example
//!
//! ```
//! use pagestream_core::{
//!     DimensionLookup, DimensionSource, ItemDimensions, ScrollSurface, ScrollTarget, Viewer,
//!     ViewerConfig,
//! };
//! use std::time::Instant;
//!
//! struct Letters(usize);
//!
//! impl DimensionSource for Letters {
//!     fn item_count(&self) -> usize {
//!         self.0
//!     }
//!
//!     fn natural_dimensions(&self, _index: usize) -> DimensionLookup {
//!         DimensionLookup::Ready(ItemDimensions::new(612.0, 792.0))
//!     }
//! }
//!
//! struct Window {
//!     offset: f64,
//! }
//!
//! impl ScrollSurface for Window {
//!     fn scroll_offset(&self) -> f64 {
//!         self.offset
//!     }
//!
//!     fn viewport_size(&self) -> (f64, f64) {
//!         (1024.0, 768.0)
//!     }
//!
//!     fn scroll_to(&mut self, target: ScrollTarget) {
//!         self.offset = target.offset;
//!     }
//! }
//!
//! let now = Instant::now();
//! let mut viewer = Viewer::new(ViewerConfig::default(), Letters(500)).unwrap();
//! let window = Window { offset: 0.0 };
//! viewer.on_resize(&window, now);
//!
//! assert_eq!(viewer.layout().item_count(), 500);
//! assert_eq!(viewer.visible_set().current_item(), Some(1));
//! ```

pub mod config;
pub mod layout;
pub mod viewer;
pub mod visibility;

pub use config::{ConfigError, ViewerConfig, MAX_CONCURRENCY, MAX_TIMER_MS};
pub use layout::{
    compute_layout, fit_page_scale, fit_width_scale, scroll_to_item, ItemDimensions, ItemRect,
    Layout, LayoutMode, ScrollAlignment, ScrollBehavior, ScrollTarget, DEFAULT_GAP_UNIT,
    DEFAULT_PADDING_UNIT, FALLBACK_DIMENSIONS,
};
pub use viewer::{DimensionLookup, DimensionSource, ScrollSurface, Viewer};
pub use visibility::{
    compute_visible, visible_window, TrackerConfig, TrackerUpdate, ViewMode, VisibilityTracker,
    VisibleSet,
};
