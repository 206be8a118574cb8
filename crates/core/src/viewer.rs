//! Viewing session
//!
//! Owns the layout snapshot, the visibility tracker and the render scheduler
//! for one source document, and wires them together:
//!
//! ```text
//! scroll input -> VisibilityTracker -> ProgressiveRenderScheduler -> Painter
//!                        ^                        ^
//!                        +------- Layout ---------+
//! ```
//!
//! The owner drives it from one thread: scroll events go to
//! [`Viewer::on_scroll`], and [`Viewer::pump`] is called every frame to fire
//! timers and advance paint operations.

use crate::config::{ConfigError, ViewerConfig};
use crate::layout::{
    compute_layout, scroll_to_item, ItemDimensions, Layout, LayoutMode, ScrollAlignment,
    ScrollBehavior, ScrollTarget, DEFAULT_GAP_UNIT, DEFAULT_PADDING_UNIT,
};
use crate::visibility::{ViewMode, VisibilityTracker, VisibleSet};
use pagestream_render::{ItemSurfaces, RenderedItem};
use pagestream_scheduler::{Painter, ProgressiveRenderScheduler, RenderCandidate, SchedulerEvent};
use std::sync::Arc;
use std::time::Instant;

/// Result of asking for an item's natural size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DimensionLookup {
    Ready(ItemDimensions),

    /// Not measured yet; a placeholder is laid out until it arrives
    Pending,
}

impl DimensionLookup {
    pub fn ready(self) -> Option<ItemDimensions> {
        match self {
            DimensionLookup::Ready(dims) => Some(dims),
            DimensionLookup::Pending => None,
        }
    }
}

/// Source document as seen by the layout
pub trait DimensionSource {
    fn item_count(&self) -> usize;

    /// Natural size of `index` (1-based)
    fn natural_dimensions(&self, index: usize) -> DimensionLookup;
}

/// Scrollable surface the viewer is mounted in
pub trait ScrollSurface {
    /// Offset along the layout's stacking axis
    fn scroll_offset(&self) -> f64;

    /// Viewport `(width, height)` in pixels
    fn viewport_size(&self) -> (f64, f64);

    fn scroll_to(&mut self, target: ScrollTarget);
}

/// A viewing session over one document
pub struct Viewer<D: DimensionSource> {
    config: ViewerConfig,
    source: D,
    layout: Arc<Layout>,
    view_mode: ViewMode,
    viewport: (f64, f64),
    tracker: VisibilityTracker,
    scheduler: ProgressiveRenderScheduler,
}

impl<D: DimensionSource> Viewer<D> {
    /// Create a session; the configuration is validated first
    pub fn new(config: ViewerConfig, source: D) -> Result<Self, ConfigError> {
        config.validate()?;

        let layout = Arc::new(build_layout(&source, config.layout_mode, config.scale));
        tracing::debug!(items = layout.item_count(), mode = ?config.layout_mode, "viewer created");

        Ok(Self {
            tracker: VisibilityTracker::new(config.tracker_config()),
            scheduler: ProgressiveRenderScheduler::new(config.scheduler_config()),
            config,
            source,
            layout,
            view_mode: ViewMode::Continuous,
            viewport: (0.0, 0.0),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Current layout snapshot; identity only changes when the layout does
    pub fn layout(&self) -> Arc<Layout> {
        Arc::clone(&self.layout)
    }

    /// Published visible set
    pub fn visible_set(&self) -> Arc<VisibleSet> {
        self.tracker.published()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn tracker(&self) -> &VisibilityTracker {
        &self.tracker
    }

    pub fn scheduler(&self) -> &ProgressiveRenderScheduler {
        &self.scheduler
    }

    /// What `index` was last painted at
    pub fn rendered_quality(&self, index: usize) -> Option<RenderedItem> {
        self.scheduler.rendered(index)
    }

    fn viewport_extent(&self) -> f64 {
        if self.layout.is_horizontal {
            self.viewport.0
        } else {
            self.viewport.1
        }
    }

    /// Scroll target for `index` against the current viewport
    pub fn scroll_to_item(
        &self,
        index: usize,
        behavior: ScrollBehavior,
        alignment: ScrollAlignment,
    ) -> Option<ScrollTarget> {
        scroll_to_item(&self.layout, index, behavior, alignment, self.viewport_extent())
    }

    /// Scroll event from the surface
    pub fn on_scroll<S: ScrollSurface + ?Sized>(&mut self, surface: &S, now: Instant) {
        self.viewport = surface.viewport_size();
        self.tracker.set_viewport_extent(self.viewport_extent());
        self.scheduler.note_scroll_activity(now);
        let published = self.tracker.on_scroll(&self.layout, surface.scroll_offset(), now);
        self.after_tracker(published, now);
    }

    /// Viewport resized
    pub fn on_resize<S: ScrollSurface + ?Sized>(&mut self, surface: &S, now: Instant) {
        self.viewport = surface.viewport_size();
        let extent = self.viewport_extent();
        let published = self.tracker.on_viewport_change(&self.layout, extent, now);
        self.after_tracker(published, now);
    }

    /// Change the display scale
    pub fn set_scale(&mut self, scale: f64, now: Instant) {
        self.config.scale = scale;
        self.scheduler.note_zoom_activity(now);
        self.relayout(now);
    }

    /// Mark a pinch/zoom gesture as in progress
    pub fn set_zoom_in_progress(&mut self, in_progress: bool, now: Instant) {
        self.scheduler.set_zoom_in_progress(in_progress, now);
    }

    /// Change the stacking axis
    ///
    /// The surface is scrolled back to the origin; the previous current item
    /// is recentred shortly after by [`Viewer::pump`].
    pub fn set_layout_mode<S: ScrollSurface + ?Sized>(&mut self, mode: LayoutMode, surface: &mut S, now: Instant) {
        if mode == self.config.layout_mode {
            return;
        }
        self.config.layout_mode = mode;
        self.layout = Arc::new(build_layout(&self.source, mode, self.config.scale));
        self.tracker.set_viewport_extent(self.viewport_extent());

        let published = self.tracker.on_layout_mode_change(&self.layout, now);
        if self.view_mode == ViewMode::Continuous {
            surface.scroll_to(ScrollTarget {
                offset: 0.0,
                horizontal: self.layout.is_horizontal,
                behavior: ScrollBehavior::Instant,
            });
        }
        self.after_tracker(published, now);
    }

    /// Switch between continuous and single-page viewing
    pub fn set_view_mode(&mut self, mode: ViewMode, now: Instant) {
        if mode == self.view_mode {
            return;
        }
        self.view_mode = mode;
        let current = self.tracker.published().current_item().unwrap_or(1);
        let published = self.tracker.set_view_mode(mode, current, &self.layout, now);
        self.after_tracker(published, now);
    }

    /// An item's natural size became known or changed
    pub fn dimensions_changed(&mut self, index: usize, now: Instant) {
        if self.relayout(now) {
            self.scheduler.invalidate_item(index, now);
        }
    }

    /// Item content changed; repaint it
    pub fn invalidate_item(&mut self, index: usize, now: Instant) {
        self.scheduler.invalidate_item(index, now);
    }

    /// Replace the source document, dropping all per-document state
    pub fn load_document(&mut self, source: D, now: Instant) {
        tracing::debug!(items = source.item_count(), "loading document");
        self.source = source;
        self.scheduler.reset();
        self.tracker.reset();
        self.layout = Arc::new(build_layout(&self.source, self.config.layout_mode, self.config.scale));

        let extent = self.viewport_extent();
        let published = self.tracker.on_viewport_change(&self.layout, extent, now);
        self.after_tracker(published, now);
    }

    /// Rebuild the layout; returns whether it changed
    fn relayout(&mut self, now: Instant) -> bool {
        let layout = build_layout(&self.source, self.config.layout_mode, self.config.scale);
        if *self.layout == layout {
            return false;
        }
        self.layout = Arc::new(layout);
        self.tracker.on_layout_change(&self.layout, now);
        // Geometry or zoom changed even when the set did not
        self.sync_scheduler(now);
        true
    }

    /// Fire timers and advance paint operations
    pub fn pump<P, I, S>(
        &mut self,
        now: Instant,
        painter: &mut P,
        surfaces: &mut I,
        scroll: &mut S,
    ) -> Vec<SchedulerEvent>
    where
        P: Painter + ?Sized,
        I: ItemSurfaces + ?Sized,
        S: ScrollSurface + ?Sized,
    {
        let update = self.tracker.poll(&self.layout, now);
        if let Some(target) = update.scroll_to {
            scroll.scroll_to(target);
        }
        self.after_tracker(update.published, now);

        self.scheduler.pump(now, painter, surfaces)
    }

    fn after_tracker(&mut self, published: Option<Arc<VisibleSet>>, now: Instant) {
        if published.is_some() {
            self.sync_scheduler(now);
        } else {
            let candidates = self.candidates(&self.tracker.published());
            self.scheduler.refresh_priorities(candidates);
        }
    }

    fn sync_scheduler(&mut self, now: Instant) {
        let candidates = self.candidates(&self.tracker.published());
        self.scheduler.set_visible(candidates, self.config.scale as f32, now);
    }

    /// Render candidates for `set`, with distances to the viewport midpoint
    fn candidates(&self, set: &VisibleSet) -> Vec<RenderCandidate> {
        let center = self.tracker.scroll_offset() + self.viewport_extent() / 2.0;
        set.indices()
            .iter()
            .filter_map(|&index| {
                let dims = self.layout.natural_dimensions(index)?;
                let midpoint = self.layout.midpoint(index)?;
                Some(RenderCandidate::new(
                    index,
                    dims.width as f32,
                    dims.height as f32,
                    (midpoint - center) as f32,
                ))
            })
            .collect()
    }
}

fn build_layout<D: DimensionSource + ?Sized>(source: &D, mode: LayoutMode, scale: f64) -> Layout {
    compute_layout(
        source.item_count(),
        |index| source.natural_dimensions(index).ready(),
        mode,
        scale,
        DEFAULT_GAP_UNIT,
        DEFAULT_PADDING_UNIT,
    )
}
