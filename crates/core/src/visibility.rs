//! Visibility tracking
//!
//! Computes which items intersect the buffered viewport window and which one
//! is current, then decides when that result is worth publishing.
//!
//! Two copies of the visible set are kept. The reference copy is replaced on
//! every scroll tick and nobody observes it. The published copy is an
//! `Arc<VisibleSet>` that downstream mounting reacts to, so replacing it is
//! throttled:
//!
//! - if the `(len, min, max)` signature changed and the commit cooldown has
//!   elapsed, publish immediately;
//! - otherwise (re)arm the settle timer and publish a fresh computation when
//!   it fires.

use crate::layout::{scroll_to_item, Layout, ScrollAlignment, ScrollBehavior, ScrollTarget};
use pagestream_scheduler::{
    Debounce, COMMIT_COOLDOWN, MODE_SWITCH_RECENTER_DELAY, SETTLE_WINDOW,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Items kept on each side of the current item when a mode switch seeds the set
pub const MODE_SWITCH_SEED_RADIUS: usize = 3;

/// Items examined before the binary-search start when picking the current item
pub const BACKWARD_SCAN_LIMIT: usize = 8;

/// Viewing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// All items stacked and scrolled through
    #[default]
    Continuous,

    /// Exactly one item shown at a time
    SinglePage,
}

/// Visible item indices plus the current item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    indices: Vec<usize>,
    current_item: Option<usize>,
}

impl VisibleSet {
    /// Build from any index order; indices are sorted and deduplicated
    pub fn new(mut indices: Vec<usize>, current_item: Option<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Self { indices, current_item }
    }

    /// `center ± radius`, clipped to `1..=item_count`
    pub fn around(center: usize, radius: usize, item_count: usize) -> Self {
        if item_count == 0 || center == 0 {
            return Self::default();
        }
        let center = center.min(item_count);
        let start = center.saturating_sub(radius).max(1);
        let end = center.saturating_add(radius).min(item_count);
        Self { indices: (start..=end).collect(), current_item: Some(center) }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn current_item(&self) -> Option<usize> {
        self.current_item
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn min(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub fn max(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// Cheap change filter: scrolling only adds or removes items at the ends
    pub fn signature(&self) -> (usize, Option<usize>, Option<usize>) {
        (self.len(), self.min(), self.max())
    }
}

/// Buffered window `[start, end)` along the stacking axis
pub fn visible_window(scroll_offset: f64, viewport_extent: f64, buffer_multiplier: f64) -> (f64, f64) {
    let buffer = viewport_extent * buffer_multiplier;
    (scroll_offset - buffer, scroll_offset + viewport_extent + buffer)
}

/// Items intersecting the buffered window, and the current item
///
/// Binary search finds the first item whose trailing edge passes the window
/// start; a forward walk collects items until one starts at or past the
/// window end.
///
/// # Example
///
/// ```
/// use pagestream_core::{compute_layout, compute_visible, ItemDimensions, LayoutMode};
///
/// let layout = compute_layout(
///     100,
///     |_| Some(ItemDimensions::new(600.0, 990.0)),
///     LayoutMode::Vertical,
///     1.0,
///     10.0,
///     20.0,
/// );
///
/// // Window is [4200, 6600)
/// let visible = compute_visible(&layout, 5000.0, 800.0, 1.0);
/// assert_eq!(visible.indices(), &[5, 6, 7]);
/// assert_eq!(visible.current_item(), Some(6));
/// ```
pub fn compute_visible(
    layout: &Layout,
    scroll_offset: f64,
    viewport_extent: f64,
    buffer_multiplier: f64,
) -> VisibleSet {
    let count = layout.item_count();
    if count == 0 {
        return VisibleSet::default();
    }

    let horizontal = layout.is_horizontal;
    let (start, end) = visible_window(scroll_offset, viewport_extent, buffer_multiplier);
    let center = scroll_offset + viewport_extent / 2.0;

    // Every slot after 0 is positioned, so the partition covers all items.
    let first = layout.positions[1..]
        .partition_point(|rect| rect.map_or(true, |r| r.trailing(horizontal) <= start))
        + 1;

    let mut indices = Vec::new();
    let mut best: Option<(usize, f64)> = None;
    let consider = |index: usize, midpoint: f64, best: &mut Option<(usize, f64)>| {
        let distance = (midpoint - center).abs();
        if best.map_or(true, |(_, d)| distance < d) {
            *best = Some((index, distance));
        }
    };

    for index in first..=count {
        let Some(rect) = layout.rect(index) else {
            continue;
        };
        if rect.leading(horizontal) >= end {
            break;
        }
        indices.push(index);
        consider(index, rect.midpoint(horizontal), &mut best);
    }

    // Items before the window can only be closer when the walk found nothing
    // near the center; stop once distances start growing.
    let mut previous = best.map(|(_, d)| d);
    for index in (first.saturating_sub(BACKWARD_SCAN_LIMIT).max(1)..first.min(count + 1)).rev() {
        let Some(midpoint) = layout.midpoint(index) else {
            continue;
        };
        let distance = (midpoint - center).abs();
        if previous.is_some_and(|d| distance > d) {
            break;
        }
        previous = Some(distance);
        consider(index, midpoint, &mut best);
    }

    VisibleSet { indices, current_item: best.map(|(index, _)| index) }
}

/// What a tracker step produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerUpdate {
    /// Newly published set, if publishing changed it
    pub published: Option<Arc<VisibleSet>>,

    /// Scroll position the owner of the scroll surface should apply
    pub scroll_to: Option<ScrollTarget>,
}

impl TrackerUpdate {
    pub fn is_empty(&self) -> bool {
        self.published.is_none() && self.scroll_to.is_none()
    }
}

/// Visibility tracker timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    /// Extra window on each side, in viewport extents
    pub buffer_multiplier: f64,
    pub settle_window: Duration,
    pub commit_cooldown: Duration,
    pub recenter_delay: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            buffer_multiplier: 1.0,
            settle_window: SETTLE_WINDOW,
            commit_cooldown: COMMIT_COOLDOWN,
            recenter_delay: MODE_SWITCH_RECENTER_DELAY,
        }
    }
}

/// Scroll-driven visible set with throttled publishing
pub struct VisibilityTracker {
    config: TrackerConfig,
    view_mode: ViewMode,
    scroll_offset: f64,
    viewport_extent: f64,
    reference: VisibleSet,
    published: Arc<VisibleSet>,
    last_commit: Option<Instant>,
    settle: Debounce,
    recenter: Debounce,
    recenter_item: Option<usize>,
    commits: u64,
}

impl VisibilityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            settle: Debounce::new(config.settle_window),
            recenter: Debounce::new(config.recenter_delay),
            config,
            view_mode: ViewMode::Continuous,
            scroll_offset: 0.0,
            viewport_extent: 0.0,
            reference: VisibleSet::default(),
            published: Arc::new(VisibleSet::default()),
            last_commit: None,
            recenter_item: None,
            commits: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport_extent(&self) -> f64 {
        self.viewport_extent
    }

    /// Set updated on every tick
    pub fn reference(&self) -> &VisibleSet {
        &self.reference
    }

    /// Set observed by the mounting layer
    pub fn published(&self) -> Arc<VisibleSet> {
        Arc::clone(&self.published)
    }

    /// Number of commits that changed the published set
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    pub fn settle_pending(&self) -> bool {
        self.settle.is_armed()
    }

    pub fn recenter_pending(&self) -> bool {
        self.recenter.is_armed()
    }

    fn compute(&self, layout: &Layout) -> VisibleSet {
        compute_visible(layout, self.scroll_offset, self.viewport_extent, self.config.buffer_multiplier)
    }

    /// Publish `set`; a no-op when it equals the published set
    pub fn commit(&mut self, set: VisibleSet, now: Instant) -> Option<Arc<VisibleSet>> {
        if *self.published == set {
            tracing::trace!(count = set.len(), "visible set unchanged");
            return None;
        }

        tracing::debug!(
            count = set.len(),
            min = ?set.min(),
            max = ?set.max(),
            current = ?set.current_item(),
            "publishing visible set"
        );
        self.published = Arc::new(set);
        self.last_commit = Some(now);
        self.commits += 1;
        Some(Arc::clone(&self.published))
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.last_commit
            .map_or(true, |at| now.saturating_duration_since(at) > self.config.commit_cooldown)
    }

    /// Scroll tick
    pub fn on_scroll(&mut self, layout: &Layout, scroll_offset: f64, now: Instant) -> Option<Arc<VisibleSet>> {
        self.scroll_offset = scroll_offset;
        if self.view_mode == ViewMode::SinglePage {
            return None;
        }

        let fresh = self.compute(layout);
        let changed = fresh.signature() != self.published.signature();
        self.reference = fresh.clone();

        if changed && self.cooldown_elapsed(now) {
            self.settle.cancel();
            return self.commit(fresh, now);
        }

        self.settle.arm(now);
        None
    }

    /// Record the viewport extent without recomputing
    pub fn set_viewport_extent(&mut self, viewport_extent: f64) {
        self.viewport_extent = viewport_extent.max(0.0);
    }

    /// Viewport resized; recompute and publish immediately
    pub fn on_viewport_change(&mut self, layout: &Layout, viewport_extent: f64, now: Instant) -> Option<Arc<VisibleSet>> {
        self.viewport_extent = viewport_extent.max(0.0);
        self.recompute_now(layout, now)
    }

    /// Layout replaced; recompute and publish immediately
    pub fn on_layout_change(&mut self, layout: &Layout, now: Instant) -> Option<Arc<VisibleSet>> {
        self.recompute_now(layout, now)
    }

    fn recompute_now(&mut self, layout: &Layout, now: Instant) -> Option<Arc<VisibleSet>> {
        if self.view_mode == ViewMode::SinglePage {
            return None;
        }
        self.settle.cancel();
        let fresh = self.compute(layout);
        self.reference = fresh.clone();
        self.commit(fresh, now)
    }

    /// Layout mode switched while continuous
    ///
    /// The scroll offset returns to the origin, the visible set is seeded with
    /// the previous current item and its neighbours, and a recenter is armed.
    pub fn on_layout_mode_change(&mut self, layout: &Layout, now: Instant) -> Option<Arc<VisibleSet>> {
        if self.view_mode == ViewMode::SinglePage {
            return None;
        }

        let previous = self.published.current_item().or(self.reference.current_item());
        self.scroll_offset = 0.0;
        self.settle.cancel();

        let seed = match previous {
            Some(item) => VisibleSet::around(item, MODE_SWITCH_SEED_RADIUS, layout.item_count()),
            None => self.compute(layout),
        };
        tracing::debug!(previous = ?previous, count = seed.len(), "seeding visible set after mode switch");

        self.reference = seed.clone();
        self.recenter_item = seed.current_item();
        if self.recenter_item.is_some() {
            self.recenter.arm(now);
        }
        self.commit(seed, now)
    }

    /// Switch between continuous and single-page viewing
    ///
    /// Single-page mode publishes exactly `current_item`.
    pub fn set_view_mode(&mut self, mode: ViewMode, current_item: usize, layout: &Layout, now: Instant) -> Option<Arc<VisibleSet>> {
        self.view_mode = mode;
        self.settle.cancel();
        self.recenter.cancel();
        match mode {
            ViewMode::SinglePage => {
                let set = VisibleSet::around(current_item, 0, layout.item_count());
                self.reference = set.clone();
                self.commit(set, now)
            }
            ViewMode::Continuous => self.recompute_now(layout, now),
        }
    }

    /// Fire due timers
    pub fn poll(&mut self, layout: &Layout, now: Instant) -> TrackerUpdate {
        let mut update = TrackerUpdate::default();

        if self.recenter.poll(now) {
            if let Some(item) = self.recenter_item.take() {
                if let Some(target) = scroll_to_item(
                    layout,
                    item,
                    ScrollBehavior::Instant,
                    ScrollAlignment::Center,
                    self.viewport_extent,
                ) {
                    tracing::debug!(item, offset = target.offset, "recentering after mode switch");
                    self.scroll_offset = target.offset;
                    update.scroll_to = Some(target);
                    update.published = self.recompute_now(layout, now);
                }
            }
        }

        if self.settle.poll(now) && self.view_mode == ViewMode::Continuous {
            let fresh = self.compute(layout);
            self.reference = fresh.clone();
            if let Some(published) = self.commit(fresh, now) {
                update.published = Some(published);
            }
        }

        update
    }

    /// Forget everything for a new document
    pub fn reset(&mut self) {
        self.scroll_offset = 0.0;
        self.reference = VisibleSet::default();
        self.published = Arc::new(VisibleSet::default());
        self.last_commit = None;
        self.settle.cancel();
        self.recenter.cancel();
        self.recenter_item = None;
    }
}

impl Default for VisibilityTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute_layout, ItemDimensions, LayoutMode};
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn uniform(count: usize, height: f64, mode: LayoutMode) -> Layout {
        compute_layout(
            count,
            |_| Some(ItemDimensions::new(height, height)),
            mode,
            1.0,
            10.0,
            20.0,
        )
    }

    fn brute_force(layout: &Layout, scroll: f64, viewport: f64, buffer: f64) -> Vec<usize> {
        let (start, end) = visible_window(scroll, viewport, buffer);
        (1..=layout.item_count())
            .filter(|&i| {
                let leading = layout.leading(i).unwrap();
                let trailing = layout.trailing(i).unwrap();
                trailing > start && leading < end
            })
            .collect()
    }

    fn tracker_with_viewport(layout: &Layout, viewport: f64, now: Instant) -> VisibilityTracker {
        let mut tracker = VisibilityTracker::default();
        tracker.on_viewport_change(layout, viewport, now);
        tracker
    }

    #[test]
    fn test_window_around_5000() {
        assert_eq!(visible_window(5000.0, 800.0, 1.0), (4200.0, 6600.0));

        let heights = [700.0, 1500.0, 900.0, 400.0, 2500.0, 1200.0, 800.0, 600.0];
        let layout = compute_layout(
            heights.len(),
            |i| Some(ItemDimensions::new(500.0, heights[i - 1])),
            LayoutMode::Vertical,
            1.0,
            10.0,
            20.0,
        );
        let visible = compute_visible(&layout, 5000.0, 800.0, 1.0);

        for index in 1..=layout.item_count() {
            let rect = layout.rect(index).unwrap();
            let intersects = rect.top + rect.height > 4200.0 && rect.top < 6600.0;
            assert_eq!(visible.contains(index), intersects, "item {}", index);
        }
    }

    #[test]
    fn test_current_item_is_nearest_center() {
        let layout = uniform(20, 1000.0, LayoutMode::Vertical);
        // Viewport center at 5550, item 6 spans [5070, 6070)
        let visible = compute_visible(&layout, 5150.0, 800.0, 1.0);
        assert_eq!(visible.current_item(), Some(6));
    }

    #[test]
    fn test_past_end_has_current_but_no_items() {
        let layout = uniform(5, 100.0, LayoutMode::Vertical);
        let visible = compute_visible(&layout, 10_000.0, 100.0, 0.0);
        assert!(visible.is_empty());
        assert_eq!(visible.current_item(), Some(5));
    }

    #[test]
    fn test_empty_layout() {
        let layout = uniform(0, 100.0, LayoutMode::Vertical);
        assert_eq!(compute_visible(&layout, 0.0, 800.0, 1.0), VisibleSet::default());
    }

    #[test]
    fn test_around_clips_to_bounds() {
        assert_eq!(VisibleSet::around(2, 3, 10).indices(), &[1, 2, 3, 4, 5]);
        assert_eq!(VisibleSet::around(9, 3, 10).indices(), &[6, 7, 8, 9, 10]);
        assert_eq!(VisibleSet::around(40, 3, 10).current_item(), Some(10));
        assert!(VisibleSet::around(1, 3, 0).is_empty());
    }

    #[test]
    fn test_commit_same_set_is_noop() {
        let now = Instant::now();
        let mut tracker = VisibilityTracker::default();
        let set = VisibleSet::new(vec![3, 1, 2], Some(2));

        let first = tracker.commit(set.clone(), now).unwrap();
        assert!(tracker.commit(set, now + ms(10)).is_none());

        assert!(Arc::ptr_eq(&first, &tracker.published()));
        assert_eq!(tracker.commit_count(), 1);
    }

    #[test]
    fn test_first_scroll_publishes_immediately() {
        let now = Instant::now();
        let layout = uniform(200, 1000.0, LayoutMode::Vertical);
        let mut tracker = tracker_with_viewport(&layout, 800.0, now);

        let published = tracker.on_scroll(&layout, 50_000.0, now + ms(600)).unwrap();
        assert!(published.contains(50));
        assert!(!tracker.settle_pending());
    }

    #[test]
    fn test_scroll_within_cooldown_defers_to_settle() {
        let now = Instant::now();
        let layout = uniform(200, 1000.0, LayoutMode::Vertical);
        let mut tracker = tracker_with_viewport(&layout, 800.0, now);
        let initial = tracker.published();

        assert!(tracker.on_scroll(&layout, 20_000.0, now + ms(100)).is_none());
        assert!(tracker.reference().contains(20));
        assert!(Arc::ptr_eq(&initial, &tracker.published()));

        // Another tick restarts the window
        assert!(tracker.on_scroll(&layout, 21_000.0, now + ms(200)).is_none());
        assert!(tracker.poll(&layout, now + ms(300)).is_empty());

        let update = tracker.poll(&layout, now + ms(320));
        let published = update.published.unwrap();
        assert!(published.contains(21));
        assert_eq!(published.as_ref(), tracker.reference());
    }

    #[test]
    fn test_scroll_after_cooldown_publishes() {
        let now = Instant::now();
        let layout = uniform(200, 1000.0, LayoutMode::Vertical);
        let mut tracker = tracker_with_viewport(&layout, 800.0, now);

        assert!(tracker.on_scroll(&layout, 20_000.0, now + ms(500)).is_none());
        assert!(tracker.on_scroll(&layout, 30_000.0, now + ms(501)).is_some());
    }

    #[test]
    fn test_scroll_inside_buffer_waits_for_settle() {
        let now = Instant::now();
        let layout = uniform(200, 1000.0, LayoutMode::Vertical);
        let mut tracker = tracker_with_viewport(&layout, 800.0, now);
        tracker.on_scroll(&layout, 10_100.0, now + ms(600));
        let before = tracker.published();

        // Same (len, min, max): only the current item moves
        assert!(tracker.on_scroll(&layout, 10_150.0, now + ms(2_000)).is_none());
        assert!(tracker.settle_pending());
        assert!(Arc::ptr_eq(&before, &tracker.published()));

        tracker.poll(&layout, now + ms(2_120));
        assert!(!tracker.settle_pending());
        assert_eq!(tracker.published().indices(), before.indices());
    }

    #[test]
    fn test_mode_switch_seeds_and_recenters() {
        let now = Instant::now();
        let vertical = uniform(100, 1000.0, LayoutMode::Vertical);
        let mut tracker = tracker_with_viewport(&vertical, 800.0, now);
        tracker.on_scroll(&vertical, 40_000.0, now + ms(600));
        let current = tracker.published().current_item().unwrap();

        let horizontal = uniform(100, 1000.0, LayoutMode::Horizontal);
        let seeded = tracker.on_layout_mode_change(&horizontal, now + ms(700)).unwrap();
        let expected: Vec<usize> = (current - 3..=current + 3).collect();
        assert_eq!(seeded.indices(), expected.as_slice());
        assert_eq!(tracker.scroll_offset(), 0.0);
        assert!(tracker.recenter_pending());

        assert!(tracker.poll(&horizontal, now + ms(749)).scroll_to.is_none());

        let update = tracker.poll(&horizontal, now + ms(750));
        let target = update.scroll_to.unwrap();
        let expected = scroll_to_item(
            &horizontal,
            current,
            ScrollBehavior::Instant,
            ScrollAlignment::Center,
            800.0,
        )
        .unwrap();
        assert_eq!(target, expected);
        assert!(target.horizontal);
        assert_eq!(tracker.published().current_item(), Some(current));
    }

    #[test]
    fn test_single_page_mode_shows_one_item() {
        let now = Instant::now();
        let layout = uniform(10, 1000.0, LayoutMode::Vertical);
        let mut tracker = tracker_with_viewport(&layout, 800.0, now);

        let published = tracker.set_view_mode(ViewMode::SinglePage, 4, &layout, now).unwrap();
        assert_eq!(published.indices(), &[4]);
        assert!(tracker.on_scroll(&layout, 9_000.0, now + ms(1_000)).is_none());
        assert!(tracker.poll(&layout, now + ms(2_000)).is_empty());

        let published = tracker.set_view_mode(ViewMode::Continuous, 4, &layout, now + ms(2_000));
        assert!(published.unwrap().contains(9));
    }

    fn sized_layout() -> impl Strategy<Value = (Layout, f64)> {
        (
            prop::collection::vec(1.0f64..2000.0, 1..80),
            prop_oneof![Just(LayoutMode::Vertical), Just(LayoutMode::Horizontal)],
        )
            .prop_map(|(sizes, mode)| {
                let layout = compute_layout(
                    sizes.len(),
                    |i| Some(ItemDimensions::new(sizes[i - 1], sizes[i - 1])),
                    mode,
                    1.0,
                    10.0,
                    20.0,
                );
                let extent = layout.extent();
                (layout, extent)
            })
    }

    proptest! {
        #[test]
        fn prop_binary_search_matches_linear_scan(
            (layout, extent) in sized_layout(),
            position in 0.0f64..1.2,
            viewport in 1.0f64..2500.0,
            buffer in 0.0f64..2.0,
        ) {
            let scroll = extent * position;
            let visible = compute_visible(&layout, scroll, viewport, buffer);
            let expected = brute_force(&layout, scroll, viewport, buffer);
            prop_assert_eq!(visible.indices(), expected.as_slice());
        }

        #[test]
        fn prop_scroll_to_start_keeps_item_visible(
            (layout, _extent) in sized_layout(),
            pick in 0.0f64..1.0,
            viewport in 100.0f64..2500.0,
        ) {
            let count = layout.item_count();
            let index = ((count as f64 * pick) as usize).clamp(1, count);
            let target = scroll_to_item(
                &layout,
                index,
                ScrollBehavior::Instant,
                ScrollAlignment::Start,
                viewport,
            )
            .unwrap();

            let visible = compute_visible(&layout, target.offset, viewport, 1.0);
            prop_assert!(visible.contains(index));
        }
    }
}
