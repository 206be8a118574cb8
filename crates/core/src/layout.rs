//! Layout engine
//!
//! Turns per-item natural dimensions into scaled item rectangles stacked along
//! one axis. A [`Layout`] is an immutable snapshot: any change to the item
//! count, scale, mode or a single dimension produces a new one.

use serde::{Deserialize, Serialize};

/// Gap between consecutive items, in natural units
pub const DEFAULT_GAP_UNIT: f64 = 10.0;

/// Padding around the stacked items, in natural units
pub const DEFAULT_PADDING_UNIT: f64 = 20.0;

/// Placeholder used before any item has been measured (US Letter in points)
pub const FALLBACK_DIMENSIONS: ItemDimensions = ItemDimensions { width: 612.0, height: 792.0 };

/// Smallest scale the fit helpers return
pub const MIN_FIT_SCALE: f64 = 0.1;

/// Largest scale the fit helpers return
pub const MAX_FIT_SCALE: f64 = 16.0;

/// Natural (unscaled) item size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemDimensions {
    pub width: f64,
    pub height: f64,
}

impl ItemDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Finite and strictly positive on both axes
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Stacking axis selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Top to bottom
    #[default]
    Vertical,

    /// Left to right
    Horizontal,

    /// Left to right, regardless of the viewing orientation
    SingleRow,
}

impl LayoutMode {
    pub fn is_horizontal(self) -> bool {
        matches!(self, LayoutMode::Horizontal | LayoutMode::SingleRow)
    }
}

impl std::str::FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertical" => Ok(LayoutMode::Vertical),
            "horizontal" => Ok(LayoutMode::Horizontal),
            "single_row" | "single-row" | "singlerow" => Ok(LayoutMode::SingleRow),
            other => Err(format!("unknown layout mode: {}", other)),
        }
    }
}

/// Item rectangle in scaled pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl ItemRect {
    /// Edge facing the start of the stacking axis
    pub fn leading(&self, horizontal: bool) -> f64 {
        if horizontal {
            self.left
        } else {
            self.top
        }
    }

    /// Extent along the stacking axis
    pub fn size(&self, horizontal: bool) -> f64 {
        if horizontal {
            self.width
        } else {
            self.height
        }
    }

    pub fn trailing(&self, horizontal: bool) -> f64 {
        self.leading(horizontal) + self.size(horizontal)
    }

    pub fn midpoint(&self, horizontal: bool) -> f64 {
        self.leading(horizontal) + self.size(horizontal) / 2.0
    }
}

/// Immutable layout snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// 1-indexed item rectangles; slot 0 is always `None`
    pub positions: Vec<Option<ItemRect>>,
    pub total_height: f64,
    pub total_width: f64,
    pub gap: f64,
    pub padding: f64,
    pub is_horizontal: bool,
    pub scale: f64,
    pub mode: LayoutMode,
}

impl Layout {
    /// Layout with no items
    pub fn empty(mode: LayoutMode) -> Self {
        compute_layout(0, |_| None, mode, 1.0, DEFAULT_GAP_UNIT, DEFAULT_PADDING_UNIT)
    }

    pub fn item_count(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }

    pub fn rect(&self, index: usize) -> Option<&ItemRect> {
        self.positions.get(index).and_then(Option::as_ref)
    }

    /// Total size along the stacking axis
    pub fn extent(&self) -> f64 {
        if self.is_horizontal {
            self.total_width
        } else {
            self.total_height
        }
    }

    /// Total size across the stacking axis
    pub fn cross_extent(&self) -> f64 {
        if self.is_horizontal {
            self.total_height
        } else {
            self.total_width
        }
    }

    pub fn leading(&self, index: usize) -> Option<f64> {
        self.rect(index).map(|r| r.leading(self.is_horizontal))
    }

    pub fn trailing(&self, index: usize) -> Option<f64> {
        self.rect(index).map(|r| r.trailing(self.is_horizontal))
    }

    pub fn midpoint(&self, index: usize) -> Option<f64> {
        self.rect(index).map(|r| r.midpoint(self.is_horizontal))
    }

    /// Natural dimensions an item was laid out with
    pub fn natural_dimensions(&self, index: usize) -> Option<ItemDimensions> {
        self.rect(index)
            .map(|r| ItemDimensions::new(r.width / self.scale, r.height / self.scale))
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

fn sanitize_unit(unit: f64) -> f64 {
    if unit.is_finite() && unit > 0.0 {
        unit
    } else {
        0.0
    }
}

/// Compute item positions
///
/// `lookup` is called once per index in `1..=item_count`. Missing or invalid
/// dimensions are replaced by the last valid dimensions seen, or
/// [`FALLBACK_DIMENSIONS`] before the first one, so this never fails.
///
/// # Example
///
/// ```
/// use pagestream_core::{compute_layout, ItemDimensions, LayoutMode};
///
/// let layout = compute_layout(
///     3,
///     |_| Some(ItemDimensions::new(600.0, 800.0)),
///     LayoutMode::Vertical,
///     1.0,
///     10.0,
///     20.0,
/// );
///
/// assert_eq!(layout.rect(2).map(|r| r.top), Some(830.0));
/// assert_eq!(layout.total_height, 20.0 + 3.0 * 800.0 + 2.0 * 10.0 + 20.0);
/// ```
pub fn compute_layout<F>(
    item_count: usize,
    mut lookup: F,
    mode: LayoutMode,
    scale: f64,
    gap_unit: f64,
    padding_unit: f64,
) -> Layout
where
    F: FnMut(usize) -> Option<ItemDimensions>,
{
    let scale = sanitize_scale(scale);
    let gap = sanitize_unit(gap_unit) * scale;
    let padding = sanitize_unit(padding_unit) * scale;
    let horizontal = mode.is_horizontal();

    let mut placeholder = FALLBACK_DIMENSIONS;
    let sizes: Vec<(f64, f64)> = (1..=item_count)
        .map(|index| {
            let dims = match lookup(index) {
                Some(dims) if dims.is_valid() => {
                    placeholder = dims;
                    dims
                }
                _ => placeholder,
            };
            (dims.width * scale, dims.height * scale)
        })
        .collect();

    // Cross-axis size of the widest (vertical) or tallest (horizontal) item
    let cross_max = sizes
        .iter()
        .map(|&(w, h)| if horizontal { h } else { w })
        .fold(0.0_f64, f64::max);

    let mut positions = Vec::with_capacity(item_count + 1);
    positions.push(None);

    let mut cursor = padding;
    let mut last_trailing = padding;
    for &(width, height) in &sizes {
        let rect = if horizontal {
            ItemRect { top: padding + (cross_max - height) / 2.0, left: cursor, width, height }
        } else {
            ItemRect { top: cursor, left: padding + (cross_max - width) / 2.0, width, height }
        };
        last_trailing = rect.trailing(horizontal);
        cursor = last_trailing + gap;
        positions.push(Some(rect));
    }

    let along = last_trailing + padding;
    let across = cross_max + 2.0 * padding;
    let (total_width, total_height) = if horizontal { (along, across) } else { (across, along) };

    Layout {
        positions,
        total_height,
        total_width,
        gap,
        padding,
        is_horizontal: horizontal,
        scale,
        mode,
    }
}

/// How the scroll surface should move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    #[default]
    Instant,
    Smooth,
}

/// Which part of the item lines up with the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollAlignment {
    /// Item centered in the viewport
    Center,

    /// Leading edge minus the layout padding
    Start,

    /// Leading edge exactly
    #[default]
    Exact,
}

/// Computed scroll destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTarget {
    /// Offset along the stacking axis, never negative
    pub offset: f64,
    pub horizontal: bool,
    pub behavior: ScrollBehavior,
}

/// Scroll offset that brings `index` into view
///
/// Pure calculation; the owner of the scroll surface applies it. Returns
/// `None` when the item has no position.
pub fn scroll_to_item(
    layout: &Layout,
    index: usize,
    behavior: ScrollBehavior,
    alignment: ScrollAlignment,
    viewport_extent: f64,
) -> Option<ScrollTarget> {
    let rect = layout.rect(index)?;
    let horizontal = layout.is_horizontal;
    let leading = rect.leading(horizontal);
    let viewport = if viewport_extent.is_finite() { viewport_extent.max(0.0) } else { 0.0 };

    let offset = match alignment {
        ScrollAlignment::Center => leading - viewport / 2.0 + rect.size(horizontal) / 2.0,
        ScrollAlignment::Start => leading - layout.padding,
        ScrollAlignment::Exact => leading,
    };

    Some(ScrollTarget { offset: offset.max(0.0), horizontal, behavior })
}

/// Scale at which an item's width fills the viewport width
pub fn fit_width_scale(viewport_width: f64, item: ItemDimensions) -> f64 {
    if !(viewport_width.is_finite() && viewport_width > 0.0) || !item.is_valid() {
        return 1.0;
    }

    (viewport_width / item.width).clamp(MIN_FIT_SCALE, MAX_FIT_SCALE)
}

/// Scale at which a whole item fits inside the viewport
pub fn fit_page_scale(viewport_width: f64, viewport_height: f64, item: ItemDimensions) -> f64 {
    let viewport = ItemDimensions::new(viewport_width, viewport_height);
    if !viewport.is_valid() || !item.is_valid() {
        return 1.0;
    }

    let width = viewport_width / item.width;
    let height = viewport_height / item.height;
    width.min(height).clamp(MIN_FIT_SCALE, MAX_FIT_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uniform(count: usize, width: f64, height: f64, mode: LayoutMode, scale: f64) -> Layout {
        compute_layout(
            count,
            |_| Some(ItemDimensions::new(width, height)),
            mode,
            scale,
            DEFAULT_GAP_UNIT,
            DEFAULT_PADDING_UNIT,
        )
    }

    #[test]
    fn test_item_ten_top_and_center_scroll() {
        let layout = uniform(50, 700.0, 1000.0, LayoutMode::Vertical, 1.0);

        assert_eq!(layout.rect(10).map(|r| r.top), Some(9110.0));

        let target = scroll_to_item(
            &layout,
            10,
            ScrollBehavior::Instant,
            ScrollAlignment::Center,
            800.0,
        )
        .unwrap();
        assert_eq!(target.offset, 9210.0);
        assert!(!target.horizontal);
    }

    #[test]
    fn test_slot_zero_unused() {
        let layout = uniform(3, 100.0, 100.0, LayoutMode::Vertical, 1.0);
        assert_eq!(layout.positions.len(), 4);
        assert!(layout.positions[0].is_none());
        assert!(layout.rect(0).is_none());
        assert!(layout.rect(4).is_none());
        assert_eq!(layout.item_count(), 3);
    }

    #[test]
    fn test_vertical_centers_against_widest() {
        let widths = [400.0, 800.0, 600.0];
        let layout = compute_layout(
            3,
            |i| Some(ItemDimensions::new(widths[i - 1], 500.0)),
            LayoutMode::Vertical,
            1.0,
            DEFAULT_GAP_UNIT,
            DEFAULT_PADDING_UNIT,
        );

        assert_eq!(layout.rect(1).unwrap().left, 20.0 + 200.0);
        assert_eq!(layout.rect(2).unwrap().left, 20.0);
        assert_eq!(layout.rect(3).unwrap().left, 20.0 + 100.0);
        assert_eq!(layout.total_width, 800.0 + 40.0);
    }

    #[test]
    fn test_single_row_stacks_horizontally() {
        let layout = uniform(4, 300.0, 400.0, LayoutMode::SingleRow, 2.0);

        assert!(layout.is_horizontal);
        assert_eq!(layout.gap, 20.0);
        assert_eq!(layout.padding, 40.0);
        assert_eq!(layout.rect(2).unwrap().left, 40.0 + 600.0 + 20.0);
        assert_eq!(layout.rect(2).unwrap().top, 40.0);
        assert_eq!(layout.total_height, 800.0 + 80.0);
    }

    #[test]
    fn test_missing_dimensions_use_last_known() {
        let layout = compute_layout(
            4,
            |i| match i {
                2 => Some(ItemDimensions::new(500.0, 700.0)),
                4 => Some(ItemDimensions::new(f64::NAN, 10.0)),
                _ => None,
            },
            LayoutMode::Vertical,
            1.0,
            DEFAULT_GAP_UNIT,
            DEFAULT_PADDING_UNIT,
        );

        assert_eq!(layout.natural_dimensions(1), Some(FALLBACK_DIMENSIONS));
        assert_eq!(layout.natural_dimensions(3), Some(ItemDimensions::new(500.0, 700.0)));
        assert_eq!(layout.natural_dimensions(4), Some(ItemDimensions::new(500.0, 700.0)));
    }

    #[test]
    fn test_invalid_scale_falls_back() {
        let layout = uniform(2, 100.0, 100.0, LayoutMode::Vertical, f64::NAN);
        assert_eq!(layout.scale, 1.0);

        let layout = uniform(2, 100.0, 100.0, LayoutMode::Vertical, -3.0);
        assert_eq!(layout.gap, DEFAULT_GAP_UNIT);
    }

    #[test]
    fn test_empty_layout() {
        let layout = Layout::empty(LayoutMode::Vertical);
        assert_eq!(layout.item_count(), 0);
        assert_eq!(layout.total_height, 2.0 * DEFAULT_PADDING_UNIT);
    }

    #[test]
    fn test_scroll_alignments() {
        let layout = uniform(5, 100.0, 1000.0, LayoutMode::Vertical, 1.0);

        let at = |index, alignment| {
            scroll_to_item(&layout, index, ScrollBehavior::Smooth, alignment, 800.0)
                .map(|t| t.offset)
        };

        assert_eq!(at(3, ScrollAlignment::Exact), Some(2040.0));
        assert_eq!(at(3, ScrollAlignment::Start), Some(2020.0));
        assert_eq!(at(1, ScrollAlignment::Start), Some(0.0));
        assert_eq!(at(9, ScrollAlignment::Exact), None);
    }

    #[test]
    fn test_center_clamps_to_zero() {
        let layout = uniform(2, 100.0, 100.0, LayoutMode::Vertical, 1.0);
        let target = scroll_to_item(
            &layout,
            1,
            ScrollBehavior::Instant,
            ScrollAlignment::Center,
            2000.0,
        );
        assert_eq!(target.map(|t| t.offset), Some(0.0));
    }

    #[test]
    fn test_fit_helpers() {
        let letter = ItemDimensions::new(612.0, 792.0);
        assert_eq!(fit_width_scale(1224.0, letter), 2.0);
        assert_eq!(fit_width_scale(1_000_000.0, letter), MAX_FIT_SCALE);
        assert_eq!(fit_width_scale(0.0, letter), 1.0);

        assert_eq!(fit_page_scale(1224.0, 792.0, letter), 1.0);
        assert_eq!(fit_page_scale(10.0, 10.0, letter), MIN_FIT_SCALE);
        assert_eq!(fit_page_scale(100.0, 100.0, ItemDimensions::new(0.0, 1.0)), 1.0);
    }

    #[test]
    fn test_layout_mode_parsing() {
        assert_eq!("vertical".parse::<LayoutMode>(), Ok(LayoutMode::Vertical));
        assert_eq!("Single_Row".parse::<LayoutMode>(), Ok(LayoutMode::SingleRow));
        assert!("diagonal".parse::<LayoutMode>().is_err());
    }

    fn mode_strategy() -> impl Strategy<Value = LayoutMode> {
        prop_oneof![
            Just(LayoutMode::Vertical),
            Just(LayoutMode::Horizontal),
            Just(LayoutMode::SingleRow),
        ]
    }

    proptest! {
        #[test]
        fn prop_consecutive_items_are_one_gap_apart(
            dims in prop::collection::vec((1.0f64..3000.0, 1.0f64..3000.0), 0..60),
            mode in mode_strategy(),
            scale in 0.1f64..8.0,
        ) {
            let layout = compute_layout(
                dims.len(),
                |i| Some(ItemDimensions::new(dims[i - 1].0, dims[i - 1].1)),
                mode,
                scale,
                DEFAULT_GAP_UNIT,
                DEFAULT_PADDING_UNIT,
            );
            let horizontal = layout.is_horizontal;
            let tolerance = 1e-6 * layout.extent().max(1.0);

            for index in 1..dims.len() {
                let current = layout.rect(index).unwrap();
                let next = layout.rect(index + 1).unwrap();
                let gap = next.leading(horizontal) - current.trailing(horizontal);
                prop_assert!((gap - layout.gap).abs() <= tolerance);
            }

            if let Some(last) = layout.rect(dims.len()) {
                let expected = last.trailing(horizontal) + layout.padding;
                prop_assert!((layout.extent() - expected).abs() <= tolerance);
            }
        }

        #[test]
        fn prop_cross_axis_fits_inside_padding(
            dims in prop::collection::vec((1.0f64..3000.0, 1.0f64..3000.0), 1..40),
            mode in mode_strategy(),
        ) {
            let layout = compute_layout(
                dims.len(),
                |i| Some(ItemDimensions::new(dims[i - 1].0, dims[i - 1].1)),
                mode,
                1.0,
                DEFAULT_GAP_UNIT,
                DEFAULT_PADDING_UNIT,
            );

            for rect in layout.positions.iter().flatten() {
                let (start, size) = if layout.is_horizontal {
                    (rect.top, rect.height)
                } else {
                    (rect.left, rect.width)
                };
                prop_assert!(start >= layout.padding - 1e-9);
                prop_assert!(start + size <= layout.cross_extent() - layout.padding + 1e-6);
            }
        }
    }
}
