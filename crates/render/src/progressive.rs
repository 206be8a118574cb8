//! Progressive item rendering state
//!
//! Items are painted in two stages:
//! 1. A fast pass at a low, zoom-dependent resolution for immediate feedback
//! 2. A quality pass at a fixed high resolution once input has settled
//!
//! `RenderLedger` records, per item, the best pass that has completed so the
//! mounting layer can decide whether to show a placeholder.

use std::collections::HashMap;

/// Render pass quality level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderQuality {
    /// Low-resolution pass, scales down with display zoom
    Fast,

    /// High-resolution upgrade pass
    Quality,
}

/// What an item was last painted at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedItem {
    pub quality: RenderQuality,

    /// Render scale (target pixels per natural unit) the item was painted at
    pub scale: f32,
}

impl RenderedItem {
    pub fn new(quality: RenderQuality, scale: f32) -> Self {
        Self { quality, scale }
    }

    /// Whether this item still needs the quality upgrade to reach `quality_scale`
    pub fn is_below(&self, quality_scale: f32) -> bool {
        self.scale < quality_scale
    }
}

/// Per-item rendered state
#[derive(Debug, Default)]
pub struct RenderLedger {
    items: HashMap<usize, RenderedItem>,
}

impl RenderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the rendered state of an item, `None` if never painted
    pub fn get(&self, index: usize) -> Option<RenderedItem> {
        self.items.get(&index).copied()
    }

    pub fn is_rendered(&self, index: usize) -> bool {
        self.items.contains_key(&index)
    }

    /// Record a completed paint
    pub fn record(&mut self, index: usize, rendered: RenderedItem) {
        self.items.insert(index, rendered);
    }

    /// Forget an item so the next fast pass picks it up again
    pub fn forget(&mut self, index: usize) -> Option<RenderedItem> {
        self.items.remove(&index)
    }

    /// Clear all state
    ///
    /// Used when switching documents.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of items tracked
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
