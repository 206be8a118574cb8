//! Persistent per-item surfaces
//!
//! Completed paints are blitted from a scratch raster onto the item's visible
//! surface in a single call, so a surface never shows a partially painted frame.

use crate::progressive::RenderQuality;
use crate::raster::Raster;
use std::collections::HashMap;

/// Destination for completed paints, owned by the mounting layer
pub trait ItemSurfaces {
    /// Replace the visible contents of item `index` with `source`
    fn blit(&mut self, index: usize, quality: RenderQuality, source: &Raster);
}

/// In-memory surface set
///
/// Keeps one raster per item plus the quality it was last blitted at.
#[derive(Debug, Default)]
pub struct SurfaceStore {
    surfaces: HashMap<usize, (RenderQuality, Raster)>,
    blit_count: u64,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self, index: usize) -> Option<&Raster> {
        self.surfaces.get(&index).map(|(_, raster)| raster)
    }

    pub fn quality(&self, index: usize) -> Option<RenderQuality> {
        self.surfaces.get(&index).map(|(quality, _)| *quality)
    }

    /// Drop the surface for an item that was unmounted
    pub fn unmount(&mut self, index: usize) -> bool {
        self.surfaces.remove(&index).is_some()
    }

    /// Total number of blits performed
    pub fn blit_count(&self) -> u64 {
        self.blit_count
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl ItemSurfaces for SurfaceStore {
    fn blit(&mut self, index: usize, quality: RenderQuality, source: &Raster) {
        let entry = self
            .surfaces
            .entry(index)
            .or_insert_with(|| (quality, Raster::default()));
        entry.0 = quality;
        entry.1.copy_from(source);
        self.blit_count += 1;
        tracing::trace!(index, ?quality, width = source.width(), height = source.height(), "blit");
    }
}
