//! Pagestream Render Library
//!
//! Raster buffers, item surfaces and the progressive (fast → quality)
//! rendered-state ledger shared by the scheduler and the mounting layer.

pub mod error;
pub mod progressive;
pub mod raster;
pub mod surface;

pub use error::{PaintError, PaintResult};
pub use progressive::{RenderLedger, RenderQuality, RenderedItem};
pub use raster::Raster;
pub use surface::{ItemSurfaces, SurfaceStore};
