//! Paint collaborator contract
//!
//! The scheduler never draws anything itself. For each task it asks a
//! [`Painter`] to begin an operation, then drives that operation from its own
//! pump loop until it reports completion. Operations are cooperative: they may
//! return [`PaintPoll::Pending`] any number of times while the underlying
//! decode/paint primitive is still working, and are simply never polled again
//! once cancelled.

use crate::cancel::CancellationToken;
use pagestream_render::{PaintResult, Raster, RenderQuality};

/// Parameters for one paint operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintRequest {
    /// Item index (1-based)
    pub index: usize,

    pub quality: RenderQuality,

    /// Target pixels per natural unit
    pub scale: f32,

    /// Target raster width in pixels
    pub width: u32,

    /// Target raster height in pixels
    pub height: u32,

    /// Scheduling invocation that started this task
    pub generation: u64,
}

/// Progress of a paint operation
#[derive(Debug, Clone, PartialEq)]
pub enum PaintPoll {
    /// Still working, poll again later
    Pending,

    /// Finished, successfully or not
    Ready(PaintResult<()>),
}

/// An in-flight paint into a scratch raster
pub trait PaintOperation {
    /// Advance the operation, drawing into `target`
    ///
    /// `target` is the same scratch raster on every call for one operation.
    fn poll(&mut self, target: &mut Raster) -> PaintPoll;
}

impl<F> PaintOperation for F
where
    F: FnMut(&mut Raster) -> PaintPoll,
{
    fn poll(&mut self, target: &mut Raster) -> PaintPoll {
        self(target)
    }
}

/// Source of paint operations
pub trait Painter {
    /// Start painting `request.index`
    ///
    /// The operation should check `token` at its suspension points and finish
    /// with `PaintError::Cancelled` once it is set.
    fn begin_paint(
        &mut self,
        request: &PaintRequest,
        token: CancellationToken,
    ) -> Box<dyn PaintOperation>;
}
