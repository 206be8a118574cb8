//! Progressive render scheduler
//!
//! Drives paint operations for the published visible set in two passes:
//!
//! 1. **Fast pass**: every visible item that has never been painted is
//!    rendered at a low resolution that shrinks with the display zoom.
//! 2. **Quality pass**: once input has been quiet for the upgrade delay,
//!    visible items below the quality resolution are repainted at full scale.
//!
//! Each scheduling invocation bumps a generation counter and captures it.
//! Work runs in concurrency-limited batches; before each batch the run checks
//! that its generation is still current and silently bails out otherwise, so
//! a jump from item 2 to item 30 never waits on items 3 to 29.
//!
//! Everything executes on one logical thread. Paint operations are polled from
//! [`ProgressiveRenderScheduler::pump`], which also fires the quality timer.

use crate::cancel::CancellationToken;
use crate::painter::{PaintOperation, PaintPoll, PaintRequest, Painter};
use crate::priority::{RenderCandidate, WorkList};
use crate::timer::{Debounce, QUALITY_UPGRADE_DELAY, SETTLE_WINDOW};
use pagestream_cache::{CanvasPool, DEFAULT_CANVAS_POOL_SIZE};
use pagestream_render::{
    ItemSurfaces, PaintError, Raster, RenderLedger, RenderQuality, RenderedItem,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Lowest render scale the fast pass will use
pub const FAST_SCALE_FLOOR: f32 = 0.25;

/// Display zoom below which the fast pass uses larger batches
pub const LOW_ZOOM_THRESHOLD: f32 = 0.5;

/// Fast batch multiplier applied below [`LOW_ZOOM_THRESHOLD`]
pub const LOW_ZOOM_BATCH_MULTIPLIER: usize = 2;

/// Longest raster edge the scheduler will request
pub const MAX_RENDER_EDGE_PX: f32 = 8192.0;

/// Scheduler tunables
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Fast-pass render scale at display zoom 1.0 (also its ceiling)
    pub fast_scale: f32,

    /// Fixed quality-pass render scale
    pub quality_scale: f32,

    /// Fast-pass batch size
    pub concurrency_cap_fast: usize,

    /// Quality-pass batch size
    pub concurrency_cap_quality: usize,

    /// Scroll activity within this window blocks the quality upgrade
    pub settle_window: Duration,

    /// Quiet period after a fast pass before upgrading
    pub quality_upgrade_delay: Duration,

    /// Scratch rasters kept for reuse
    pub canvas_pool_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fast_scale: 1.0,
            quality_scale: 2.0,
            concurrency_cap_fast: 4,
            concurrency_cap_quality: 2,
            settle_window: SETTLE_WINDOW,
            quality_upgrade_delay: QUALITY_UPGRADE_DELAY,
            canvas_pool_size: DEFAULT_CANVAS_POOL_SIZE,
        }
    }
}

/// Scheduler statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Paint operations started
    pub tasks_started: u64,

    /// Paint operations completed and blitted
    pub tasks_completed: u64,

    /// Paint operations cancelled (superseded or no longer visible)
    pub tasks_cancelled: u64,

    /// Paint operations that failed
    pub tasks_failed: u64,

    /// Tasks skipped for invalid geometry
    pub tasks_skipped: u64,

    /// Scheduling invocations that produced work
    pub runs_started: u64,

    /// Runs that bailed out on a stale generation
    pub runs_abandoned: u64,

    /// Highest simultaneous in-flight count observed
    pub peak_inflight: usize,
}

impl SchedulerStats {
    /// Tasks started but not yet resolved
    pub fn pending_tasks(&self) -> u64 {
        self.tasks_started - self.tasks_completed - self.tasks_cancelled - self.tasks_failed
    }
}

/// Notifications produced by [`ProgressiveRenderScheduler::pump`]
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A run finished every batch while its generation was still current
    PassCommitted { quality: RenderQuality, generation: u64, painted: usize },

    /// A paint failed with something other than cancellation
    PaintFailed { index: usize, error: PaintError },
}

/// Monotonic scheduling generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationCounter(u64);

impl GenerationCounter {
    /// Advance and return the new generation
    pub fn bump(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn current(&self) -> u64 {
        self.0
    }

    /// Whether a run that captured `generation` may keep going
    pub fn is_current(&self, generation: u64) -> bool {
        self.0 == generation
    }
}

struct InflightTask {
    quality: RenderQuality,
    /// Pass scale, recorded in the ledger even when the raster was capped
    scale: f32,
    generation: u64,
    token: CancellationToken,
    operation: Box<dyn PaintOperation>,
    scratch: Raster,
}

struct RenderRun {
    generation: u64,
    quality: RenderQuality,
    scale: f32,
    batch_size: usize,
    work: WorkList,
    painted: usize,
}

enum TaskOutcome {
    Painted,
    Cancelled,
    Failed(PaintError),
}

/// Progressive render scheduler
///
/// # Example
///
/// ```
/// use pagestream_render::{PaintError, Raster, SurfaceStore};
/// use pagestream_scheduler::{
///     CancellationToken, PaintOperation, PaintPoll, PaintRequest, Painter,
///     ProgressiveRenderScheduler, RenderCandidate, SchedulerConfig,
/// };
/// use std::time::Instant;
///
/// struct White;
///
/// impl Painter for White {
///     fn begin_paint(&mut self, _req: &PaintRequest, token: CancellationToken) -> Box<dyn PaintOperation> {
///         Box::new(move |target: &mut Raster| {
///             if token.is_cancelled() {
///                 return PaintPoll::Ready(Err(PaintError::Cancelled));
///             }
///             target.fill([255; 4]);
///             PaintPoll::Ready(Ok(()))
///         })
///     }
/// }
///
/// let now = Instant::now();
/// let mut scheduler = ProgressiveRenderScheduler::new(SchedulerConfig::default());
/// let mut surfaces = SurfaceStore::new();
///
/// scheduler.set_visible(vec![RenderCandidate::new(1, 100.0, 100.0, 0.0)], 1.0, now);
/// scheduler.pump(now, &mut White, &mut surfaces); // starts the fast batch
/// scheduler.pump(now, &mut White, &mut surfaces); // completes it
///
/// assert!(scheduler.rendered(1).is_some());
/// assert_eq!(surfaces.blit_count(), 1);
/// ```
pub struct ProgressiveRenderScheduler {
    config: SchedulerConfig,
    generation: GenerationCounter,
    pool: CanvasPool,
    ledger: RenderLedger,
    inflight: HashMap<usize, InflightTask>,
    runs: VecDeque<RenderRun>,
    candidates: Vec<RenderCandidate>,
    visible: HashSet<usize>,
    display_zoom: f32,
    quality_timer: Debounce,
    last_scroll_activity: Option<Instant>,
    zoom_in_progress: bool,
    stats: SchedulerStats,
}

impl ProgressiveRenderScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            pool: CanvasPool::new(config.canvas_pool_size),
            quality_timer: Debounce::new(config.quality_upgrade_delay),
            config,
            generation: GenerationCounter::default(),
            ledger: RenderLedger::new(),
            inflight: HashMap::new(),
            runs: VecDeque::new(),
            candidates: Vec::new(),
            visible: HashSet::new(),
            display_zoom: 1.0,
            last_scroll_activity: None,
            zoom_in_progress: false,
            stats: SchedulerStats::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Current generation counter value
    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn pool(&self) -> &CanvasPool {
        &self.pool
    }

    /// What `index` was last painted at, `None` if never
    pub fn rendered(&self, index: usize) -> Option<RenderedItem> {
        self.ledger.get(index)
    }

    pub fn is_inflight(&self, index: usize) -> bool {
        self.inflight.contains_key(&index)
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Whether the quality upgrade timer is waiting to fire
    pub fn quality_upgrade_pending(&self) -> bool {
        self.quality_timer.is_armed()
    }

    /// Render scale the fast pass uses at the current display zoom
    pub fn fast_render_scale(&self) -> f32 {
        let ceiling = self.config.fast_scale;
        let floor = FAST_SCALE_FLOOR.min(ceiling);
        let zoom = if self.display_zoom.is_finite() && self.display_zoom > 0.0 {
            self.display_zoom
        } else {
            1.0
        };
        (ceiling * zoom).clamp(floor, ceiling)
    }

    /// Batch size for a pass at the current display zoom
    pub fn batch_size(&self, quality: RenderQuality) -> usize {
        let size = match quality {
            RenderQuality::Fast if self.display_zoom < LOW_ZOOM_THRESHOLD => {
                self.config.concurrency_cap_fast.saturating_mul(LOW_ZOOM_BATCH_MULTIPLIER)
            }
            RenderQuality::Fast => self.config.concurrency_cap_fast,
            RenderQuality::Quality => self.config.concurrency_cap_quality,
        };
        size.max(1)
    }

    /// Accept a newly published visible set
    ///
    /// Cancels in-flight tasks for items that left the set, then schedules a
    /// fast pass for the rest.
    #[tracing::instrument(level = "debug", skip(self, candidates), fields(count = candidates.len()))]
    pub fn set_visible(&mut self, candidates: Vec<RenderCandidate>, display_zoom: f32, now: Instant) -> u64 {
        self.visible = candidates.iter().map(|c| c.index).collect();
        self.candidates = candidates;
        if (display_zoom - self.display_zoom).abs() > f32::EPSILON {
            self.note_zoom_activity(now);
        }
        self.display_zoom = display_zoom;

        let gone: Vec<usize> = self
            .inflight
            .keys()
            .copied()
            .filter(|index| !self.visible.contains(index))
            .collect();
        for index in gone {
            self.cancel_task(index);
        }

        self.schedule_fast_pass(now)
    }

    /// Replace candidate distances without scheduling
    ///
    /// Used when the viewport moved but the published set did not change.
    pub fn refresh_priorities(&mut self, candidates: Vec<RenderCandidate>) {
        self.candidates = candidates
            .into_iter()
            .filter(|c| self.visible.contains(&c.index))
            .collect();
    }

    /// Record scroll input; restarts a pending quality upgrade
    pub fn note_scroll_activity(&mut self, now: Instant) {
        self.last_scroll_activity = Some(now);
        self.quality_timer.rearm_if_armed(now);
    }

    /// Record zoom input; restarts a pending quality upgrade
    pub fn note_zoom_activity(&mut self, now: Instant) {
        self.last_scroll_activity = Some(now);
        self.quality_timer.rearm_if_armed(now);
    }

    /// Mark a zoom gesture as in progress; the quality pass waits for it to end
    pub fn set_zoom_in_progress(&mut self, in_progress: bool, now: Instant) {
        self.zoom_in_progress = in_progress;
        self.quality_timer.rearm_if_armed(now);
    }

    fn input_active(&self, now: Instant) -> bool {
        self.zoom_in_progress
            || self
                .last_scroll_activity
                .is_some_and(|at| now.saturating_duration_since(at) < self.config.settle_window)
    }

    /// Schedule a fast pass over visible items that were never painted
    pub fn schedule_fast_pass(&mut self, now: Instant) -> u64 {
        let work: Vec<RenderCandidate> = self
            .candidates
            .iter()
            .filter(|c| !self.ledger.is_rendered(c.index) && !self.inflight.contains_key(&c.index))
            .copied()
            .collect();
        self.schedule(RenderQuality::Fast, work, now)
    }

    /// Schedule a quality pass over visible items below the quality scale
    ///
    /// Items never painted count as below quality, which also retries earlier
    /// failures.
    pub fn schedule_quality_pass(&mut self, now: Instant) -> u64 {
        let quality_scale = self.config.quality_scale;
        let work: Vec<RenderCandidate> = self
            .candidates
            .iter()
            .filter(|c| {
                !self.inflight.contains_key(&c.index)
                    && self.ledger.get(c.index).map_or(true, |r| r.is_below(quality_scale))
            })
            .copied()
            .collect();
        self.schedule(RenderQuality::Quality, work, now)
    }

    fn schedule(&mut self, quality: RenderQuality, work: Vec<RenderCandidate>, now: Instant) -> u64 {
        let generation = self.generation.bump();
        let scale = match quality {
            RenderQuality::Fast => self.fast_render_scale(),
            RenderQuality::Quality => self.config.quality_scale,
        };

        if work.is_empty() {
            tracing::trace!(generation, ?quality, "nothing to paint");
            if quality == RenderQuality::Fast {
                // Upgrades must not starve when everything is already painted.
                self.quality_timer.arm(now);
            }
            return generation;
        }

        tracing::debug!(generation, ?quality, scale, items = work.len(), "scheduling pass");
        self.stats.runs_started += 1;
        self.runs.push_back(RenderRun {
            generation,
            quality,
            scale,
            batch_size: self.batch_size(quality),
            work: WorkList::from_candidates(work),
            painted: 0,
        });
        generation
    }

    /// Forget an item's painted state and repaint it
    ///
    /// Any in-flight task for the item is cancelled first, so at most one
    /// paint for it ever reaches its surface.
    pub fn invalidate_item(&mut self, index: usize, now: Instant) {
        self.ledger.forget(index);
        if self.inflight.contains_key(&index) {
            self.cancel_task(index);
        }
        if self.visible.contains(&index) {
            self.schedule_fast_pass(now);
        }
    }

    /// Drop all state for a new source document
    pub fn reset(&mut self) {
        let indices: Vec<usize> = self.inflight.keys().copied().collect();
        for index in indices {
            self.cancel_task(index);
        }
        self.generation.bump();
        self.runs.clear();
        self.ledger.clear();
        self.pool.clear();
        self.candidates.clear();
        self.visible.clear();
        self.quality_timer.cancel();
        self.last_scroll_activity = None;
        self.zoom_in_progress = false;
    }

    fn cancel_task(&mut self, index: usize) {
        if let Some(task) = self.inflight.remove(&index) {
            task.token.cancel();
            self.pool.release(task.scratch);
            self.stats.tasks_cancelled += 1;
            tracing::trace!(index, generation = task.generation, "cancelled paint");
        }
    }

    /// Advance the scheduler to `now`
    ///
    /// Polls in-flight operations, blits completed ones, fires the quality
    /// timer and starts the next batch when the previous one has drained.
    pub fn pump<P, S>(&mut self, now: Instant, painter: &mut P, surfaces: &mut S) -> Vec<SchedulerEvent>
    where
        P: Painter + ?Sized,
        S: ItemSurfaces + ?Sized,
    {
        let mut events = Vec::new();
        self.poll_inflight(surfaces, &mut events);

        if self.quality_timer.poll(now) {
            if self.input_active(now) {
                self.quality_timer.arm(now);
            } else {
                self.schedule_quality_pass(now);
            }
        }

        self.advance_runs(now, painter, &mut events);
        events
    }

    fn poll_inflight<S>(&mut self, surfaces: &mut S, events: &mut Vec<SchedulerEvent>)
    where
        S: ItemSurfaces + ?Sized,
    {
        let mut finished = Vec::new();
        for (&index, task) in self.inflight.iter_mut() {
            if task.token.is_cancelled() {
                finished.push((index, TaskOutcome::Cancelled));
                continue;
            }
            match task.operation.poll(&mut task.scratch) {
                PaintPoll::Pending => {}
                PaintPoll::Ready(Ok(())) if task.token.is_cancelled() => {
                    finished.push((index, TaskOutcome::Cancelled));
                }
                PaintPoll::Ready(Ok(())) => finished.push((index, TaskOutcome::Painted)),
                PaintPoll::Ready(Err(err)) if err.is_cancelled() => {
                    finished.push((index, TaskOutcome::Cancelled));
                }
                PaintPoll::Ready(Err(err)) => finished.push((index, TaskOutcome::Failed(err))),
            }
        }

        for (index, outcome) in finished {
            let Some(task) = self.inflight.remove(&index) else {
                continue;
            };
            match outcome {
                TaskOutcome::Painted => {
                    surfaces.blit(index, task.quality, &task.scratch);
                    self.ledger.record(index, RenderedItem::new(task.quality, task.scale));
                    self.stats.tasks_completed += 1;
                    if let Some(run) = self.runs.iter_mut().find(|r| r.generation == task.generation) {
                        run.painted += 1;
                    }
                }
                TaskOutcome::Cancelled => {
                    self.stats.tasks_cancelled += 1;
                }
                TaskOutcome::Failed(error) => {
                    tracing::warn!(index, quality = ?task.quality, %error, "paint failed");
                    self.stats.tasks_failed += 1;
                    events.push(SchedulerEvent::PaintFailed { index, error });
                }
            }
            self.pool.release(task.scratch);
        }
    }

    fn advance_runs<P>(&mut self, now: Instant, painter: &mut P, events: &mut Vec<SchedulerEvent>)
    where
        P: Painter + ?Sized,
    {
        loop {
            // Each batch is fully awaited before the next one starts.
            if !self.inflight.is_empty() {
                return;
            }
            let Some(run) = self.runs.front() else {
                return;
            };

            if !self.generation.is_current(run.generation) {
                tracing::debug!(
                    generation = run.generation,
                    current = self.generation.current(),
                    remaining = run.work.len(),
                    "abandoning stale run"
                );
                self.stats.runs_abandoned += 1;
                self.runs.pop_front();
                continue;
            }

            if run.work.is_empty() {
                let Some(run) = self.runs.pop_front() else {
                    return;
                };
                tracing::debug!(generation = run.generation, quality = ?run.quality, painted = run.painted, "pass committed");
                events.push(SchedulerEvent::PassCommitted {
                    quality: run.quality,
                    generation: run.generation,
                    painted: run.painted,
                });
                if run.quality == RenderQuality::Fast {
                    self.quality_timer.arm(now);
                }
                continue;
            }

            let Some(run) = self.runs.front_mut() else {
                return;
            };
            let batch = run.work.next_batch(run.batch_size);
            let (generation, quality, scale) = (run.generation, run.quality, run.scale);
            for candidate in batch {
                if !self.visible.contains(&candidate.index) {
                    continue;
                }
                self.start_task(painter, candidate, quality, scale, generation);
            }
        }
    }

    fn start_task<P>(
        &mut self,
        painter: &mut P,
        candidate: RenderCandidate,
        quality: RenderQuality,
        scale: f32,
        generation: u64,
    ) where
        P: Painter + ?Sized,
    {
        let index = candidate.index;
        let Some((width, height, render_scale)) =
            target_size(candidate.natural_width, candidate.natural_height, scale)
        else {
            tracing::debug!(
                index,
                width = candidate.natural_width,
                height = candidate.natural_height,
                "skipping paint with invalid geometry"
            );
            self.stats.tasks_skipped += 1;
            return;
        };

        if self.inflight.contains_key(&index) {
            self.cancel_task(index);
        }

        let token = CancellationToken::new();
        let request = PaintRequest { index, quality, scale: render_scale, width, height, generation };
        let scratch = self.pool.acquire(width, height);
        let operation = painter.begin_paint(&request, token.clone());
        tracing::trace!(index, ?quality, width, height, generation, "paint started");

        self.inflight.insert(
            index,
            InflightTask { quality, scale, generation, token, operation, scratch },
        );
        self.stats.tasks_started += 1;
        self.stats.peak_inflight = self.stats.peak_inflight.max(self.inflight.len());
    }
}

/// Pixel size for painting a `width` x `height` item at `scale`
///
/// The scale is reduced when the longest edge would exceed
/// [`MAX_RENDER_EDGE_PX`]; callers still record the pass scale, so a capped
/// item is not picked up again by the next quality pass. Returns `None` for
/// non-finite or non-positive input.
fn target_size(width: f32, height: f32, scale: f32) -> Option<(u32, u32, f32)> {
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if !valid(width) || !valid(height) || !valid(scale) {
        return None;
    }

    let longest = width.max(height) * scale;
    let scale = if longest > MAX_RENDER_EDGE_PX {
        scale * MAX_RENDER_EDGE_PX / longest
    } else {
        scale
    };

    let w = (width * scale).ceil().clamp(1.0, MAX_RENDER_EDGE_PX) as u32;
    let h = (height * scale).ceil().clamp(1.0, MAX_RENDER_EDGE_PX) as u32;
    Some((w, h, scale))
}

impl Default for ProgressiveRenderScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}
