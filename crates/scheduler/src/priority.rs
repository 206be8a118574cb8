//! Distance-ordered render work
//!
//! Work is ordered by how far each item's midpoint sits from the viewport
//! midpoint, so the items the user is looking at complete first. Ties fall
//! back to item order to keep batches deterministic.

use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Items started together in one concurrency-limited batch
pub type Batch = SmallVec<[RenderCandidate; 8]>;

/// A visible item the scheduler may paint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCandidate {
    /// Item index (1-based)
    pub index: usize,

    /// Natural (unscaled) width
    pub natural_width: f32,

    /// Natural (unscaled) height
    pub natural_height: f32,

    /// Distance from the item midpoint to the viewport midpoint, in layout pixels
    pub distance: f32,
}

impl RenderCandidate {
    pub fn new(index: usize, natural_width: f32, natural_height: f32, distance: f32) -> Self {
        Self { index, natural_width, natural_height, distance }
    }

    fn priority_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .abs()
            .total_cmp(&other.distance.abs())
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Work remaining for one scheduling invocation, closest items first
#[derive(Debug, Clone, Default)]
pub struct WorkList {
    items: VecDeque<RenderCandidate>,
}

impl WorkList {
    /// Build a work list, sorting by ascending distance
    pub fn from_candidates<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = RenderCandidate>,
    {
        let mut items: Vec<RenderCandidate> = candidates.into_iter().collect();
        items.sort_by(RenderCandidate::priority_cmp);
        Self { items: items.into() }
    }

    /// Take the next batch of up to `size` items
    pub fn next_batch(&mut self, size: usize) -> Batch {
        let take = size.max(1).min(self.items.len());
        self.items.drain(..take).collect()
    }

    /// Peek at the remaining items in priority order
    pub fn iter(&self) -> impl Iterator<Item = &RenderCandidate> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: usize, distance: f32) -> RenderCandidate {
        RenderCandidate::new(index, 612.0, 792.0, distance)
    }

    #[test]
    fn test_closest_first() {
        let list = WorkList::from_candidates(vec![
            candidate(1, 2_000.0),
            candidate(2, 900.0),
            candidate(3, 10.0),
            candidate(4, 1_100.0),
        ]);

        let order: Vec<usize> = list.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_distance_sign_ignored() {
        let list = WorkList::from_candidates(vec![candidate(5, -50.0), candidate(6, 40.0)]);
        assert_eq!(list.iter().next().map(|c| c.index), Some(6));
    }

    #[test]
    fn test_ties_break_on_index() {
        let list = WorkList::from_candidates(vec![candidate(9, 100.0), candidate(2, 100.0)]);
        let order: Vec<usize> = list.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![2, 9]);
    }

    #[test]
    fn test_batches_drain_in_order() {
        let mut list = WorkList::from_candidates((1..=5).map(|i| candidate(i, i as f32)));

        let first = list.next_batch(2);
        assert_eq!(first.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 2]);

        let second = list.next_batch(2);
        assert_eq!(second.iter().map(|c| c.index).collect::<Vec<_>>(), vec![3, 4]);

        let last = list.next_batch(2);
        assert_eq!(last.len(), 1);
        assert!(list.is_empty());
        assert!(list.next_batch(2).is_empty());
    }

    #[test]
    fn test_zero_batch_size_still_progresses() {
        let mut list = WorkList::from_candidates(vec![candidate(1, 0.0)]);
        assert_eq!(list.next_batch(0).len(), 1);
    }
}
