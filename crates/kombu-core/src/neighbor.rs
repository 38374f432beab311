//! `(id, distance)` pairs produced by search.

use crate::order::ScoreOrder;

/// A dataset index paired with its score for some query.
///
/// Ordering is deliberately not derived: neighbors rank through
/// [`Neighbor::beats`] so the score polarity stays with the distance
/// functor that produced them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Dataset index of the matched entry.
    pub id: usize,
    /// Raw score under the distance functor.
    pub distance: f32,
}

impl Neighbor {
    /// Reserved id marking an empty heap slot. Dataset indices are always
    /// strictly below their dataset's size, so this value never collides.
    pub const SENTINEL_ID: usize = usize::MAX;

    /// Create a neighbor.
    pub fn new(id: usize, distance: f32) -> Self {
        Self { id, distance }
    }

    /// The slot filler that loses to every real neighbor under `O`.
    pub fn sentinel<O: ScoreOrder>() -> Self {
        Self::new(Self::SENTINEL_ID, O::WORST)
    }

    /// Whether this slot still holds the initialization filler.
    pub fn is_sentinel(&self) -> bool {
        self.id == Self::SENTINEL_ID
    }

    /// Return `true` when `self` ranks strictly ahead of `other`.
    ///
    /// Equal scores resolve to the lower id, which makes results bit-exact
    /// across worker counts and partition sizes.
    #[inline]
    pub fn beats<O: ScoreOrder>(&self, other: &Neighbor) -> bool {
        if self.distance == other.distance {
            self.id < other.id
        } else {
            O::is_better(self.distance, other.distance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Maximize, Minimize};

    #[test]
    fn test_beats_by_distance() {
        let near = Neighbor::new(7, 1.0);
        let far = Neighbor::new(3, 2.0);
        assert!(near.beats::<Minimize>(&far));
        assert!(!far.beats::<Minimize>(&near));

        // Under Maximize the polarity flips.
        assert!(far.beats::<Maximize>(&near));
    }

    #[test]
    fn test_ties_break_by_lower_id() {
        let a = Neighbor::new(1, 5.0);
        let b = Neighbor::new(2, 5.0);
        assert!(a.beats::<Minimize>(&b));
        assert!(!b.beats::<Minimize>(&a));
        assert!(a.beats::<Maximize>(&b));
    }

    #[test]
    fn test_real_neighbor_beats_sentinel() {
        let sentinel = Neighbor::sentinel::<Minimize>();
        assert!(sentinel.is_sentinel());
        assert!(Neighbor::new(0, 123.0).beats::<Minimize>(&sentinel));
        // Even a neighbor at the sentinel score wins on id.
        assert!(Neighbor::new(0, f32::INFINITY).beats::<Minimize>(&sentinel));
    }
}
