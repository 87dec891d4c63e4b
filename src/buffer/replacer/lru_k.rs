//! LRU-K replacement policy.
//!
//! Each tracked frame keeps the timestamps of its last K accesses. The victim
//! is the evictable frame with the largest *backward k-distance*: the time
//! since its K-th most recent access. Frames with fewer than K accesses have
//! infinite distance and are evicted first, oldest first access wins.
//!
//! A frame touched once long ago is presumed to be part of a scan and loses
//! to a frame with a dense access pattern, even if that pattern is older.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::FrameId;

/// Backward k-distance of a tracked frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KDistance {
    /// Fewer than K accesses recorded. `first_access` breaks ties, LRU style.
    Infinite { first_access: u64 },
    /// `now - (K-th most recent access)`.
    Finite(u64),
}

/// Access history of one frame.
#[derive(Debug)]
struct LruKNode {
    /// Most recent K timestamps, oldest at the front.
    history: VecDeque<u64>,
    is_evictable: bool,
}

impl LruKNode {
    fn new(k: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(k),
            is_evictable: false,
        }
    }

    fn k_distance(&self, k: usize, now: u64) -> KDistance {
        // Nodes are created by an access, so history is never empty.
        let oldest = self.history.front().copied().unwrap_or(0);
        if self.history.len() < k {
            KDistance::Infinite {
                first_access: oldest,
            }
        } else {
            KDistance::Finite(now - oldest)
        }
    }
}

#[derive(Debug)]
struct ReplacerState {
    nodes: HashMap<FrameId, LruKNode>,
    current_timestamp: u64,
    evictable_count: usize,
}

/// LRU-K eviction policy over a fixed set of frame indices.
///
/// The replacer has its own lock, so it can be consulted from `&self` while
/// the buffer pool's structural lock is or is not held.
///
/// # Example
/// ```
/// use pagecache::buffer::replacer::LruKReplacer;
/// use pagecache::FrameId;
///
/// let replacer = LruKReplacer::new(8, 2);
/// replacer.record_access(FrameId::new(1));
/// replacer.record_access(FrameId::new(1));
/// replacer.record_access(FrameId::new(2));
/// replacer.set_evictable(FrameId::new(1), true);
/// replacer.set_evictable(FrameId::new(2), true);
///
/// // Frame 2 has a single access: infinite k-distance.
/// assert_eq!(replacer.evict(), Some(FrameId::new(2)));
/// ```
#[derive(Debug)]
pub struct LruKReplacer {
    state: Mutex<ReplacerState>,
    /// Number of frames this replacer may be asked about.
    capacity: usize,
    k: usize,
}

impl LruKReplacer {
    /// Create a replacer for frames `0..capacity` remembering `k` accesses.
    ///
    /// # Panics
    /// Panics if `k` is 0.
    pub fn new(capacity: usize, k: usize) -> Self {
        assert!(k > 0, "replacer k must be > 0");

        Self {
            state: Mutex::new(ReplacerState {
                nodes: HashMap::with_capacity(capacity),
                current_timestamp: 0,
                evictable_count: 0,
            }),
            capacity,
            k,
        }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Record an access to `frame_id` at the next logical timestamp.
    ///
    /// A frame seen for the first time starts out non-evictable.
    ///
    /// # Panics
    /// Panics if `frame_id` is outside the replacer's capacity.
    pub fn record_access(&self, frame_id: FrameId) {
        self.check_frame(frame_id);

        let mut state = self.state.lock();
        let now = state.current_timestamp;
        state.current_timestamp += 1;

        let node = state
            .nodes
            .entry(frame_id)
            .or_insert_with(|| LruKNode::new(self.k));
        if node.history.len() == self.k {
            node.history.pop_front();
        }
        node.history.push_back(now);
    }

    /// Include or exclude a tracked frame from eviction. Untracked frames are
    /// ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.check_frame(frame_id);

        let mut state = self.state.lock();
        let Some(node) = state.nodes.get_mut(&frame_id) else {
            return;
        };
        let was_evictable = std::mem::replace(&mut node.is_evictable, evictable);

        match (was_evictable, evictable) {
            (false, true) => state.evictable_count += 1,
            (true, false) => state.evictable_count -= 1,
            _ => {}
        }
    }

    /// Pick and forget the evictable frame with the largest backward
    /// k-distance.
    ///
    /// Returns `None` when nothing is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        if state.evictable_count == 0 {
            return None;
        }

        let now = state.current_timestamp;
        let victim = state
            .nodes
            .iter()
            .filter(|(_, node)| node.is_evictable)
            .max_by(|(_, a), (_, b)| {
                Self::eviction_order(a.k_distance(self.k, now), b.k_distance(self.k, now))
            })
            .map(|(&frame_id, _)| frame_id)?;

        state.nodes.remove(&victim);
        state.evictable_count -= 1;
        Some(victim)
    }

    /// Forget all history of `frame_id`, e.g. when its page is deleted.
    /// Untracked frames are ignored.
    pub fn remove(&self, frame_id: FrameId) {
        self.check_frame(frame_id);

        let mut state = self.state.lock();
        if let Some(node) = state.nodes.remove(&frame_id) {
            if node.is_evictable {
                state.evictable_count -= 1;
            }
        }
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().evictable_count
    }

    /// Current backward k-distance of a tracked frame.
    pub fn k_distance(&self, frame_id: FrameId) -> Option<KDistance> {
        let state = self.state.lock();
        let now = state.current_timestamp;
        state
            .nodes
            .get(&frame_id)
            .map(|node| node.k_distance(self.k, now))
    }

    /// Whether `frame_id` currently has a history node.
    pub fn is_tracked(&self, frame_id: FrameId) -> bool {
        self.state.lock().nodes.contains_key(&frame_id)
    }

    /// Greater means "evict sooner".
    fn eviction_order(a: KDistance, b: KDistance) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        use KDistance::*;

        match (a, b) {
            (Infinite { first_access: x }, Infinite { first_access: y }) => y.cmp(&x),
            (Infinite { .. }, Finite(_)) => Ordering::Greater,
            (Finite(_), Infinite { .. }) => Ordering::Less,
            (Finite(x), Finite(y)) => x.cmp(&y),
        }
    }

    #[inline]
    fn check_frame(&self, frame_id: FrameId) {
        assert!(
            frame_id.0 < self.capacity,
            "{} out of range for replacer of {} frames",
            frame_id,
            self.capacity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(i: usize) -> FrameId {
        FrameId::new(i)
    }

    #[test]
    fn test_empty_replacer() {
        let replacer = LruKReplacer::new(4, 2);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_new_node_not_evictable() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(0));

        assert!(replacer.is_tracked(fid(0)));
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_infinite_distance_evicted_first() {
        // Timestamps: F1:[0,1], F2:[2], F3:[3,4,5] -> F3 keeps [4,5].
        let replacer = LruKReplacer::new(8, 2);
        replacer.record_access(fid(1));
        replacer.record_access(fid(1));
        replacer.record_access(fid(2));
        replacer.record_access(fid(3));
        replacer.record_access(fid(3));
        replacer.record_access(fid(3));

        for i in 1..=3 {
            replacer.set_evictable(fid(i), true);
        }

        assert!(matches!(
            replacer.k_distance(fid(2)),
            Some(KDistance::Infinite { first_access: 2 })
        ));
        assert_eq!(replacer.k_distance(fid(1)), Some(KDistance::Finite(6)));
        assert_eq!(replacer.k_distance(fid(3)), Some(KDistance::Finite(2)));

        assert_eq!(replacer.evict(), Some(fid(2)));
        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), Some(fid(3)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_infinite_ties_break_on_oldest_access() {
        let replacer = LruKReplacer::new(8, 3);
        replacer.record_access(fid(5));
        replacer.record_access(fid(4));
        replacer.record_access(fid(5));
        replacer.record_access(fid(6));

        for i in 4..=6 {
            replacer.set_evictable(fid(i), true);
        }

        // All below K=3; frame 5's first access (t=0) is oldest.
        assert_eq!(replacer.evict(), Some(fid(5)));
        assert_eq!(replacer.evict(), Some(fid(4)));
        assert_eq!(replacer.evict(), Some(fid(6)));
    }

    #[test]
    fn test_history_bounded_to_k() {
        let replacer = LruKReplacer::new(4, 2);
        // Frame 0 accessed early and often, frame 1 twice recently.
        for _ in 0..5 {
            replacer.record_access(fid(0));
        }
        replacer.record_access(fid(1));
        replacer.record_access(fid(1));

        replacer.set_evictable(fid(0), true);
        replacer.set_evictable(fid(1), true);

        // Only the last two of frame 0's accesses (t=3,4) count; frame 1
        // has t=5,6. Frame 0 is farther back.
        assert_eq!(replacer.evict(), Some(fid(0)));
    }

    #[test]
    fn test_set_evictable_adjusts_size() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(0));
        replacer.record_access(fid(1));

        replacer.set_evictable(fid(0), true);
        replacer.set_evictable(fid(0), true);
        assert_eq!(replacer.size(), 1);

        replacer.set_evictable(fid(1), true);
        assert_eq!(replacer.size(), 2);

        replacer.set_evictable(fid(0), false);
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_set_evictable_untracked_is_noop() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.set_evictable(fid(3), true);
        assert_eq!(replacer.size(), 0);
        assert!(!replacer.is_tracked(fid(3)));
    }

    #[test]
    fn test_remove() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(0));
        replacer.record_access(fid(1));
        replacer.set_evictable(fid(0), true);
        replacer.set_evictable(fid(1), true);

        replacer.remove(fid(0));
        assert_eq!(replacer.size(), 1);
        assert!(!replacer.is_tracked(fid(0)));

        // Untracked: no-op.
        replacer.remove(fid(2));
        assert_eq!(replacer.evict(), Some(fid(1)));
    }

    #[test]
    fn test_remove_non_evictable_keeps_count() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(0));
        replacer.record_access(fid(1));
        replacer.set_evictable(fid(1), true);

        replacer.remove(fid(0));
        assert!(!replacer.is_tracked(fid(0)));
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_frame_out_of_range() {
        let replacer = LruKReplacer::new(2, 2);
        replacer.record_access(fid(2));
    }

    #[test]
    fn test_evicted_frame_history_forgotten() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(fid(0));
        replacer.record_access(fid(0));
        replacer.set_evictable(fid(0), true);
        assert_eq!(replacer.evict(), Some(fid(0)));

        // Re-tracked from scratch: one access, infinite distance.
        replacer.record_access(fid(0));
        assert!(matches!(
            replacer.k_distance(fid(0)),
            Some(KDistance::Infinite { .. })
        ));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        #[derive(Debug, Clone)]
        enum Op {
            Access(usize),
            SetEvictable(usize, bool),
            Evict,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..8usize).prop_map(Op::Access),
                (0..8usize, any::<bool>()).prop_map(|(f, e)| Op::SetEvictable(f, e)),
                Just(Op::Evict),
            ]
        }

        proptest! {
            #[test]
            fn evict_only_returns_evictable(ops in proptest::collection::vec(op(), 1..200)) {
                let replacer = LruKReplacer::new(8, 2);
                let mut tracked = HashSet::new();
                let mut evictable = HashSet::new();

                for op in ops {
                    match op {
                        Op::Access(f) => {
                            replacer.record_access(fid(f));
                            tracked.insert(f);
                        }
                        Op::SetEvictable(f, e) => {
                            replacer.set_evictable(fid(f), e);
                            if tracked.contains(&f) {
                                if e { evictable.insert(f); } else { evictable.remove(&f); }
                            }
                        }
                        Op::Evict => match replacer.evict() {
                            Some(victim) => {
                                prop_assert!(evictable.remove(&victim.0));
                                tracked.remove(&victim.0);
                            }
                            None => prop_assert!(evictable.is_empty()),
                        },
                    }
                    prop_assert_eq!(replacer.size(), evictable.len());
                }
            }
        }
    }
}
