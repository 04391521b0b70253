//! LRU-K eviction policy for the buffer pool.
//!
//! The replacer tracks, per frame, the timestamps of the `k` most recent
//! accesses. The eviction victim is the evictable frame with the largest
//! *K-distance*: the age of its k-th most recent access, or +infinity for
//! frames with fewer than `k` recorded accesses. Ties among +infinity frames
//! fall back to plain LRU on the oldest retained access.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::storage::page::FrameId;

/// Hint describing why a frame is being accessed.
///
/// Semantically inert for the default policy; kept on the API so access
/// methods can annotate their traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessType {
    /// Unclassified access.
    #[default]
    Unknown,
    /// Point lookup.
    Lookup,
    /// Sequential scan.
    Scan,
    /// Index traversal.
    Index,
}

/// Access history for one tracked frame.
struct LruKNode {
    /// Access timestamps, most recent first, at most `k` entries.
    history: VecDeque<u64>,
    is_evictable: bool,
}

impl LruKNode {
    fn new(timestamp: u64) -> Self {
        let mut history = VecDeque::new();
        history.push_front(timestamp);
        Self {
            history,
            is_evictable: false,
        }
    }

    fn record_access(&mut self, timestamp: u64, k: usize) {
        self.history.push_front(timestamp);
        self.history.truncate(k);
    }

    /// Age of the k-th most recent access, or `None` for +infinity.
    fn k_distance(&self, now: u64, k: usize) -> Option<u64> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[k - 1])
        }
    }

    /// Oldest retained access timestamp. The history is never empty.
    fn earliest(&self) -> u64 {
        *self.history.back().expect("history is never empty")
    }
}

struct ReplacerState {
    /// Tracked frames and their access histories.
    node_store: HashMap<FrameId, LruKNode>,
    /// Logical clock, bumped on every recorded access.
    current_timestamp: u64,
    /// Number of tracked frames currently marked evictable.
    evictable_count: usize,
}

/// LRU-K replacer deciding which buffer pool frame to evict.
///
/// All state sits behind a single internal mutex, so the replacer is safe to
/// share; the buffer pool additionally serializes mutating calls under its
/// own latch.
pub struct LruKReplacer {
    state: Mutex<ReplacerState>,
    /// Upper bound on tracked frames (= pool size).
    replacer_size: usize,
    k: usize,
}

impl LruKReplacer {
    /// Creates a replacer for `num_frames` frames with look-back constant `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero.
    #[must_use]
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "LRU-K requires k >= 1");
        Self {
            state: Mutex::new(ReplacerState {
                node_store: HashMap::with_capacity(num_frames),
                current_timestamp: 0,
                evictable_count: 0,
            }),
            replacer_size: num_frames,
            k,
        }
    }

    /// Records an access to the given frame at the current logical time.
    ///
    /// A frame seen for the first time starts non-evictable with a
    /// single-entry history.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id` is not in `[0, num_frames)`.
    pub fn record_access(&self, frame_id: FrameId, _access_type: AccessType) {
        assert!(
            frame_id < self.replacer_size,
            "frame id {frame_id} out of range for replacer of size {}",
            self.replacer_size
        );

        let mut state = self.state.lock();
        state.current_timestamp += 1;
        let timestamp = state.current_timestamp;

        match state.node_store.entry(frame_id) {
            Entry::Occupied(mut entry) => entry.get_mut().record_access(timestamp, self.k),
            Entry::Vacant(entry) => {
                entry.insert(LruKNode::new(timestamp));
            }
        }
    }

    /// Toggles whether the given frame may be chosen as an eviction victim.
    ///
    /// # Panics
    ///
    /// Panics if the frame is not tracked by the replacer.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut state = self.state.lock();
        let state = &mut *state;

        let node = state
            .node_store
            .get_mut(&frame_id)
            .expect("set_evictable on a frame the replacer does not track");

        if node.is_evictable != evictable {
            node.is_evictable = evictable;
            if evictable {
                state.evictable_count += 1;
            } else {
                state.evictable_count -= 1;
            }
        }
    }

    /// Stops tracking the given frame, dropping its access history.
    ///
    /// Removing an untracked frame is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the frame is tracked but not evictable: the buffer pool
    /// must never discard the history of a pinned frame.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();

        let Some(node) = state.node_store.get(&frame_id) else {
            return;
        };
        assert!(
            node.is_evictable,
            "remove called on a non-evictable frame"
        );
        state.node_store.remove(&frame_id);
        state.evictable_count -= 1;
    }

    /// Picks and removes the eviction victim: the evictable frame with the
    /// largest K-distance, ties broken by the oldest retained access.
    ///
    /// Returns `None` when no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        if state.evictable_count == 0 {
            return None;
        }

        let now = state.current_timestamp;
        let mut victim: Option<(FrameId, Option<u64>, u64)> = None;

        for (&frame_id, node) in &state.node_store {
            if !node.is_evictable {
                continue;
            }
            let distance = node.k_distance(now, self.k);
            let earliest = node.earliest();

            let supersedes = match &victim {
                None => true,
                Some((_, best_distance, best_earliest)) => match (distance, *best_distance) {
                    // +infinity beats any finite distance
                    (None, Some(_)) => true,
                    (Some(_), None) => false,
                    (None, None) => earliest < *best_earliest,
                    (Some(d), Some(best)) => {
                        d > best || (d == best && earliest < *best_earliest)
                    }
                },
            };
            if supersedes {
                victim = Some((frame_id, distance, earliest));
            }
        }

        let (frame_id, _, _) = victim?;
        state.node_store.remove(&frame_id);
        state.evictable_count -= 1;
        Some(frame_id)
    }

    /// Returns the number of evictable frames.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().evictable_count
    }
}
