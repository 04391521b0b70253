//! Buffer frame holding a single cached page.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::storage::page::{FrameId, PageData, PageId, INVALID_PAGE_ID, PAGE_SIZE};

/// A frame in the buffer pool that holds a single page.
///
/// Each frame tracks:
/// - The page currently resident (or [`INVALID_PAGE_ID`] if the frame is free)
/// - How many callers currently pin the page
/// - Whether the in-memory copy diverges from disk (dirty)
///
/// The page bytes sit behind the frame's own reader/writer latch, shared
/// with the disk scheduler and the page guards. Pinning and latching are
/// orthogonal: pinning prevents eviction, the latch prevents data races on
/// the bytes. Metadata fields are only mutated while the pool's latch is
/// held; the atomics exist so tests and guards can read them without it.
pub struct Frame {
    /// Index of this frame in the buffer pool.
    frame_id: FrameId,
    /// Page currently resident in this frame.
    page_id: AtomicI32,
    /// Number of active pins on this frame.
    pin_count: AtomicU32,
    /// Whether the page has been modified since it was last written out.
    is_dirty: AtomicBool,
    /// Raw page bytes behind the frame latch.
    data: Arc<RwLock<PageData>>,
}

impl Frame {
    /// Creates a new empty frame.
    #[must_use]
    pub(crate) fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: AtomicI32::new(INVALID_PAGE_ID),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            data: Arc::new(RwLock::new([0u8; PAGE_SIZE])),
        }
    }

    /// Returns this frame's slot index.
    #[must_use]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the id of the resident page, or [`INVALID_PAGE_ID`].
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.page_id.load(Ordering::Relaxed)
    }

    /// Returns the current pin count.
    #[must_use]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    /// Returns whether the frame holds unflushed modifications.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }

    /// Returns whether this frame could be handed to the replacer: it holds
    /// a page and nobody pins it.
    #[must_use]
    pub fn is_evictable(&self) -> bool {
        self.page_id() != INVALID_PAGE_ID && self.pin_count() == 0
    }

    /// Shared handle to the page bytes, for guards and disk requests.
    pub(crate) fn data(&self) -> &Arc<RwLock<PageData>> {
        &self.data
    }

    pub(crate) fn set_page_id(&self, page_id: PageId) {
        self.page_id.store(page_id, Ordering::Relaxed);
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Relaxed);
    }

    /// Increments the pin count.
    pub(crate) fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the pin count. The caller checks for over-unpin first.
    pub(crate) fn unpin(&self) {
        self.pin_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// Resets the frame to the empty state: zeroed bytes, no page, no pins.
    pub(crate) fn reset(&self) {
        *self.data.write() = [0u8; PAGE_SIZE];
        self.page_id.store(INVALID_PAGE_ID, Ordering::Relaxed);
        self.pin_count.store(0, Ordering::Relaxed);
        self.is_dirty.store(false, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("is_dirty", &self.is_dirty())
            .finish()
    }
}
