//! Buffer pool management for page caching.
//!
//! This module implements a fixed-capacity buffer pool between callers and a
//! disk-resident paged store. It provides:
//! - Page pinning and unpinning with reference counting
//! - LRU-K eviction for memory management
//! - RAII guards ([`PageGuard`], [`ReadPageGuard`], [`WritePageGuard`]) for
//!   safe page access
//!
//! # Architecture
//!
//! A single coarse latch protects the page table and free list. Frames are
//! shared `Arc`s; each frame's bytes sit behind that frame's own
//! reader/writer latch, which guards hold for their full lifetime. Disk I/O
//! goes through a background [`DiskScheduler`] so the pool never touches the
//! device from caller threads directly.
//!
//! # Example
//!
//! ```ignore
//! let pool = BufferPoolManager::new(capacity, disk_manager, k);
//! let mut guard = pool.fetch_page_write(page_id)?;
//! guard.data_mut()[0] = 42;
//! // Latch released and page unpinned (dirty) when the guard drops
//! ```

mod eviction;
mod frame;
mod page_guard;

pub use eviction::{AccessType, LruKReplacer};
pub use frame::Frame;
pub use page_guard::{PageGuard, ReadPageGuard, WritePageGuard};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::storage::page::{
    DiskManager, DiskRequest, DiskScheduler, FrameId, PageId, INVALID_PAGE_ID,
};

/// Default number of frames in a pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default look-back constant for the LRU-K replacer.
pub const LRUK_REPLACER_K: usize = 10;

/// Configuration for a buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool (default: 64).
    pub pool_size: usize,
    /// Look-back constant for the LRU-K replacer (default: 10).
    pub replacer_k: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            replacer_k: LRUK_REPLACER_K,
        }
    }
}

/// Mapping state under the pool latch.
struct PoolState {
    /// Maps resident page ids to frame slots.
    page_table: HashMap<PageId, FrameId>,
    /// Frame slots not bound to any page.
    free_list: VecDeque<FrameId>,
}

/// Fixed-capacity page cache over a disk manager.
///
/// All operations are atomic with respect to the pool latch. Recoverable
/// conditions follow the fall-through convention: `new_page`/`fetch_page`
/// return `None` when every frame is pinned, and `unpin_page`/`flush_page`/
/// `delete_page` report unknown pages or refused deletions through their
/// `bool` result.
pub struct BufferPoolManager {
    /// Number of frames the pool manages.
    pool_size: usize,
    /// The next page id to allocate; ids are never reused.
    next_page_id: AtomicI32,
    /// The fixed frame array, created once at construction.
    frames: Vec<Arc<Frame>>,
    /// Coarse latch over the page table and free list.
    state: Mutex<PoolState>,
    /// Replacer choosing eviction victims among unpinned frames.
    replacer: LruKReplacer,
    /// Background worker serializing disk reads and writes.
    disk_scheduler: DiskScheduler,
    /// The paged store underneath the pool.
    disk_manager: Arc<dyn DiskManager>,
    /// Counter for cache hits (page found in the pool).
    cache_hits: AtomicU64,
    /// Counter for cache misses (page had to be loaded from disk).
    cache_misses: AtomicU64,
    /// Counter for evicted pages.
    evictions: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a new buffer pool manager.
    ///
    /// # Arguments
    ///
    /// * `pool_size` - Number of frames in the pool
    /// * `disk_manager` - The paged store to cache
    /// * `replacer_k` - Look-back constant for the LRU-K replacer
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is zero.
    #[must_use]
    pub fn new(pool_size: usize, disk_manager: Arc<dyn DiskManager>, replacer_k: usize) -> Self {
        assert!(pool_size > 0, "buffer pool needs at least one frame");

        let frames = (0..pool_size).map(|i| Arc::new(Frame::new(i))).collect();
        let free_list: VecDeque<FrameId> = (0..pool_size).collect();

        Self {
            pool_size,
            next_page_id: AtomicI32::new(0),
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
            }),
            replacer: LruKReplacer::new(pool_size, replacer_k),
            disk_scheduler: DiskScheduler::new(Arc::clone(&disk_manager)),
            disk_manager,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Creates a buffer pool manager from a [`BufferPoolConfig`].
    #[must_use]
    pub fn with_config(config: &BufferPoolConfig, disk_manager: Arc<dyn DiskManager>) -> Self {
        Self::new(config.pool_size, disk_manager, config.replacer_k)
    }

    /// Returns the number of frames in the pool.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the pool's frame array, for whitebox inspection in tests.
    #[must_use]
    pub fn frames(&self) -> &[Arc<Frame>] {
        &self.frames
    }

    /// Returns the replacer's evictable-frame count.
    #[must_use]
    pub fn replacer_size(&self) -> usize {
        self.replacer.size()
    }

    /// Creates a new page in the pool, pinned once.
    ///
    /// Returns the allocated page id and the frame holding it, or `None` if
    /// every frame is pinned.
    pub fn new_page(&self) -> Option<(PageId, Arc<Frame>)> {
        let mut state = self.state.lock();
        let frame_id = self.obtain_frame(&mut state)?;

        let page_id = self.next_page_id.fetch_add(1, Ordering::Relaxed);
        let frame = &self.frames[frame_id];
        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();

        state.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, AccessType::Unknown);
        self.replacer.set_evictable(frame_id, false);

        Some((page_id, Arc::clone(frame)))
    }

    /// Fetches the requested page, pinning its frame.
    ///
    /// On a miss the page is read from disk through the scheduler before
    /// this returns. Returns `None` if the page is not resident and every
    /// frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Option<Arc<Frame>> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id];
            frame.pin();
            self.replacer.record_access(frame_id, AccessType::Unknown);
            self.replacer.set_evictable(frame_id, false);
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(frame));
        }

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.obtain_frame(&mut state)?;

        let frame = &self.frames[frame_id];
        frame.reset();
        self.read_from_disk(page_id, frame);
        frame.set_page_id(page_id);
        frame.pin();

        state.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, AccessType::Unknown);
        self.replacer.set_evictable(frame_id, false);

        Some(Arc::clone(frame))
    }

    /// Unpins the target page.
    ///
    /// Returns `false` if the page is not resident or its pin count is
    /// already zero. The dirty flag is ORed in, never cleared: any writer's
    /// claim of modification sticks until the page is flushed.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id];
        if frame.pin_count() == 0 {
            return false;
        }

        frame.unpin();
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.pin_count() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Writes the target page to disk regardless of its dirty flag, then
    /// clears the flag.
    ///
    /// Returns `false` if the page is not resident. Must not be called while
    /// holding a write guard on the same page: the disk worker takes the
    /// frame's shared latch to read the bytes out.
    ///
    /// # Panics
    ///
    /// Panics if `page_id` is [`INVALID_PAGE_ID`], or if the disk write
    /// fails.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        assert!(
            page_id != INVALID_PAGE_ID,
            "cannot flush the invalid page id"
        );

        let state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id];
        self.write_to_disk(page_id, frame);
        frame.set_dirty(false);
        true
    }

    /// Flushes every resident page to disk.
    ///
    /// # Panics
    ///
    /// Panics if a disk write fails.
    pub fn flush_all_pages(&self) {
        let state = self.state.lock();
        for (&page_id, &frame_id) in &state.page_table {
            let frame = &self.frames[frame_id];
            self.write_to_disk(page_id, frame);
            frame.set_dirty(false);
        }
    }

    /// Deletes the target page from the pool.
    ///
    /// Returns `true` if the page was not resident or was removed; `false`
    /// if it is pinned. The freed frame goes back on the free list and the
    /// disk layer is notified through its advisory deallocation hook.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };

        let frame = &self.frames[frame_id];
        if frame.pin_count() > 0 {
            return false;
        }

        self.replacer.remove(frame_id);
        state.page_table.remove(&page_id);
        state.free_list.push_back(frame_id);
        frame.reset();
        self.disk_manager.deallocate_page(page_id);
        true
    }

    /// [`Self::new_page`] returning a [`PageGuard`] instead of a raw frame.
    pub fn new_page_guarded(&self) -> Option<PageGuard<'_>> {
        let (page_id, frame) = self.new_page()?;
        Some(PageGuard::new(self, page_id, frame))
    }

    /// [`Self::fetch_page`] returning a [`PageGuard`] instead of a raw frame.
    pub fn fetch_page_basic(&self, page_id: PageId) -> Option<PageGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Some(PageGuard::new(self, page_id, frame))
    }

    /// Fetches a page and returns it with the frame's shared latch held.
    pub fn fetch_page_read(&self, page_id: PageId) -> Option<ReadPageGuard<'_>> {
        Some(self.fetch_page_basic(page_id)?.upgrade_read())
    }

    /// Fetches a page and returns it with the frame's exclusive latch held.
    pub fn fetch_page_write(&self, page_id: PageId) -> Option<WritePageGuard<'_>> {
        Some(self.fetch_page_basic(page_id)?.upgrade_write())
    }

    /// Picks a frame for a new binding: the free list first, then the
    /// replacer. A dirty victim is written out before the frame is handed
    /// back, and its old mapping is removed.
    fn obtain_frame(&self, state: &mut PoolState) -> Option<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Some(frame_id);
        }

        let frame_id = self.replacer.evict()?;
        let frame = &self.frames[frame_id];
        let old_page_id = frame.page_id();
        if frame.is_dirty() {
            // Write-before-evict: the frame must not be rebound until the
            // old page image is on disk.
            self.write_to_disk(old_page_id, frame);
        }
        state.page_table.remove(&old_page_id);
        self.evictions.fetch_add(1, Ordering::Relaxed);
        Some(frame_id)
    }

    /// Schedules a write of the frame's bytes and waits for completion.
    fn write_to_disk(&self, page_id: PageId, frame: &Frame) {
        let (callback, done) = mpsc::channel();
        self.disk_scheduler.schedule(DiskRequest {
            is_write: true,
            data: Arc::clone(frame.data()),
            page_id,
            callback,
        });
        let ok = done.recv().unwrap_or(false);
        assert!(ok, "disk write of page {page_id} failed");
    }

    /// Schedules a read into the frame's bytes and waits for completion.
    fn read_from_disk(&self, page_id: PageId, frame: &Frame) {
        let (callback, done) = mpsc::channel();
        self.disk_scheduler.schedule(DiskRequest {
            is_write: false,
            data: Arc::clone(frame.data()),
            page_id,
            callback,
        });
        let ok = done.recv().unwrap_or(false);
        assert!(ok, "disk read of page {page_id} failed");
    }

    /// Returns a snapshot of the pool's counters.
    #[must_use]
    pub fn stats(&self) -> BufferPoolStats {
        let state = self.state.lock();
        let mut dirty_pages = 0;
        let mut pinned_pages = 0;
        for &frame_id in state.page_table.values() {
            let frame = &self.frames[frame_id];
            if frame.is_dirty() {
                dirty_pages += 1;
            }
            if frame.pin_count() > 0 {
                pinned_pages += 1;
            }
        }

        BufferPoolStats {
            capacity: self.pool_size,
            pages_used: state.page_table.len(),
            dirty_pages,
            pinned_pages,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Resets the cache statistics counters.
    pub fn reset_stats(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

/// Statistics about the buffer pool state.
#[derive(Debug, Clone)]
pub struct BufferPoolStats {
    /// Number of frames the pool manages.
    pub capacity: usize,
    /// Current number of resident pages.
    pub pages_used: usize,
    /// Number of dirty pages.
    pub dirty_pages: usize,
    /// Number of pinned pages.
    pub pinned_pages: usize,
    /// Number of cache hits (page found in the pool).
    pub cache_hits: u64,
    /// Number of cache misses (page had to be loaded from disk).
    pub cache_misses: u64,
    /// Number of pages evicted.
    pub evictions: u64,
}

impl BufferPoolStats {
    /// Calculates the cache hit rate as a fraction (0.0 to 1.0).
    ///
    /// Returns `None` if there have been no cache accesses.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            None
        } else {
            Some(self.cache_hits as f64 / total as f64)
        }
    }

    /// Returns the total number of cache accesses (hits + misses).
    #[must_use]
    pub fn total_accesses(&self) -> u64 {
        self.cache_hits + self.cache_misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{MemoryDiskManager, PAGE_SIZE};

    fn create_test_pool(
        pool_size: usize,
        replacer_k: usize,
    ) -> (Arc<BufferPoolManager>, Arc<MemoryDiskManager>) {
        let disk = Arc::new(MemoryDiskManager::new());
        let pool = BufferPoolManager::new(
            pool_size,
            Arc::clone(&disk) as Arc<dyn DiskManager>,
            replacer_k,
        );
        (Arc::new(pool), disk)
    }

    #[test]
    fn test_pin_lifecycle() {
        let (pool, _disk) = create_test_pool(5, 2);

        let (page_id, frame) = pool.new_page().unwrap();
        assert_eq!(page_id, 0);
        assert_eq!(frame.pin_count(), 1);

        let same = pool.fetch_page(0).unwrap();
        assert_eq!(same.frame_id(), frame.frame_id());
        assert_eq!(frame.pin_count(), 2);

        assert!(pool.unpin_page(0, false));
        assert!(pool.unpin_page(0, false));
        assert_eq!(frame.pin_count(), 0);
        assert_eq!(pool.replacer_size(), 1);

        // Over-unpin is refused
        assert!(!pool.unpin_page(0, false));
    }

    #[test]
    fn test_page_ids_allocate_monotonically() {
        let (pool, _disk) = create_test_pool(4, 2);
        for expected in 0..4 {
            let (page_id, _) = pool.new_page().unwrap();
            assert_eq!(page_id, expected);
            pool.unpin_page(page_id, false);
        }
        // Evicting and reallocating never reuses an id
        let (page_id, _) = pool.new_page().unwrap();
        assert_eq!(page_id, 4);
    }

    #[test]
    fn test_dirty_flush_on_evict() {
        let (pool, disk) = create_test_pool(1, 2);

        let page_id = {
            let guard = pool.new_page_guarded().unwrap();
            let mut writer = guard.upgrade_write();
            writer.data_mut()[0..5].copy_from_slice(b"hello");
            writer.page_id()
        };
        assert_eq!(pool.frames()[0].pin_count(), 0);

        // Allocating a second page forces the dirty page out
        let (second_id, _frame) = pool.new_page().unwrap();
        let mut buf = [0u8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        assert_eq!(&buf[0..5], b"hello");

        // Fetching the first page back evicts the second and recovers the bytes
        pool.unpin_page(second_id, false);
        let frame = pool.fetch_page(page_id).unwrap();
        assert_eq!(&frame.data().read()[0..5], b"hello");
    }

    #[test]
    fn test_pool_exhaustion() {
        let (pool, _disk) = create_test_pool(2, 2);

        let (a, _fa) = pool.new_page().unwrap();
        let (_b, _fb) = pool.new_page().unwrap();
        assert!(pool.new_page().is_none());
        assert!(pool.fetch_page(99).is_none());

        // Unpinning one page makes progress possible again
        pool.unpin_page(a, false);
        assert!(pool.new_page().is_some());
    }

    #[test]
    fn test_unpin_unknown_page() {
        let (pool, _disk) = create_test_pool(2, 2);
        assert!(!pool.unpin_page(7, false));
    }

    #[test]
    fn test_dirty_flag_is_sticky() {
        let (pool, disk) = create_test_pool(2, 2);

        let (page_id, frame) = pool.new_page().unwrap();
        frame.data().write()[0] = 0xAB;

        let _ = pool.fetch_page(page_id).unwrap();
        assert!(pool.unpin_page(page_id, true));
        // A later clean unpin must not clear the dirty bit
        assert!(pool.unpin_page(page_id, false));
        assert!(frame.is_dirty());

        assert!(pool.flush_page(page_id));
        assert!(!frame.is_dirty());
        let mut buf = [0u8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        assert_eq!(buf[0], 0xAB);
    }

    #[test]
    fn test_flush_unknown_page() {
        let (pool, _disk) = create_test_pool(2, 2);
        assert!(!pool.flush_page(3));
    }

    #[test]
    #[should_panic(expected = "invalid page id")]
    fn test_flush_invalid_page_panics() {
        let (pool, _disk) = create_test_pool(2, 2);
        pool.flush_page(INVALID_PAGE_ID);
    }

    #[test]
    fn test_flush_writes_clean_pages_too() {
        let (pool, disk) = create_test_pool(2, 2);

        let (page_id, frame) = pool.new_page().unwrap();
        frame.data().write()[0] = 9;
        // Pin still held and the page never marked dirty
        assert!(pool.flush_page(page_id));

        let mut buf = [0u8; PAGE_SIZE];
        disk.read_page(page_id, &mut buf).unwrap();
        assert_eq!(buf[0], 9);
    }

    #[test]
    fn test_flush_all_pages() {
        let (pool, disk) = create_test_pool(4, 2);

        let mut page_ids = Vec::new();
        for i in 0..3u8 {
            let (page_id, frame) = pool.new_page().unwrap();
            frame.data().write()[0] = i + 1;
            pool.unpin_page(page_id, true);
            page_ids.push(page_id);
        }

        pool.flush_all_pages();

        for (i, &page_id) in page_ids.iter().enumerate() {
            let mut buf = [0u8; PAGE_SIZE];
            disk.read_page(page_id, &mut buf).unwrap();
            assert_eq!(buf[0], i as u8 + 1);
        }
        assert_eq!(pool.stats().dirty_pages, 0);
    }

    #[test]
    fn test_delete_page() {
        let (pool, _disk) = create_test_pool(2, 2);

        // Deleting an unknown page succeeds trivially
        assert!(pool.delete_page(12));

        let (page_id, frame) = pool.new_page().unwrap();
        assert!(!pool.delete_page(page_id));

        pool.unpin_page(page_id, false);
        assert!(pool.delete_page(page_id));
        assert_eq!(frame.page_id(), INVALID_PAGE_ID);
        assert_eq!(pool.replacer_size(), 0);
        assert_eq!(pool.stats().pages_used, 0);

        // The frame is reusable without evicting anything
        let (_new_id, _new_frame) = pool.new_page().unwrap();
        assert_eq!(pool.stats().evictions, 0);
    }

    #[test]
    fn test_replacer_size_matches_unpinned_resident_pages() {
        let (pool, _disk) = create_test_pool(4, 2);

        let (a, _fa) = pool.new_page().unwrap();
        let (b, _fb) = pool.new_page().unwrap();
        let (_c, _fc) = pool.new_page().unwrap();
        assert_eq!(pool.replacer_size(), 0);

        pool.unpin_page(a, false);
        pool.unpin_page(b, false);
        assert_eq!(pool.replacer_size(), 2);

        let _ = pool.fetch_page(a).unwrap();
        assert_eq!(pool.replacer_size(), 1);
    }

    #[test]
    fn test_round_trip_through_eviction() {
        let (pool, _disk) = create_test_pool(2, 2);

        let (page_id, _) = pool.new_page().unwrap();
        {
            let mut writer = pool.fetch_page_write(page_id).unwrap();
            let data = writer.data_mut();
            for (i, byte) in data.iter_mut().enumerate() {
                *byte = (i % 251) as u8;
            }
        }
        pool.unpin_page(page_id, false);

        // Push the page out through two more allocations
        for _ in 0..2 {
            let (id, _) = pool.new_page().unwrap();
            pool.unpin_page(id, false);
        }

        let reader = pool.fetch_page_read(page_id).unwrap();
        for (i, &byte) in reader.data().iter().enumerate() {
            assert_eq!(byte, (i % 251) as u8);
        }
    }

    #[test]
    fn test_cache_hit_miss_tracking() {
        let (pool, _disk) = create_test_pool(2, 2);

        let stats = pool.stats();
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 0);
        assert!(stats.hit_rate().is_none());

        let (page_id, _) = pool.new_page().unwrap();
        let _ = pool.fetch_page(page_id).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 0);
        assert_eq!(stats.hit_rate(), Some(1.0));

        pool.reset_stats();
        let stats = pool.stats();
        assert_eq!(stats.total_accesses(), 0);
    }

    #[test]
    fn test_eviction_tracking() {
        let (pool, _disk) = create_test_pool(2, 2);

        for _ in 0..5 {
            let (page_id, _) = pool.new_page().unwrap();
            pool.unpin_page(page_id, false);
        }

        // 5 pages through a 2-frame pool: at least 3 evictions
        assert!(pool.stats().evictions >= 3);
    }

    #[test]
    fn test_concurrent_readers_see_identical_bytes() {
        let (pool, _disk) = create_test_pool(8, 2);

        let (page_id, frame) = pool.new_page().unwrap();
        {
            let mut writer = pool.fetch_page_write(page_id).unwrap();
            writer.data_mut()[0..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        }

        let mut handles = Vec::new();
        for _ in 0..100 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                let reader = pool.fetch_page_read(page_id).unwrap();
                let mut header = [0u8; 4];
                header.copy_from_slice(&reader.data()[0..4]);
                header
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), [0xDE, 0xAD, 0xBE, 0xEF]);
        }

        // Only the originating pin remains
        assert_eq!(frame.pin_count(), 1);
    }

    #[test]
    fn test_concurrent_writers_are_exclusive() {
        let (pool, _disk) = create_test_pool(4, 2);

        let (page_id, frame) = pool.new_page().unwrap();

        let mut handles = Vec::new();
        for _ in 0..100 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                let mut writer = pool.fetch_page_write(page_id).unwrap();
                let data = writer.data_mut();
                let len = data.iter().position(|&b| b == 0).unwrap();
                data[len] = b'#';
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let reader = pool.fetch_page_read(page_id).unwrap();
        assert!(reader.data()[0..100].iter().all(|&b| b == b'#'));
        assert_eq!(reader.data()[100], 0);
        drop(reader);
        assert_eq!(frame.pin_count(), 1);
    }

    #[test]
    fn test_concurrent_new_and_fetch_keep_one_frame_per_page() {
        let (pool, _disk) = create_test_pool(16, 2);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                let mut ids = Vec::new();
                for _ in 0..32 {
                    if let Some((page_id, _)) = pool.new_page() {
                        pool.unpin_page(page_id, false);
                        ids.push(page_id);
                    }
                }
                for &page_id in &ids {
                    if let Some(frame) = pool.fetch_page(page_id) {
                        assert_eq!(frame.page_id(), page_id);
                        pool.unpin_page(page_id, false);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every resident mapping points at a frame that agrees with it
        let state = pool.state.lock();
        for (&page_id, &frame_id) in &state.page_table {
            assert_eq!(pool.frames()[frame_id].page_id(), page_id);
        }
        assert!(state.page_table.len() <= pool.pool_size());
    }

    #[test]
    fn test_with_config_defaults() {
        let disk = Arc::new(MemoryDiskManager::new());
        let pool = BufferPoolManager::with_config(&BufferPoolConfig::default(), disk);
        assert_eq!(pool.pool_size(), DEFAULT_POOL_SIZE);
    }
}
