//! RAII guards tying page pins and frame latches to lexical scope.
//!
//! [`PageGuard`] holds a pin and nothing else: the frame stays resident but
//! its bytes are not accessible. Upgrading acquires the frame's shared or
//! exclusive latch and yields a [`ReadPageGuard`] or [`WritePageGuard`],
//! which expose the bytes for the guard's whole lifetime. Dropping any guard
//! releases its latch first and then returns the pin to the pool, with the
//! dirty flag a writer accumulated.
//!
//! Guards are move-only values; a moved-from guard no longer exists, so the
//! drop-twice and dangling-source hazards of hand-rolled ownership do not
//! arise.

use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::RawRwLock;

use crate::storage::buffer_pool::{BufferPoolManager, Frame};
use crate::storage::page::{PageData, PageId};

/// A pinned page without any latch held.
///
/// While the guard lives, the referenced frame's pin count is at least one,
/// so the page cannot be evicted. The guard borrows the pool, so no guard
/// can outlive the buffer pool manager that issued it.
pub struct PageGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame: Arc<Frame>,
    page_id: PageId,
    is_dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, page_id: PageId, frame: Arc<Frame>) -> Self {
        Self {
            bpm,
            frame,
            page_id,
            is_dirty: false,
        }
    }

    /// Returns the id of the guarded page.
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Acquires the frame's shared latch, converting this guard into a
    /// [`ReadPageGuard`]. Blocks while a writer holds the latch.
    #[must_use]
    pub fn upgrade_read(self) -> ReadPageGuard<'a> {
        let latch = self.frame.data().read_arc();
        ReadPageGuard { latch, guard: self }
    }

    /// Acquires the frame's exclusive latch, converting this guard into a
    /// [`WritePageGuard`]. Blocks while any reader or writer holds the latch.
    #[must_use]
    pub fn upgrade_write(self) -> WritePageGuard<'a> {
        let latch = self.frame.data().write_arc();
        WritePageGuard { latch, guard: self }
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_page(self.page_id, self.is_dirty);
    }
}

/// A pinned page with the frame's shared latch held.
///
/// Constructed by [`PageGuard::upgrade_read`] or
/// [`BufferPoolManager::fetch_page_read`].
pub struct ReadPageGuard<'a> {
    // Declared before `guard`: the latch is released before the unpin.
    latch: ArcRwLockReadGuard<RawRwLock, PageData>,
    guard: PageGuard<'a>,
}

impl ReadPageGuard<'_> {
    /// Returns the id of the guarded page.
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.guard.page_id
    }

    /// Returns a read-only view of the page bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.latch[..]
    }
}

/// A pinned page with the frame's exclusive latch held.
///
/// Constructed by [`PageGuard::upgrade_write`] or
/// [`BufferPoolManager::fetch_page_write`]. Taking a mutable view marks the
/// guard dirty, so the eventual unpin records the modification.
pub struct WritePageGuard<'a> {
    // Declared before `guard`: the latch is released before the unpin.
    latch: ArcRwLockWriteGuard<RawRwLock, PageData>,
    guard: PageGuard<'a>,
}

impl WritePageGuard<'_> {
    /// Returns the id of the guarded page.
    #[must_use]
    pub fn page_id(&self) -> PageId {
        self.guard.page_id
    }

    /// Returns a read-only view of the page bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.latch[..]
    }

    /// Returns a mutable view of the page bytes and marks the guard dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.guard.is_dirty = true;
        &mut self.latch[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::buffer_pool::BufferPoolManager;
    use crate::storage::page::{DiskManager, MemoryDiskManager};
    use rand::{Rng, SeedableRng};

    fn create_test_pool(pool_size: usize) -> Arc<BufferPoolManager> {
        let disk = Arc::new(MemoryDiskManager::new());
        Arc::new(BufferPoolManager::new(
            pool_size,
            disk as Arc<dyn DiskManager>,
            2,
        ))
    }

    #[test]
    fn test_guard_unpins_on_scope_exit() {
        let pool = create_test_pool(5);

        let page_id = {
            let guard = pool.new_page_guarded().unwrap();
            guard.page_id()
        };

        // The scoped guard gave its pin back; only the fresh fetch pins now
        let frame = pool.fetch_page(page_id).unwrap();
        assert_eq!(frame.pin_count(), 1);
    }

    #[test]
    fn test_upgrade_read_keeps_single_pin() {
        let pool = create_test_pool(5);
        let (page_id, frame) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let reader = pool.fetch_page_basic(page_id).unwrap().upgrade_read();
            assert_eq!(reader.page_id(), page_id);
            assert_eq!(frame.pin_count(), 1);
        }
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_upgrade_write_keeps_single_pin() {
        let pool = create_test_pool(5);
        let (page_id, frame) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let mut writer = pool.fetch_page_basic(page_id).unwrap().upgrade_write();
            writer.data_mut()[0] = 1;
            assert_eq!(frame.pin_count(), 1);
        }
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_move_transfers_the_pin() {
        let pool = create_test_pool(5);

        let guard = pool.new_page_guarded().unwrap();
        let page_id = guard.page_id();
        let frame = pool.fetch_page(page_id).unwrap();
        pool.unpin_page(page_id, false);
        assert_eq!(frame.pin_count(), 1);

        // Moving the guard does not touch the pin count
        let moved = guard;
        assert_eq!(frame.pin_count(), 1);

        // Dropping the moved-to guard performs exactly one unpin
        drop(moved);
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_writer_dirty_propagates_on_drop() {
        let pool = create_test_pool(5);
        let (page_id, frame) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let mut writer = pool.fetch_page_write(page_id).unwrap();
            writer.data_mut()[0] = 0x7F;
        }
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_reader_leaves_page_clean() {
        let pool = create_test_pool(5);
        let (page_id, frame) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let writer = pool.fetch_page_write(page_id).unwrap();
            assert_eq!(writer.data()[0], 0);
        }
        {
            let reader = pool.fetch_page_read(page_id).unwrap();
            assert_eq!(reader.data()[0], 0);
        }
        // Neither guard took a mutable view
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_shared_latch_admits_many_readers() {
        let pool = create_test_pool(5);
        let (page_id, frame) = pool.new_page().unwrap();

        let first = pool.fetch_page_read(page_id).unwrap();
        let second = pool.fetch_page_read(page_id).unwrap();
        assert_eq!(first.data()[0], second.data()[0]);
        assert_eq!(frame.pin_count(), 3);

        drop(first);
        drop(second);
        assert_eq!(frame.pin_count(), 1);
    }

    #[test]
    fn test_guarded_round_trip_with_random_bytes() {
        let pool = create_test_pool(2);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);

        let (page_id, _) = pool.new_page().unwrap();
        let expected: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
        {
            let mut writer = pool.fetch_page_write(page_id).unwrap();
            writer.data_mut()[0..64].copy_from_slice(&expected);
        }
        pool.unpin_page(page_id, false);

        // Evict the page, then read it back through a guard
        for _ in 0..2 {
            let (id, _) = pool.new_page().unwrap();
            pool.unpin_page(id, false);
        }
        let reader = pool.fetch_page_read(page_id).unwrap();
        assert_eq!(&reader.data()[0..64], &expected[..]);
    }
}
