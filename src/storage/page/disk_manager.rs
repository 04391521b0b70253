//! Disk managers for page-level I/O.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Result, RupoolError};
use crate::storage::page::{PageData, PageId, PAGE_SIZE};

/// Byte-addressable paged blob store consumed by the buffer pool.
///
/// Implementations interpret page ids as offsets (`page_id * PAGE_SIZE`).
/// All methods take `&self`: the disk scheduler's worker thread and caller
/// threads share one manager behind an `Arc`.
pub trait DiskManager: Send + Sync {
    /// Reads exactly [`PAGE_SIZE`] bytes of the given page into `buf`.
    ///
    /// Pages that were never written read back as zeroes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Writes exactly [`PAGE_SIZE`] bytes from `buf` to the given page.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()>;

    /// Releases any underlying file handles.
    fn shut_down(&self);

    /// Advisory hook invoked when the buffer pool deletes a page.
    ///
    /// Implementations are not required to reclaim space.
    fn deallocate_page(&self, _page_id: PageId) {}
}

/// File-backed disk manager.
///
/// The disk manager handles:
/// - Reading and writing pages to/from a single database file
/// - Zero-filled reads for pages beyond the current file size
pub struct FileDiskManager {
    /// Path to the database file.
    path: PathBuf,
    /// File handle for the database file.
    file: Mutex<File>,
}

impl FileDiskManager {
    /// Opens or creates a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| RupoolError::StorageError(format!("Failed to open database file: {e}")))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Returns the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the size of the database file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    pub fn file_size(&self) -> Result<u64> {
        self.file
            .lock()
            .metadata()
            .map(|m| m.len())
            .map_err(|e| RupoolError::StorageError(format!("Failed to get file size: {e}")))
    }

    fn offset(page_id: PageId) -> u64 {
        (page_id as u64) * (PAGE_SIZE as u64)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "page buffer must be PAGE_SIZE bytes");
        let mut file = self.file.lock();

        file.seek(SeekFrom::Start(Self::offset(page_id)))
            .map_err(|e| RupoolError::StorageError(format!("Failed to seek to page: {e}")))?;

        match file.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // Page doesn't exist yet - read as zeroes
                buf.fill(0);
                Ok(())
            }
            Err(e) => Err(RupoolError::StorageError(format!(
                "Failed to read page {page_id}: {e}"
            ))),
        }
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "page buffer must be PAGE_SIZE bytes");
        let mut file = self.file.lock();

        file.seek(SeekFrom::Start(Self::offset(page_id)))
            .map_err(|e| RupoolError::StorageError(format!("Failed to seek to page: {e}")))?;

        file.write_all(buf)
            .map_err(|e| RupoolError::StorageError(format!("Failed to write page {page_id}: {e}")))
    }

    fn shut_down(&self) {
        // Flush buffered writes; the handle itself closes on drop.
        let _ = self.file.lock().sync_all();
    }
}

/// In-memory disk manager for testing.
///
/// Stores page images in a hash map. Reads of never-written pages yield
/// zeroed buffers, matching the file-backed manager's behavior past EOF.
#[derive(Default)]
pub struct MemoryDiskManager {
    pages: Mutex<HashMap<PageId, Box<PageData>>>,
}

impl MemoryDiskManager {
    /// Creates an empty in-memory disk manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct pages that have been written.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "page buffer must be PAGE_SIZE bytes");
        match self.pages.lock().get(&page_id) {
            Some(data) => buf.copy_from_slice(&data[..]),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "page buffer must be PAGE_SIZE bytes");
        let mut data: Box<PageData> = Box::new([0u8; PAGE_SIZE]);
        data.copy_from_slice(buf);
        self.pages.lock().insert(page_id, data);
        Ok(())
    }

    fn shut_down(&self) {}

    fn deallocate_page(&self, page_id: PageId) {
        self.pages.lock().remove(&page_id);
    }
}
