//! Background scheduler serializing disk I/O requests.
//!
//! Callers hand [`DiskRequest`]s to [`DiskScheduler::schedule`] and wait on
//! the request's completion channel if they need the result. A single
//! background worker drains the queue in FIFO order, so completions for the
//! same page always happen in submission order.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::RwLock;

use crate::storage::page::{DiskManager, PageData, PageId};

/// A single read or write request for the disk manager to execute.
pub struct DiskRequest {
    /// Flag indicating whether the request is a write or a read.
    pub is_write: bool,
    /// Shared handle to the page buffer being read into (on a read) or
    /// written out from (on a write). The scheduler never copies page bytes;
    /// the buffer must stay alive until the completion signal resolves,
    /// which the shared handle guarantees.
    pub data: Arc<RwLock<PageData>>,
    /// ID of the page being read from / written to disk.
    pub page_id: PageId,
    /// One-shot channel used to signal the issuer when the request has
    /// completed. Resolves to `false` if the disk operation failed.
    pub callback: Sender<bool>,
}

/// Schedules disk read and write operations on a background worker thread.
///
/// The worker is spawned on construction and joined on drop. Dropping the
/// scheduler enqueues a shutdown sentinel behind any pending requests, so
/// everything scheduled before destruction still completes.
pub struct DiskScheduler {
    request_tx: Sender<Option<DiskRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Creates a scheduler over the given disk manager and starts its
    /// worker thread.
    #[must_use]
    pub fn new(disk_manager: Arc<dyn DiskManager>) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let worker = std::thread::spawn(move || Self::worker_loop(&request_rx, &*disk_manager));

        Self {
            request_tx,
            worker: Some(worker),
        }
    }

    /// Schedules a request for the disk manager to execute.
    ///
    /// Non-blocking; the request queue is unbounded.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread has terminated, which only happens once
    /// the scheduler is being dropped.
    pub fn schedule(&self, request: DiskRequest) {
        self.request_tx
            .send(Some(request))
            .expect("disk scheduler worker has shut down");
    }

    fn worker_loop(requests: &Receiver<Option<DiskRequest>>, disk: &dyn DiskManager) {
        // `None` is the shutdown sentinel enqueued by the destructor.
        while let Ok(Some(request)) = requests.recv() {
            let ok = if request.is_write {
                let data = request.data.read();
                disk.write_page(request.page_id, &data[..]).is_ok()
            } else {
                let mut data = request.data.write();
                disk.read_page(request.page_id, &mut data[..]).is_ok()
            };

            // The issuer may have stopped waiting; completion is then moot.
            let _ = request.callback.send(ok);
        }
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        let _ = self.request_tx.send(None);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
