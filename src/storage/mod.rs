//! Storage layer for rupool.
//!
//! This module provides:
//! - Buffer pool management ([`buffer_pool`])
//! - Page-level primitives and disk I/O ([`page`])

pub mod buffer_pool;
pub mod page;

// Re-export commonly used types
pub use buffer_pool::{
    AccessType, BufferPoolConfig, BufferPoolManager, BufferPoolStats, Frame, LruKReplacer,
    PageGuard, ReadPageGuard, WritePageGuard,
};
pub use page::{
    DiskManager, DiskRequest, DiskScheduler, FileDiskManager, FrameId, MemoryDiskManager,
    PageData, PageId, INVALID_PAGE_ID, PAGE_SIZE,
};
