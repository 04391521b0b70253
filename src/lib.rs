//! rupool - a fixed-capacity page cache for disk-resident paged stores.
//!
//! The crate provides the storage substrate a database engine sits on:
//! - A [`BufferPoolManager`] owning a fixed array of page frames
//! - LRU-K eviction ([`storage::buffer_pool::LruKReplacer`])
//! - A background [`DiskScheduler`](storage::page::DiskScheduler) decoupling
//!   callers from disk latency
//! - RAII page guards tying pins and frame latches to lexical scope

pub mod error;
pub mod storage;

pub use error::{Result, RupoolError};
pub use storage::{
    BufferPoolConfig, BufferPoolManager, BufferPoolStats, DiskManager, FileDiskManager, Frame,
    MemoryDiskManager, PageGuard, PageId, ReadPageGuard, WritePageGuard, INVALID_PAGE_ID,
    PAGE_SIZE,
};
