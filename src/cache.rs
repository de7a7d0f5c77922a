//! In TFS, cache layer is implemented as a block device that wraps 'real' block devices.
//! The storage engine itself never caches beyond a single call; wrapping the device
//! keeps the cache invisible to it.
//!
//! The cache is write-back: dirty blocks reach the inner device when they are evicted
//! or when the wrapper is flushed.

use alloc::boxed::Box;
use core::num::NonZeroUsize;

use log::{trace, warn};
use spin::Mutex;

use crate::block_dev::Block;
use crate::{BlockDevice, Result};

/// Writes one block to the device behind a cache.
pub type WriteBack<'a> = &'a dyn Fn(u32, &Block) -> Result<()>;

pub trait Cache: Send + Sync {
    /// Copies a cached block into `buf`. Returns false on a cache miss.
    fn read_cache(&self, block_id: u32, buf: &mut Block) -> bool;

    /// Stores a block in the cache.
    /// A dirty line evicted to make room goes through `write_back` first; if that
    /// fails, the line stays cached and the new block is not stored.
    fn write_cache(&self, block_id: u32, buf: &Block, dirty: bool, write_back: WriteBack<'_>) -> Result<()>;

    /// Passes every dirty block to `write_back`. A line is marked clean only once
    /// its write succeeded.
    fn write_back_dirty(&self, write_back: WriteBack<'_>) -> Result<()>;
}

pub struct Cached<D: BlockDevice, C: Cache> {
    device: D,
    cache: C,
}

impl<D, C> Cached<D, C>
where
    D: BlockDevice,
    C: Cache,
{
    pub fn new(device: D, cache: C) -> Self {
        Cached { device, cache }
    }

    /// The wrapped device. Blocks still dirty in the cache are not visible through it.
    pub fn inner(&self) -> &D {
        &self.device
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn write_inner(&self, block_id: u32, data: &Block) -> Result<()> {
        trace!("cache: writing back block {}", block_id);
        self.device.write_block(block_id, data)
    }
}

impl<D, C> BlockDevice for Cached<D, C>
where
    D: BlockDevice,
    C: Cache,
{
    fn block_size(&self) -> usize {
        self.device.block_size()
    }

    fn num_blocks(&self) -> usize {
        self.device.num_blocks()
    }

    fn read_block(&self, block_id: u32, buf: &mut Block) -> Result<()> {
        if self.cache.read_cache(block_id, buf) {
            return Ok(());
        }
        self.device.read_block(block_id, buf)?;
        self.cache
            .write_cache(block_id, buf, false, &|id: u32, data: &Block| self.write_inner(id, data))
    }

    fn write_block(&self, block_id: u32, buf: &Block) -> Result<()> {
        if block_id as usize >= self.device.num_blocks() {
            return Err(crate::Error::InvalidBlockId);
        }
        self.cache
            .write_cache(block_id, buf, true, &|id: u32, data: &Block| self.write_inner(id, data))
    }

    fn flush(&self) -> Result<()> {
        self.cache
            .write_back_dirty(&|id: u32, data: &Block| self.write_inner(id, data))?;
        self.device.flush()
    }
}

impl<D: BlockDevice, C: Cache> Drop for Cached<D, C> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("cache: write-back on drop failed: {}", e);
        }
    }
}

struct CacheLine {
    data: Box<Block>,
    dirty: bool,
}

/// Least-recently-used block cache with a fixed number of lines.
pub struct LruCache {
    lines: Mutex<lru::LruCache<u32, CacheLine>>,
}

impl LruCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            lines: Mutex::new(lru::LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Cache for LruCache {
    fn read_cache(&self, block_id: u32, buf: &mut Block) -> bool {
        match self.lines.lock().get(&block_id) {
            Some(line) => {
                buf.copy_from_slice(line.data.as_ref());
                true
            }
            None => false,
        }
    }

    fn write_cache(&self, block_id: u32, buf: &Block, dirty: bool, write_back: WriteBack<'_>) -> Result<()> {
        let mut lines = self.lines.lock();
        if let Some(line) = lines.get_mut(&block_id) {
            line.data.copy_from_slice(buf);
            line.dirty |= dirty;
            return Ok(());
        }
        if lines.len() == lines.cap().get() {
            if let Some((&victim, line)) = lines.peek_lru() {
                if line.dirty {
                    write_back(victim, &*line.data)?;
                }
            }
            lines.pop_lru();
        }
        lines.put(
            block_id,
            CacheLine {
                data: Box::new(*buf),
                dirty,
            },
        );
        Ok(())
    }

    fn write_back_dirty(&self, write_back: WriteBack<'_>) -> Result<()> {
        let mut lines = self.lines.lock();
        for (&block_id, line) in lines.iter_mut() {
            if line.dirty {
                write_back(block_id, &*line.data)?;
                line.dirty = false;
            }
        }
        Ok(())
    }
}
