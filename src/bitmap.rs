//! Management of data bitmap and inode bitmap.
//! Both bitmaps live in memory for the whole session and are written back
//! to their fixed blocks only at checkpoints (see `Session::flush`).
//! Allocation is first fit: the lowest clear bit always wins.

use alloc::boxed::Box;

use log::trace;

use crate::block_dev::{Block, zeroed_block};
use crate::error::FsError;
use crate::session::Session;
use crate::{BlockDevice, Result};

/// A one-block bit array, bit `i` lives in byte `i / 8`, bit `i % 8`.
pub struct Bitmap {
    bits: Box<Block>,
    len: u32,
    dirty: bool,
}

impl Bitmap {
    /// An all-clear bitmap tracking `len` items. It starts dirty so that it gets written.
    pub fn new(len: u32) -> Self {
        Self {
            bits: zeroed_block(),
            len,
            dirty: true,
        }
    }

    pub fn load(device: &impl BlockDevice, block_id: u32, len: u32) -> Result<Self> {
        let mut bits = zeroed_block();
        device.read_block(block_id, &mut bits)?;
        Ok(Self {
            bits,
            len,
            dirty: false,
        })
    }

    /// Writes the bitmap to `block_id` if it changed since the last store.
    pub fn store(&mut self, device: &impl BlockDevice, block_id: u32) -> Result<()> {
        if self.dirty {
            device.write_block(block_id, &self.bits)?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, item: u32) -> bool {
        if item >= self.len {
            return false;
        }
        self.bits[(item / 8) as usize] & (1 << (item % 8)) != 0
    }

    /// Sets or clears a bit. Returns the previous value.
    pub fn put(&mut self, item: u32, value: bool) -> Result<bool> {
        if item >= self.len {
            return Err(FsError::OutOfBounds);
        }
        let byte = &mut self.bits[(item / 8) as usize];
        let mask = 1u8 << (item % 8);
        let prev = *byte & mask != 0;
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        self.dirty = true;
        Ok(prev)
    }

    /// Lowest clear bit, if any.
    pub fn first_clear(&self) -> Option<u32> {
        let num_bytes = self.len.div_ceil(8) as usize;
        for (i, &byte) in self.bits[..num_bytes].iter().enumerate() {
            if byte == u8::MAX {
                continue;
            }
            let item = i as u32 * 8 + byte.trailing_ones();
            if item < self.len {
                return Some(item);
            }
        }
        None
    }

    pub fn count_set(&self) -> u32 {
        (0..self.len).filter(|&i| self.get(i)).count() as u32
    }
}

// Public API for managing data bitmap and inode bitmap.

/// Allocates a new inode number, setting bit in the inode bitmap.
/// The inode record itself is initialized by the inode layer.
pub fn alloc_inode_id<D: BlockDevice>(session: &mut Session<D>) -> Result<u32> {
    let inode_id = session.inode_bitmap.first_clear().ok_or(FsError::NoSpace)?;
    session.inode_bitmap.put(inode_id, true)?;
    trace!("bitmap: allocated inode {}", inode_id);
    Ok(inode_id)
}

/// Frees an inode number, clearing bit in the inode bitmap.
pub fn free_inode_id<D: BlockDevice>(session: &mut Session<D>, inode_id: u32) -> Result<()> {
    session.inode_bitmap.put(inode_id, false)?;
    trace!("bitmap: freed inode {}", inode_id);
    Ok(())
}

/// Allocates a data block, setting bit in the data bitmap.
/// Returns the block number relative to the data region; the block content is left as is.
pub fn alloc_data_block<D: BlockDevice>(session: &mut Session<D>) -> Result<u32> {
    let block = session.data_bitmap.first_clear().ok_or(FsError::NoSpace)?;
    session.data_bitmap.put(block, true)?;
    trace!("bitmap: allocated data block {}", block);
    Ok(block)
}

/// Frees a data block, clearing bit in the data bitmap.
pub fn free_data_block<D: BlockDevice>(session: &mut Session<D>, block: u32) -> Result<()> {
    session.data_bitmap.put(block, false)?;
    trace!("bitmap: freed data block {}", block);
    Ok(())
}
