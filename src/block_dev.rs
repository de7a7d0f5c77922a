use alloc::boxed::Box;

use crate::config::BLOCK_SIZE;
use crate::error::Result;

/// One block worth of bytes.
pub type Block = [u8; BLOCK_SIZE];

pub trait BlockDevice: Send + Sync {
    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> usize;

    /// Reads a block of data from the block device.
    fn read_block(&self, block_id: u32, buf: &mut Block) -> Result<()>;

    /// Writes a block of data to the block device.
    fn write_block(&self, block_id: u32, buf: &Block) -> Result<()>;

    /// Flushes any cached data to the block device.
    /// This is typically used to ensure that all writes are persisted.
    fn flush(&self) -> Result<()>;

    /// Returns the size of each block in bytes.
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }
}

/// A zeroed, heap allocated block buffer.
pub(crate) fn zeroed_block() -> Box<Block> {
    Box::new([0u8; BLOCK_SIZE])
}
