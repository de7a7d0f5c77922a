//! One mount lifetime of the file system.
//! The superblock and both bitmaps are loaded once and written back at checkpoints;
//! every core operation receives the session explicitly.

use alloc::sync::Arc;

use log::debug;

use crate::bitmap::Bitmap;
use crate::block_dev::Block;
use crate::error::FsError;
use crate::superblock::{read_superblock, write_superblock};
use crate::{BlockDevice, Result, SuperBlock};

pub struct Session<D: BlockDevice> {
    pub(crate) device: Arc<D>,
    pub(crate) superblock: SuperBlock,
    pub(crate) inode_bitmap: Bitmap,
    pub(crate) data_bitmap: Bitmap,
    superblock_dirty: bool,
}

impl<D: BlockDevice> Session<D> {
    /// Starts a session over a freshly laid out device; nothing is written yet.
    pub fn create(device: Arc<D>, superblock: SuperBlock) -> Self {
        Self {
            device,
            inode_bitmap: Bitmap::new(superblock.max_inodes),
            data_bitmap: Bitmap::new(superblock.max_data_blocks),
            superblock,
            superblock_dirty: true,
        }
    }

    /// Loads the superblock and both bitmaps of a formatted device.
    pub fn load(device: Arc<D>) -> Result<Self> {
        let superblock = read_superblock(&*device)?;
        if (device.num_blocks() as u64) < superblock.total_blocks() as u64 {
            return Err(FsError::InvalidSuperBlock);
        }
        let inode_bitmap =
            Bitmap::load(&*device, superblock.inode_bitmap_block, superblock.max_inodes)?;
        let data_bitmap =
            Bitmap::load(&*device, superblock.data_bitmap_block, superblock.max_data_blocks)?;
        debug!(
            "session: loaded {} inodes / {} data blocks, data region at block {}",
            superblock.max_inodes, superblock.max_data_blocks, superblock.data_region_start
        );
        Ok(Self {
            device,
            superblock,
            inode_bitmap,
            data_bitmap,
            superblock_dirty: false,
        })
    }

    /// Checkpoint: rewrites the superblock and bitmaps if they changed, then flushes the device.
    pub fn flush(&mut self) -> Result<()> {
        if self.is_dirty() {
            debug!("session: writing back superblock and bitmaps");
            write_superblock(&*self.device, &self.superblock)?;
            self.superblock_dirty = false;
        }
        self.inode_bitmap
            .store(&*self.device, self.superblock.inode_bitmap_block)?;
        self.data_bitmap
            .store(&*self.device, self.superblock.data_bitmap_block)?;
        self.device.flush()
    }

    /// Whether in-memory state differs from what the last checkpoint wrote.
    pub fn is_dirty(&self) -> bool {
        self.superblock_dirty || self.inode_bitmap.is_dirty() || self.data_bitmap.is_dirty()
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn inode_bitmap(&self) -> &Bitmap {
        &self.inode_bitmap
    }

    pub fn data_bitmap(&self) -> &Bitmap {
        &self.data_bitmap
    }

    /// Device block id of a data-region-relative block number.
    pub(crate) fn data_block_id(&self, block: u32) -> Result<u32> {
        if block >= self.superblock.max_data_blocks {
            return Err(FsError::OutOfBounds);
        }
        Ok(self.superblock.data_region_start + block)
    }

    pub(crate) fn read_data_block(&self, block: u32, buf: &mut Block) -> Result<()> {
        let block_id = self.data_block_id(block)?;
        self.device.read_block(block_id, buf)
    }

    pub(crate) fn write_data_block(&self, block: u32, buf: &Block) -> Result<()> {
        let block_id = self.data_block_id(block)?;
        self.device.write_block(block_id, buf)
    }
}
