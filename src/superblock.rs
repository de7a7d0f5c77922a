use crate::block_dev::zeroed_block;
use crate::config::*;
use crate::error::FsError;
use crate::structs::{read_record, write_record};
use crate::{BlockDevice, Result, SuperBlock};

impl SuperBlock {
    /// Lays out a file system with the given inode and data block counts.
    pub fn new(max_inodes: u32, max_data_blocks: u32) -> Result<Self> {
        if max_inodes == 0 || max_inodes > BITS_PER_BITMAP {
            return Err(FsError::InvalidGeometry);
        }
        if max_data_blocks == 0 || max_data_blocks > BITS_PER_BITMAP {
            return Err(FsError::InvalidGeometry);
        }
        Ok(Self {
            magic: MAGIC,
            max_inodes,
            max_data_blocks,
            inode_bitmap_block: INODE_BITMAP_BLOCK,
            data_bitmap_block: DATA_BITMAP_BLOCK,
            inode_table_start: INODE_TABLE_START,
            data_region_start: INODE_TABLE_START + inode_table_blocks(max_inodes),
        })
    }

    /// Blocks occupied by the inode table.
    pub fn inode_table_blocks(&self) -> u32 {
        inode_table_blocks(self.max_inodes)
    }

    /// Smallest device, in blocks, able to hold this layout.
    pub fn total_blocks(&self) -> u32 {
        self.data_region_start + self.max_data_blocks
    }

    /// Checks the magic number and the fixed layout invariants.
    pub fn validate(&self) -> Result<()> {
        let expected = SuperBlock::new(self.max_inodes, self.max_data_blocks)
            .map_err(|_| FsError::InvalidSuperBlock)?;
        if *self != expected {
            return Err(FsError::InvalidSuperBlock);
        }
        Ok(())
    }
}

fn inode_table_blocks(max_inodes: u32) -> u32 {
    (max_inodes as usize * INODE_SIZE).div_ceil(BLOCK_SIZE) as u32
}

pub fn read_superblock<D: BlockDevice>(device: &D) -> Result<SuperBlock> {
    let mut buf = zeroed_block();
    device.read_block(SUPERBLOCK_ID, &mut buf)?;
    let superblock: SuperBlock = read_record(&buf, 0);
    superblock.validate()?;
    Ok(superblock)
}

pub fn write_superblock<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<()> {
    let mut buf = zeroed_block();
    write_record(&mut buf, 0, superblock);
    device.write_block(SUPERBLOCK_ID, &buf)?;
    Ok(())
}
