//! Common utilities for tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tfs::{Block, BlockDevice, Error, FileSystem, Result, SuperBlock, BLOCK_SIZE};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// In-memory block device. Clones share the same storage.
#[derive(Clone)]
pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    num_blocks: usize,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified number of blocks.
    /// Each block is BLOCK_SIZE bytes.
    pub fn new(num_blocks: usize) -> Self {
        let size = num_blocks * BLOCK_SIZE;
        RamDisk {
            inner: Arc::new(Mutex::new(vec![0u8; size])),
            num_blocks,
        }
    }

    /// A disk exactly large enough for the given geometry.
    pub fn for_geometry(max_inodes: u32, max_data_blocks: u32) -> Self {
        let sb = SuperBlock::new(max_inodes, max_data_blocks).unwrap();
        Self::new(sb.total_blocks() as usize)
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: u32, buf: &mut Block) -> Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(Error::InvalidBlockId);
        }
        let start = block_id as usize * BLOCK_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: u32, buf: &Block) -> Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(Error::InvalidBlockId);
        }
        let start = block_id as usize * BLOCK_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // In a RAM disk, flushing is a no-op since data is already in memory.
        Ok(())
    }
}

/// A RamDisk that can be told to fail every request.
pub struct FaultyDisk {
    disk: RamDisk,
    failing: AtomicBool,
}

impl FaultyDisk {
    pub fn new(disk: RamDisk) -> Self {
        Self {
            disk,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::IoError);
        }
        Ok(())
    }
}

impl BlockDevice for FaultyDisk {
    fn num_blocks(&self) -> usize {
        self.disk.num_blocks()
    }

    fn read_block(&self, block_id: u32, buf: &mut Block) -> Result<()> {
        self.check()?;
        self.disk.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: u32, buf: &Block) -> Result<()> {
        self.check()?;
        self.disk.write_block(block_id, buf)
    }

    fn flush(&self) -> Result<()> {
        self.check()
    }
}

/// Formats a fresh RamDisk. The disk handle is returned for remounting.
pub fn fresh_fs(max_inodes: u32, max_data_blocks: u32) -> (RamDisk, FileSystem<RamDisk>) {
    let rd = RamDisk::for_geometry(max_inodes, max_data_blocks);
    let fs = FileSystem::format(Arc::new(rd.clone()), max_inodes, max_data_blocks).unwrap();
    (rd, fs)
}

/// Every inode is marked in the bitmap exactly when its record is valid.
pub fn assert_bitmap_consistent<D: BlockDevice>(fs: &FileSystem<D>) {
    let max_inodes = fs.superblock().max_inodes;
    for ino in 0..max_inodes {
        let in_bitmap = fs.session().inode_bitmap().get(ino);
        let valid = fs.get_inode(ino).unwrap().valid;
        assert_eq!(in_bitmap, valid, "inode {} bitmap {} valid {}", ino, in_bitmap, valid);
    }
}
