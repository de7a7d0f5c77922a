pub const MAGIC: u32 = 0x5C3A;

pub const BLOCK_SIZE: usize = 4096;
pub const SUPERBLOCK_ID: u32 = 0; // Block ID for the superblock
pub const INODE_BITMAP_BLOCK: u32 = 1;
pub const DATA_BITMAP_BLOCK: u32 = 2;
pub const INODE_TABLE_START: u32 = 3;
pub const ROOT_INODE_ID: u32 = 0; // Inode ID for the root directory

pub const MAX_INODES: u32 = 1024; // Default inode count chosen at format time
pub const MAX_DATA_BLOCKS: u32 = 16384; // Default data region size chosen at format time
pub const BITS_PER_BITMAP: u32 = (BLOCK_SIZE * 8) as u32; // Each bitmap occupies exactly one block

pub const INODE_SIZE: usize = 128;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

pub const NUM_DIRECT_PTRS: usize = 16; // Number of direct pointers in an inode
pub const NULL_PTR: u32 = u32::MAX; // On-disk marker of an unused direct pointer
pub const MAX_FILE_SIZE: usize = NUM_DIRECT_PTRS * BLOCK_SIZE;

pub const DIR_ENTRY_SIZE: usize = 256; // Size of a directory entry (inode ID + flags + name)
pub const MAX_FILE_NAME_LEN: usize = DIR_ENTRY_SIZE - 8;
pub const NUM_ENTRY_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

pub const ROOT_MODE: u32 = 0o755;
