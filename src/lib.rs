//! TFS is a tiny file system that maps a flat store of fixed-size blocks into a hierarchy of
//! files and directories. Each inode has 16 direct pointers and nothing else, so files and
//! directories are bounded in size. There is no journaling and no permission checking.
//!
//! TFS File System's linear layout:
//! - Superblock (block 0)
//! - Inode Bitmap (block 1)
//! - Data Bitmap (block 2)
//! - Inode Table (block 3 ..)
//! - Data Blocks, numbered from 0 at the start of the region
//!
//! TFS's layers (from bottom to top):
//! 1. Block Device: Abstraction for low level devices.          | User implemented (hardware-specific)
//! 2. Cache: Optional write-back cache wrapping a device.       | Fs implemented, user chosen
//! 3. Session: In-memory superblock and bitmaps of one mount.   | Fs implemented
//! 4. Bitmap/Inode: Allocation and inode table records.         | Fs implemented
//! 5. Directory/Path: Directory entries and path resolution.    | Fs implemented
//! 6. File: File data access over direct blocks.                | Fs implemented
//! 7. FileSystem: Path based operations for a host adapter.     | Fs implemented (FUSE glue is user implemented)
//!
//! None of the layers lock anything; the host serializes mutating calls.
//!
//! Buffers and collections come from `alloc`. The only direct use of `std` is the
//! wall clock behind `unix_now`.

extern crate alloc;

mod config;
mod block_dev;
mod cache;
mod structs;
mod superblock;
mod bitmap;
mod session;
mod inode;
mod directory;
mod path;
mod file;
mod fs;
mod error;

pub use block_dev::{Block, BlockDevice};
pub use cache::*;
pub use config::*;
pub use superblock::*;
pub use structs::{check_name, DirEntry, FileType, Inode, SuperBlock};
pub use bitmap::*;
pub use session::Session;
pub use inode::*;
pub use directory::*;
pub use path::*;
pub use file::*;
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
