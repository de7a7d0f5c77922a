use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::block_dev::zeroed_block;
use crate::config::*;
use crate::directory::{dir_add, dir_find, dir_is_empty, dir_remove, read_dir};
use crate::file::{file_read, file_truncate, file_write, release_blocks};
use crate::inode::{init_inode, read_inode, write_inode};
use crate::path::{resolve, split};
use crate::session::Session;
use crate::structs::*;
use crate::{BlockDevice, Error, Result};

/// Attributes reported for `getattr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttr {
    pub ino: u32,
    pub ftype: FileType,
    pub mode: u32,
    pub links: u32,
    pub size: u64,
    pub blocks: u32,
    pub mtime: u64,
}

impl From<&Inode> for FileAttr {
    fn from(inode: &Inode) -> Self {
        Self {
            ino: inode.ino,
            ftype: inode.ftype,
            mode: inode.mode,
            links: inode.links,
            size: inode.size,
            blocks: inode.blocks(),
            mtime: inode.mtime,
        }
    }
}

/// Usage figures reported for `statfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub block_size: u32,
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub total_inodes: u32,
    pub free_inodes: u32,
    pub max_name_len: u32,
}

/// Path based entry points for a host adapter (FUSE or similar).
/// Methods that mutate take `&mut self`; wrap the instance in a lock if it is shared.
pub struct FileSystem<D: BlockDevice> {
    session: Session<D>,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Lays out an empty file system on `device` and creates the root directory.
    pub fn format(device: Arc<D>, max_inodes: u32, max_data_blocks: u32) -> Result<Self> {
        let superblock = SuperBlock::new(max_inodes, max_data_blocks)?;
        if (device.num_blocks() as u64) < superblock.total_blocks() as u64 {
            return Err(Error::InvalidGeometry);
        }

        // Stale records must not look valid to the new bitmaps.
        let zero_block = zeroed_block();
        for i in 0..superblock.inode_table_blocks() {
            device.write_block(superblock.inode_table_start + i, &zero_block)?;
        }

        let mut session = Session::create(device, superblock);
        let root = init_inode(&mut session, FileType::Directory, ROOT_MODE)?;
        debug_assert_eq!(root.ino, ROOT_INODE_ID);
        session.flush()?;
        debug!(
            "format: {} inodes, {} data blocks, data region at block {}",
            max_inodes, max_data_blocks, superblock.data_region_start
        );
        Ok(Self { session })
    }

    /// Opens a formatted device.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        let session = Session::load(device)?;
        let root = read_inode(&session, ROOT_INODE_ID)?;
        if !root.valid || !root.is_dir() || !session.inode_bitmap.get(ROOT_INODE_ID) {
            return Err(Error::InvalidSuperBlock);
        }
        Ok(Self { session })
    }

    /// Mounts `device`, formatting it first if it holds no file system.
    pub fn open_or_format(device: Arc<D>, max_inodes: u32, max_data_blocks: u32) -> Result<Self> {
        match Self::mount(Arc::clone(&device)) {
            Err(Error::InvalidSuperBlock) => {
                debug!("mount: no file system found, formatting");
                Self::format(device, max_inodes, max_data_blocks)
            }
            other => other,
        }
    }

    /// Writes the superblock and bitmaps back and flushes the device.
    pub fn flush(&mut self) -> Result<()> {
        self.session.flush()
    }

    /// Ends the session.
    pub fn unmount(mut self) -> Result<()> {
        self.session.flush()
    }

    // Following methods resolve paths from the root, as a host adapter would.

    pub fn lookup(&self, path: &str) -> Result<Inode> {
        resolve(&self.session, path, ROOT_INODE_ID)
    }

    pub fn getattr(&self, path: &str) -> Result<FileAttr> {
        self.lookup(path).map(|inode| FileAttr::from(&inode))
    }

    pub fn get_inode(&self, inode_id: u32) -> Result<Inode> {
        read_inode(&self.session, inode_id)
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = self.lookup(path)?;
        read_dir(&self.session, &dir)
    }

    pub fn opendir(&self, path: &str) -> Result<u32> {
        let dir = self.lookup(path)?;
        if !dir.is_dir() {
            return Err(Error::NotDirectory);
        }
        Ok(dir.ino)
    }

    pub fn releasedir(&self, path: &str) -> Result<()> {
        self.opendir(path).map(|_| ())
    }

    /// Creates an empty regular file. Returns its inode ID.
    pub fn create(&mut self, path: &str, mode: u32) -> Result<u32> {
        self.make_node(path, FileType::Regular, mode)
    }

    /// Creates an empty directory. Returns its inode ID.
    pub fn mkdir(&mut self, path: &str, mode: u32) -> Result<u32> {
        self.make_node(path, FileType::Directory, mode)
    }

    fn make_node(&mut self, path: &str, ftype: FileType, mode: u32) -> Result<u32> {
        let (parent_path, name) = split(path)?;
        let mut parent = self.lookup(parent_path)?;
        // Checked before allocating, so a taken name does not leak an inode.
        match dir_find(&self.session, &parent, name.as_bytes()) {
            Ok(_) => return Err(Error::AlreadyExists),
            Err(Error::NotFound) => {}
            Err(e) => return Err(e),
        }

        let child = init_inode(&mut self.session, ftype, mode)?;
        dir_add(&mut self.session, &mut parent, child.ino, name.as_bytes())?;
        if ftype == FileType::Directory {
            parent.links += 1;
            write_inode(&self.session, &parent)?;
        }
        debug!("created {} as inode {}", path, child.ino);
        Ok(child.ino)
    }

    /// Removes a regular file and gives its data blocks back.
    pub fn unlink(&mut self, path: &str) -> Result<()> {
        let (parent_path, name) = split(path)?;
        let mut parent = self.lookup(parent_path)?;
        let mut target = dir_find(&self.session, &parent, name.as_bytes())?;
        if !target.is_file() {
            return Err(Error::NotFile);
        }
        release_blocks(&mut self.session, &mut target)?;
        write_inode(&self.session, &target)?;
        dir_remove(&mut self.session, &mut parent, name.as_bytes())?;
        debug!("unlinked {}", path);
        Ok(())
    }

    /// Removes an empty directory.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        let (parent_path, name) = split(path)?;
        let mut parent = self.lookup(parent_path)?;
        let target = dir_find(&self.session, &parent, name.as_bytes())?;
        if !target.is_dir() {
            return Err(Error::NotDirectory);
        }
        if !dir_is_empty(&target)? {
            return Err(Error::NotEmpty);
        }
        dir_remove(&mut self.session, &mut parent, name.as_bytes())?;
        parent.links = parent.links.saturating_sub(1);
        write_inode(&self.session, &parent)?;
        debug!("removed directory {}", path);
        Ok(())
    }

    /// Existence check for a regular file. Returns its inode ID.
    pub fn open(&self, path: &str) -> Result<u32> {
        let inode = self.lookup(path)?;
        if !inode.is_file() {
            return Err(Error::NotFile);
        }
        Ok(inode.ino)
    }

    pub fn close(&self, inode_id: u32) -> Result<()> {
        // Every write already reached the inode table.
        let inode = self.get_inode(inode_id)?;
        if !inode.valid {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    pub fn read(&self, path: &str, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let inode = self.lookup(path)?;
        file_read(&self.session, &inode, offset, buf)
    }

    pub fn write(&mut self, path: &str, offset: usize, buf: &[u8]) -> Result<usize> {
        let mut inode = self.lookup(path)?;
        file_write(&mut self.session, &mut inode, offset, buf)
    }

    pub fn truncate(&mut self, path: &str, size: usize) -> Result<()> {
        let mut inode = self.lookup(path)?;
        file_truncate(&mut self.session, &mut inode, size)
    }

    pub fn utimens(&mut self, path: &str, mtime: u64) -> Result<()> {
        let mut inode = self.lookup(path)?;
        inode.mtime = mtime;
        write_inode(&self.session, &inode)
    }

    pub fn statfs(&self) -> StatFs {
        let sb = &self.session.superblock;
        StatFs {
            block_size: BLOCK_SIZE as u32,
            total_blocks: sb.max_data_blocks,
            free_blocks: sb.max_data_blocks - self.session.data_bitmap.count_set(),
            total_inodes: sb.max_inodes,
            free_inodes: sb.max_inodes - self.session.inode_bitmap.count_set(),
            max_name_len: MAX_FILE_NAME_LEN as u32,
        }
    }

    /// Human readable summary of the layout and usage.
    pub fn dump(&self) -> String {
        let sb = &self.session.superblock;
        let stat = self.statfs();
        format!(
            "tfs magic {:#x}: inode bitmap @{}, data bitmap @{}, inode table @{}..{}, data @{}; \
             inodes {}/{} free, data blocks {}/{} free",
            sb.magic,
            sb.inode_bitmap_block,
            sb.data_bitmap_block,
            sb.inode_table_start,
            sb.data_region_start,
            sb.data_region_start,
            stat.free_inodes,
            stat.total_inodes,
            stat.free_blocks,
            stat.total_blocks,
        )
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.session.superblock
    }

    pub fn session(&self) -> &Session<D> {
        &self.session
    }

    /// Direct access to the core layers, for callers that work with inodes instead of paths.
    pub fn session_mut(&mut self) -> &mut Session<D> {
        &mut self.session
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.session.device)
    }
}

impl<D: BlockDevice> Drop for FileSystem<D> {
    fn drop(&mut self) {
        // A clean session can still have data sitting in a cached device.
        let result = if self.session.is_dirty() {
            self.session.flush()
        } else {
            self.session.device.flush()
        };
        if let Err(e) = result {
            warn!("checkpoint on drop failed: {}", e);
        }
    }
}
