//! Management of reading and writing to inodes.
//! Several inodes share a table block, so every write is a read-modify-write
//! of the owning block.

use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::bitmap::{alloc_inode_id, free_inode_id};
use crate::block_dev::zeroed_block;
use crate::config::*;
use crate::error::FsError;
use crate::session::Session;
use crate::structs::{DiskInode, read_record, write_record};
use crate::{BlockDevice, FileType, Inode, Result};

/// Location of an inode record: (table block id, byte offset inside the block).
fn inode_pos<D: BlockDevice>(session: &Session<D>, inode_id: u32) -> Result<(u32, usize)> {
    if inode_id >= session.superblock.max_inodes {
        return Err(FsError::OutOfBounds);
    }
    let block_id = session.superblock.inode_table_start + inode_id / INODES_PER_BLOCK as u32;
    let block_inner_offset = (inode_id as usize % INODES_PER_BLOCK) * INODE_SIZE;
    Ok((block_id, block_inner_offset))
}

pub fn read_inode<D: BlockDevice>(session: &Session<D>, inode_id: u32) -> Result<Inode> {
    let (block_id, offset) = inode_pos(session, inode_id)?;
    let mut buf = zeroed_block();
    session.device.read_block(block_id, &mut buf)?;
    let raw: DiskInode = read_record(&buf, offset);
    Inode::from_disk(&raw)
}

pub fn write_inode<D: BlockDevice>(session: &Session<D>, inode: &Inode) -> Result<()> {
    let (block_id, offset) = inode_pos(session, inode.ino)?;
    let mut buf = zeroed_block();
    // Sibling records share this block and must survive the write.
    session.device.read_block(block_id, &mut buf)?;
    write_record(&mut buf, offset, &inode.to_disk());
    session.device.write_block(block_id, &buf)?;
    Ok(())
}

/// Allocates an inode number and persists a fresh, valid record for it.
pub fn init_inode<D: BlockDevice>(
    session: &mut Session<D>,
    ftype: FileType,
    mode: u32,
) -> Result<Inode> {
    let inode_id = alloc_inode_id(session)?;
    let inode = Inode::new(inode_id, ftype, mode, unix_now());
    write_inode(session, &inode)?;
    debug!("inode: initialized {} as {:?}", inode_id, ftype);
    Ok(inode)
}

/// Marks an inode invalid and returns its number to the bitmap.
/// Data blocks are not touched; the record content stays on disk.
pub fn release_inode<D: BlockDevice>(session: &mut Session<D>, inode: &mut Inode) -> Result<()> {
    inode.valid = false;
    write_inode(session, inode)?;
    free_inode_id(session, inode.ino)?;
    debug!("inode: released {}", inode.ino);
    Ok(())
}

/// Seconds since the Unix epoch, used for modification times.
/// This is the one place the crate reaches for `std`.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
