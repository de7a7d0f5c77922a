//! Directory entries packed into the data blocks of a directory inode.
//! Removed entries are only flagged invalid, and their slots are reused by later insertions.
//! A block whose last live entry goes away is handed back to the data bitmap.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{debug, trace};

use crate::bitmap::{alloc_data_block, free_data_block};
use crate::block_dev::{Block, zeroed_block};
use crate::config::*;
use crate::error::{FsError, Result};
use crate::inode::{read_inode, release_inode, unix_now, write_inode};
use crate::session::Session;
use crate::structs::*;
use crate::BlockDevice;

/// A live entry found by `locate`, together with the block holding it.
struct Located {
    ptr_index: usize,
    block: u32,
    entry_index: usize,
    entry: DirEntry,
    buf: Box<Block>,
}

fn check_dir(dir: &Inode) -> Result<()> {
    if !dir.valid || !dir.is_dir() {
        return Err(FsError::NotDirectory);
    }
    Ok(())
}

fn entry_offset(entry_index: usize) -> usize {
    entry_index * DIR_ENTRY_SIZE
}

/// Scans every allocated block of `dir` for a live entry called `name`.
fn locate<D: BlockDevice>(session: &Session<D>, dir: &Inode, name: &[u8]) -> Result<Option<Located>> {
    for (ptr_index, ptr) in dir.direct_ptrs.iter().enumerate() {
        let Some(block) = *ptr else { continue };
        let mut buf = zeroed_block();
        session.read_data_block(block, &mut buf)?;
        for entry_index in 0..NUM_ENTRY_PER_BLOCK {
            let entry: DirEntry = read_record(&buf, entry_offset(entry_index));
            if !entry.is_valid() {
                continue;
            }
            trace!("[locate] block {} entry {}: {}", block, entry_index, entry.name_str());
            if entry.name() == name {
                return Ok(Some(Located {
                    ptr_index,
                    block,
                    entry_index,
                    entry,
                    buf,
                }));
            }
        }
    }
    Ok(None)
}

/// Looks a name up in a directory and returns the inode it refers to.
pub fn dir_find<D: BlockDevice>(session: &Session<D>, dir: &Inode, name: &[u8]) -> Result<Inode> {
    check_dir(dir)?;
    check_name(name)?;
    match locate(session, dir, name)? {
        Some(found) => read_inode(session, found.entry.inode_id),
        None => Err(FsError::NotFound),
    }
}

/// Adds an entry `name -> child_id` to a directory.
/// The child inode must already be allocated; its links count is the caller's business.
pub fn dir_add<D: BlockDevice>(
    session: &mut Session<D>,
    dir: &mut Inode,
    child_id: u32,
    name: &[u8],
) -> Result<()> {
    check_dir(dir)?;
    let new_entry = DirEntry::new(child_id, name)?;
    if !session.inode_bitmap.get(child_id) {
        return Err(FsError::NotFound);
    }
    if locate(session, dir, name)?.is_some() {
        return Err(FsError::AlreadyExists);
    }

    let mut buf = zeroed_block();
    let mut target = None;

    // First choice: a free slot in a block the directory already owns.
    'found_slot: for ptr in dir.direct_ptrs.iter() {
        let Some(block) = *ptr else { continue };
        session.read_data_block(block, &mut buf)?;
        for entry_index in 0..NUM_ENTRY_PER_BLOCK {
            let entry: DirEntry = read_record(&buf, entry_offset(entry_index));
            if !entry.is_valid() {
                target = Some((block, entry_index));
                break 'found_slot;
            }
        }
    }

    let (block, entry_index) = match target {
        Some(slot) => slot,
        None => {
            let ptr_index = dir
                .direct_ptrs
                .iter()
                .position(|ptr| ptr.is_none())
                .ok_or(FsError::NoSpace)?;
            let block = alloc_data_block(session)?;
            debug!("[dir_add] directory {} takes data block {} in slot {}", dir.ino, block, ptr_index);
            dir.direct_ptrs[ptr_index] = Some(block);
            // Whatever the block held before belongs to nobody now.
            buf = zeroed_block();
            (block, 0)
        }
    };

    write_record(&mut buf, entry_offset(entry_index), &new_entry);
    session.write_data_block(block, &buf)?;

    dir.size += DIR_ENTRY_SIZE as u64;
    dir.mtime = unix_now();
    write_inode(session, dir)?;
    trace!("[dir_add] {} -> {} in directory {}", new_entry.name_str(), child_id, dir.ino);
    Ok(())
}

/// Removes the entry called `name` and releases the inode it refers to.
/// Does not recurse into directories; callers make sure a directory is empty first.
/// The directory's size is left unchanged.
/// Returns the inode ID of the removed entry.
pub fn dir_remove<D: BlockDevice>(
    session: &mut Session<D>,
    dir: &mut Inode,
    name: &[u8],
) -> Result<u32> {
    check_dir(dir)?;
    check_name(name)?;
    let Some(mut found) = locate(session, dir, name)? else {
        return Err(FsError::NotFound);
    };
    let child_id = found.entry.inode_id;
    if child_id == ROOT_INODE_ID {
        return Err(FsError::InvalidPath);
    }

    found.entry.valid = 0;
    write_record(&mut found.buf, entry_offset(found.entry_index), &found.entry);

    let mut child = read_inode(session, child_id)?;
    if child.valid {
        release_inode(session, &mut child)?;
    }

    let block_in_use = (0..NUM_ENTRY_PER_BLOCK)
        .any(|i| read_record::<DirEntry>(&found.buf, entry_offset(i)).is_valid());
    if block_in_use {
        session.write_data_block(found.block, &found.buf)?;
    } else {
        debug!("[dir_remove] directory {} gives back data block {}", dir.ino, found.block);
        dir.direct_ptrs[found.ptr_index] = None;
        free_data_block(session, found.block)?;
    }

    dir.mtime = unix_now();
    write_inode(session, dir)?;
    Ok(child_id)
}

/// Lists the live entries of a directory, in block then slot order.
pub fn read_dir<D: BlockDevice>(session: &Session<D>, dir: &Inode) -> Result<Vec<DirEntry>> {
    check_dir(dir)?;
    let mut entries = Vec::new();
    let mut buf = zeroed_block();
    for block in dir.direct_ptrs.iter().flatten() {
        session.read_data_block(*block, &mut buf)?;
        for entry_index in 0..NUM_ENTRY_PER_BLOCK {
            let entry: DirEntry = read_record(&buf, entry_offset(entry_index));
            if entry.is_valid() {
                entries.push(entry);
            }
        }
    }
    Ok(entries)
}

/// A directory is empty once all of its blocks have been given back.
pub fn dir_is_empty(dir: &Inode) -> Result<bool> {
    check_dir(dir)?;
    Ok(dir.direct_ptrs.iter().all(|ptr| ptr.is_none()))
}
