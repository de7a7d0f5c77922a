//! Regular file content stored in the direct blocks of an inode.
//! Unallocated blocks inside the file size are holes and read as zeros.

use log::trace;

use crate::bitmap::{alloc_data_block, free_data_block};
use crate::block_dev::zeroed_block;
use crate::config::*;
use crate::error::FsError;
use crate::inode::{unix_now, write_inode};
use crate::session::Session;
use crate::{BlockDevice, Inode, Result};

fn check_file(inode: &Inode) -> Result<()> {
    if !inode.valid {
        return Err(FsError::NotFound);
    }
    if !inode.is_file() {
        return Err(FsError::NotFile);
    }
    Ok(())
}

/// Reads data from a file into the provided buffer.
/// The `offset` is the position in the file to start reading from.
/// Returns the number of bytes read, which is short only at end of file.
pub fn file_read<D: BlockDevice>(
    session: &Session<D>,
    inode: &Inode,
    offset: usize,
    buffer: &mut [u8],
) -> Result<usize> {
    check_file(inode)?;
    let size = (inode.size as usize).min(MAX_FILE_SIZE);
    if offset >= size {
        return Ok(0);
    }
    let end = size.min(offset + buffer.len());

    let mut block_buf = zeroed_block();
    let mut current_offset = offset;
    while current_offset < end {
        let block_index = current_offset / BLOCK_SIZE;
        let start_in_block = current_offset % BLOCK_SIZE;
        let chunk = (BLOCK_SIZE - start_in_block).min(end - current_offset);
        let dest = &mut buffer[current_offset - offset..current_offset - offset + chunk];
        match inode.direct_ptrs[block_index] {
            Some(block) => {
                session.read_data_block(block, &mut block_buf)?;
                dest.copy_from_slice(&block_buf[start_in_block..start_in_block + chunk]);
            }
            None => dest.fill(0),
        }
        current_offset += chunk;
    }

    Ok(end - offset)
}

/// Writes data from the provided buffer to a file at the specified offset.
/// Missing blocks in the touched range are allocated; the inode is persisted afterwards.
/// Returns the number of bytes written.
pub fn file_write<D: BlockDevice>(
    session: &mut Session<D>,
    inode: &mut Inode,
    offset: usize,
    buffer: &[u8],
) -> Result<usize> {
    check_file(inode)?;
    if buffer.is_empty() {
        return Ok(0);
    }
    let end = offset.checked_add(buffer.len()).ok_or(FsError::NoSpace)?;
    if end > MAX_FILE_SIZE {
        return Err(FsError::NoSpace);
    }

    let mut block_buf = zeroed_block();
    let mut current_offset = offset;
    while current_offset < end {
        let block_index = current_offset / BLOCK_SIZE;
        let start_in_block = current_offset % BLOCK_SIZE;
        let chunk = (BLOCK_SIZE - start_in_block).min(end - current_offset);

        let block = match inode.direct_ptrs[block_index] {
            Some(block) => {
                if chunk < BLOCK_SIZE {
                    session.read_data_block(block, &mut block_buf)?;
                }
                block
            }
            None => {
                let block = alloc_data_block(session)?;
                trace!("[file_write] inode {} block {} -> data block {}", inode.ino, block_index, block);
                inode.direct_ptrs[block_index] = Some(block);
                block_buf.fill(0);
                block
            }
        };
        block_buf[start_in_block..start_in_block + chunk]
            .copy_from_slice(&buffer[current_offset - offset..current_offset - offset + chunk]);
        session.write_data_block(block, &block_buf)?;
        current_offset += chunk;
    }

    inode.size = inode.size.max(end as u64);
    inode.mtime = unix_now();
    write_inode(session, inode)?;
    Ok(buffer.len())
}

/// Sets the file size. Shrinking gives back the blocks past the new end and
/// zeroes the cut-off tail of the last kept block; growing leaves a hole.
pub fn file_truncate<D: BlockDevice>(
    session: &mut Session<D>,
    inode: &mut Inode,
    new_size: usize,
) -> Result<()> {
    check_file(inode)?;
    if new_size > MAX_FILE_SIZE {
        return Err(FsError::NoSpace);
    }

    if new_size < inode.size as usize {
        let kept_blocks = new_size.div_ceil(BLOCK_SIZE);
        for index in kept_blocks..NUM_DIRECT_PTRS {
            if let Some(block) = inode.direct_ptrs[index].take() {
                free_data_block(session, block)?;
            }
        }
        let tail = new_size % BLOCK_SIZE;
        if tail != 0 {
            if let Some(block) = inode.direct_ptrs[new_size / BLOCK_SIZE] {
                let mut block_buf = zeroed_block();
                session.read_data_block(block, &mut block_buf)?;
                block_buf[tail..].fill(0);
                session.write_data_block(block, &block_buf)?;
            }
        }
    }

    inode.size = new_size as u64;
    inode.mtime = unix_now();
    write_inode(session, inode)
}

/// Gives every data block of an inode back to the data bitmap.
/// The inode is updated in memory only; callers persist or release it.
pub fn release_blocks<D: BlockDevice>(session: &mut Session<D>, inode: &mut Inode) -> Result<()> {
    for ptr in inode.direct_ptrs.iter_mut() {
        if let Some(block) = ptr.take() {
            free_data_block(session, block)?;
        }
    }
    inode.size = 0;
    Ok(())
}
