use core::mem::size_of;

use crate::block_dev::Block;
use crate::config::*;
use crate::{Error, Result};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub magic: u32,              // Magic number to identify the filesystem
    pub max_inodes: u32,         // Total number of inodes in the filesystem
    pub max_data_blocks: u32,    // Total number of blocks in the data region
    pub inode_bitmap_block: u32, // Block number of the inode bitmap
    pub data_bitmap_block: u32,  // Block number of the data bitmap
    pub inode_table_start: u32,  // Block number where the inode table starts
    pub data_region_start: u32,  // Block number where data blocks start
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular = 0,
    Directory = 1,
}

impl TryFrom<u16> for FileType {
    type Error = Error;

    fn try_from(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(FileType::Regular),
            1 => Ok(FileType::Directory),
            _ => Err(Error::IoError),
        }
    }
}

/// Inode record exactly as it sits in the inode table.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct DiskInode {
    pub ino: u32,
    pub valid: u16,
    pub kind: u16,
    pub links: u32,
    pub mode: u32,
    pub size: u64,
    pub mtime: u64,
    pub direct: [u32; NUM_DIRECT_PTRS], // NULL_PTR marks an unused slot
    pub reserved: [u8; 32],
}

/// In-memory view of an inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub ino: u32,
    pub valid: bool,
    pub ftype: FileType,
    pub links: u32,
    pub mode: u32,
    pub size: u64,
    pub mtime: u64,
    /// Data block numbers, relative to the data region.
    pub direct_ptrs: [Option<u32>; NUM_DIRECT_PTRS],
}

impl Inode {
    pub fn new(ino: u32, ftype: FileType, mode: u32, mtime: u64) -> Self {
        Self {
            ino,
            valid: true,
            ftype,
            links: match ftype {
                FileType::Regular => 1,
                FileType::Directory => 2,
            },
            mode,
            size: 0,
            mtime,
            direct_ptrs: [None; NUM_DIRECT_PTRS],
        }
    }

    pub fn is_dir(&self) -> bool {
        self.ftype == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.ftype == FileType::Regular
    }

    /// Number of data blocks currently held by this inode.
    pub fn blocks(&self) -> u32 {
        self.direct_ptrs.iter().filter(|ptr| ptr.is_some()).count() as u32
    }

    pub(crate) fn from_disk(raw: &DiskInode) -> Result<Self> {
        let mut direct_ptrs = [None; NUM_DIRECT_PTRS];
        for (slot, &ptr) in direct_ptrs.iter_mut().zip(raw.direct.iter()) {
            if ptr != NULL_PTR {
                *slot = Some(ptr);
            }
        }
        Ok(Self {
            ino: raw.ino,
            valid: raw.valid != 0,
            ftype: FileType::try_from(raw.kind)?,
            links: raw.links,
            mode: raw.mode,
            size: raw.size,
            mtime: raw.mtime,
            direct_ptrs,
        })
    }

    pub(crate) fn to_disk(&self) -> DiskInode {
        let mut direct = [NULL_PTR; NUM_DIRECT_PTRS];
        for (slot, ptr) in direct.iter_mut().zip(self.direct_ptrs.iter()) {
            if let Some(ptr) = ptr {
                *slot = *ptr;
            }
        }
        DiskInode {
            ino: self.ino,
            valid: self.valid as u16,
            kind: self.ftype as u16,
            links: self.links,
            mode: self.mode,
            size: self.size,
            mtime: self.mtime,
            direct,
            reserved: [0; 32],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DirEntry {
    pub inode_id: u32,
    pub valid: u16,
    pub name_len: u16,
    pub name: [u8; MAX_FILE_NAME_LEN],
}

impl DirEntry {
    pub const NULL: Self = Self {
        inode_id: 0,
        valid: 0,
        name_len: 0,
        name: [0; MAX_FILE_NAME_LEN],
    };

    pub fn new(inode_id: u32, name: &[u8]) -> Result<Self> {
        check_name(name)?;
        let mut entry = Self::NULL;
        entry.inode_id = inode_id;
        entry.valid = 1;
        entry.name_len = name.len() as u16;
        entry.name[..name.len()].copy_from_slice(name);
        Ok(entry)
    }

    pub fn is_valid(&self) -> bool {
        self.valid != 0
    }

    pub fn name(&self) -> &[u8] {
        let len = (self.name_len as usize).min(MAX_FILE_NAME_LEN);
        &self.name[..len]
    }

    pub fn name_str(&self) -> alloc::string::String {
        alloc::string::String::from_utf8_lossy(self.name()).into_owned()
    }
}

/// Validates a single path component.
pub fn check_name(name: &[u8]) -> Result<()> {
    if name.is_empty() || name.contains(&b'/') || name.contains(&0) {
        return Err(Error::InvalidPath);
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(Error::NameTooLong);
    }
    Ok(())
}

/// Records stored verbatim inside a block.
///
/// # Safety
/// Implementors are `#[repr(C)]`, built only from integers and integer arrays,
/// and have no padding, so every byte pattern is a valid value.
pub(crate) unsafe trait OnDisk: Copy {}

unsafe impl OnDisk for SuperBlock {}
unsafe impl OnDisk for DiskInode {}
unsafe impl OnDisk for DirEntry {}

const _: () = assert!(size_of::<SuperBlock>() == 7 * 4);
const _: () = assert!(size_of::<DiskInode>() == INODE_SIZE);
const _: () = assert!(size_of::<DirEntry>() == DIR_ENTRY_SIZE);

pub(crate) fn read_record<T: OnDisk>(buf: &Block, offset: usize) -> T {
    assert!(offset + size_of::<T>() <= buf.len());
    unsafe { core::ptr::read_unaligned(buf.as_ptr().add(offset) as *const T) }
}

pub(crate) fn write_record<T: OnDisk>(buf: &mut Block, offset: usize, record: &T) {
    assert!(offset + size_of::<T>() <= buf.len());
    unsafe {
        core::ptr::write_unaligned(buf.as_mut_ptr().add(offset) as *mut T, *record);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_inode_disk_form() {
        let mut inode = Inode::new(7, FileType::Regular, 0o644, 42);
        inode.direct_ptrs[3] = Some(0);
        inode.size = 100;
        let raw = inode.to_disk();
        assert_eq!(raw.direct[3], 0);
        assert_eq!(raw.direct[0], NULL_PTR);
        assert_eq!(Inode::from_disk(&raw).unwrap(), inode);
        assert_eq!(inode.blocks(), 1);
    }

    #[test]
    fn test_bad_kind() {
        let mut raw = Inode::new(1, FileType::Directory, 0o755, 0).to_disk();
        raw.kind = 9;
        assert_eq!(Inode::from_disk(&raw), Err(Error::IoError));
    }

    #[test]
    fn test_record_slots() {
        let mut buf = [0u8; BLOCK_SIZE];
        let entry = DirEntry::new(5, b"hello").unwrap();
        write_record(&mut buf, DIR_ENTRY_SIZE * 3, &entry);
        let back: DirEntry = read_record(&buf, DIR_ENTRY_SIZE * 3);
        assert_eq!(back.name(), b"hello");
        assert_eq!(back.inode_id, 5);
        let empty: DirEntry = read_record(&buf, 0);
        assert!(!empty.is_valid());
    }

    #[test]
    fn test_check_name() {
        assert_eq!(check_name(b""), Err(Error::InvalidPath));
        assert_eq!(check_name(b"a/b"), Err(Error::InvalidPath));
        assert_eq!(check_name(&[b'x'; MAX_FILE_NAME_LEN + 1]), Err(Error::NameTooLong));
        assert!(check_name(&[b'x'; MAX_FILE_NAME_LEN]).is_ok());
    }
}
