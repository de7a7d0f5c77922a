//! Path resolution and manipulation utilities.

use alloc::vec::Vec;

use log::trace;

use crate::directory::dir_find;
use crate::inode::read_inode;
use crate::session::Session;
use crate::structs::check_name;
use crate::{BlockDevice, Error, Inode, Result, ROOT_INODE_ID};

/// Splits a path into its non-empty components.
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Resolves a path to an inode, walking from `start`.
/// "/" alone is always the root; otherwise leading slashes carry no meaning.
pub fn resolve<D: BlockDevice>(session: &Session<D>, path: &str, start: u32) -> Result<Inode> {
    if path.is_empty() {
        return Err(Error::InvalidPath);
    }
    if path == "/" {
        return read_inode(session, ROOT_INODE_ID);
    }

    let mut current = read_inode(session, start)?;
    for component in components(path) {
        if !current.is_dir() {
            return Err(Error::NotDirectory);
        }
        trace!("[resolve] {} in inode {}", component, current.ino);
        current = dir_find(session, &current, component.as_bytes())?;
    }
    Ok(current)
}

/// Splits a path into (parent path, final name), like dirname/basename.
/// Fails for paths without a final component, such as "/".
pub fn split(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let (parent, name) = match trimmed.rfind('/') {
        Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
        None => ("", trimmed),
    };
    check_name(name.as_bytes())?;
    let parent = if parent.trim_matches('/').is_empty() { "/" } else { parent };
    Ok((parent, name))
}
