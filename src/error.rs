use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,
    #[error("not a directory")]
    NotDirectory,
    #[error("not a regular file")]
    NotFile,
    #[error("file exists")]
    AlreadyExists,
    #[error("no space left on device")]
    NoSpace,
    #[error("directory not empty")]
    NotEmpty,
    #[error("i/o error")]
    IoError,
    #[error("invalid path")]
    InvalidPath,
    #[error("file name too long")]
    NameTooLong,
    #[error("invalid superblock")]
    InvalidSuperBlock,
    #[error("block id out of device range")]
    InvalidBlockId,
    #[error("index out of bounds")]
    OutOfBounds,
    #[error("geometry does not fit the device")]
    InvalidGeometry,
}

impl FsError {
    /// The errno a host adapter should report for this error.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => 2,                // ENOENT
            FsError::NotDirectory => 20,           // ENOTDIR
            FsError::NotFile => 21,                // EISDIR
            FsError::AlreadyExists => 17,          // EEXIST
            FsError::NoSpace => 28,                // ENOSPC
            FsError::NotEmpty => 39,               // ENOTEMPTY
            FsError::NameTooLong => 36,            // ENAMETOOLONG
            FsError::InvalidPath
            | FsError::OutOfBounds
            | FsError::InvalidGeometry => 22,      // EINVAL
            FsError::IoError
            | FsError::InvalidSuperBlock
            | FsError::InvalidBlockId => 5,        // EIO
        }
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
