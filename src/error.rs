use core::fmt::{self, Display};

/// The set of all possible errors the core reports to its VFS host.
///
/// Every variant here corresponds to a row in the error taxonomy: each one
/// is surfaced verbatim, never retried, and never silently swallowed except
/// where a component's contract says so (`lookup` turning `NotFound` into
/// "absent").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Block 0 does not carry the ASSOOFS magic number.
    NotAssoofs,
    /// Block 0's `block_size` field does not match `layout::BLOCK_SIZE`.
    WrongBlockSize,
    /// The free-block bitmap has no bit set at index >= 2, or a directory's
    /// data block has no room for another `DirRecord`.
    NoSpace,
    /// The next inode number would exceed `layout::MAX_OBJECTS`.
    ObjectCapExceeded,
    /// An inode number or child name has no matching record.
    NotFound,
    /// An operation that requires a directory was given a regular file.
    NotDir,
    /// A name longer than `layout::FILENAME_MAX - 1` bytes was supplied.
    NameTooLong,
    /// A decoded on-disk structure violates a structural invariant.
    CorruptImage,
    /// The injected `BlockDevice` reported a read or write failure.
    IoError,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::NotAssoofs => "block device does not hold an assoofs image",
            Error::WrongBlockSize => "superblock block_size does not match the compiled-in block size",
            Error::NoSpace => "no free block available",
            Error::ObjectCapExceeded => "filesystem object cap reached",
            Error::NotFound => "no such inode or directory entry",
            Error::NotDir => "operation requires a directory",
            Error::NameTooLong => "name exceeds the maximum filename length",
            Error::CorruptImage => "on-disk structure violates a filesystem invariant",
            Error::IoError => "block device I/O failed",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
impl std::error::Error for Error {}

/// Maps a core [`Error`] to the POSIX-ish error code the VFS host contract
/// (see SPEC_FULL.md §6) expects to see at the syscall boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostErrno {
    EPERM,
    ENOSPC,
    ENOENT,
    ENOTDIR,
    ENAMETOOLONG,
    EIO,
}

impl Error {
    /// Surfaces this error the way §7 says the host should see it.
    ///
    /// `NotFound` has no single mapping: callers that can recover from it
    /// (`lookup`) never pass it here, and callers for whom it is an
    /// invariant breach (`InodeStore::update`) map it to `EIO` themselves.
    pub fn to_host_errno(self) -> HostErrno {
        match self {
            Error::NotAssoofs | Error::WrongBlockSize => HostErrno::EPERM,
            Error::NoSpace | Error::ObjectCapExceeded => HostErrno::ENOSPC,
            Error::NotFound => HostErrno::EIO,
            Error::NotDir => HostErrno::ENOTDIR,
            Error::NameTooLong => HostErrno::ENAMETOOLONG,
            Error::CorruptImage | Error::IoError => HostErrno::EIO,
        }
    }
}
