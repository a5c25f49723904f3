//! Maps VFS-style host callbacks onto the lower components, and owns the
//! single reader/writer lock every mutation serializes behind.

use log::{debug, info};
use spin::RwLock;

use crate::block::BlockDevice;
use crate::dir::DirectoryOps;
use crate::error::Error;
use crate::file::FileOps;
use crate::inode_store::InodeStore;
use crate::layout::{DIR_RECORD_SIZE, InodeRecord, MAX_OBJECTS, Mode, ROOTDIR_INO};
use crate::superblock::SuperblockManager;

/// A live inode handle: the in-memory record a VFS host would attach as an
/// inode's private data. Weakly tied to its on-disk record by `inode_no` —
/// the record of truth is always the inode store plus whatever copy is
/// loaded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InodeHandle {
    pub info: InodeRecord,
}

impl InodeHandle {
    pub fn inode_no(&self) -> u64 {
        self.info.inode_no
    }

    pub fn mode(&self) -> Mode {
        self.info.mode
    }
}

struct Inner<D: BlockDevice> {
    device: D,
    superblock: SuperblockManager,
}

/// The mounted filesystem. All mutation of the superblock and the inode
/// store is serialized behind one reader/writer lock: non-mutating calls
/// (`lookup`, `iterate`, `read`) take a shared lock, mutating calls
/// (`create`, `mkdir`, `write`) take the exclusive lock.
pub struct Assoofs<D: BlockDevice> {
    inner: RwLock<Inner<D>>,
}

/// Tracks enumeration progress across `iterate` calls, the same role
/// `ctx->pos` plays for a real VFS `readdir`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IterCursor {
    pub pos: u64,
}

/// Receives directory entries emitted by `iterate`, standing in for the
/// host's `dir_emit`-style callback.
pub trait DirEntrySink {
    fn emit(&mut self, name: &[u8], inode_no: u64);
}

impl<D: BlockDevice> Assoofs<D> {
    /// Loads the superblock and the root inode, and hands back both the
    /// mounted filesystem and a handle to the root directory. Any failure
    /// here (bad magic, wrong block size, I/O error, corrupt root record)
    /// leaves nothing mutated.
    pub fn fill_super(device: D) -> Result<(Assoofs<D>, InodeHandle), Error> {
        let superblock = SuperblockManager::load(&device)?;
        let root_info = InodeStore::get(&device, superblock.inodes_count(), ROOTDIR_INO)?;
        info!("assoofs mounted, {} live inodes", superblock.inodes_count());
        let fs = Assoofs {
            inner: RwLock::new(Inner { device, superblock }),
        };
        Ok((fs, InodeHandle { info: root_info }))
    }

    /// Scans `parent`'s child list for `name`. Never fails on a merely
    /// absent name — that comes back as `Ok(None)`, leaving the host to
    /// decide the user-visible error. Real faults (I/O, a corrupt image,
    /// `parent` not actually being a directory) still propagate.
    pub fn lookup(&self, parent: &InodeHandle, name: &str) -> Result<Option<InodeHandle>, Error> {
        let inner = self.inner.read();
        match DirectoryOps::lookup(&inner.device, &parent.info, name) {
            Ok(child_ino) => {
                let info = InodeStore::get(&inner.device, inner.superblock.inodes_count(), child_ino)?;
                Ok(Some(InodeHandle { info }))
            }
            Err(Error::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Creates a regular file named `name` under `parent` with permission
    /// bits `mode`. See `mkdir` for the shared allocation/persistence
    /// sequence.
    pub fn create(
        &self,
        parent: &mut InodeHandle,
        name: &str,
        mode: Mode,
    ) -> Result<InodeHandle, Error> {
        self.create_object(parent, name, mode, false)
    }

    /// Creates a subdirectory named `name` under `parent` with permission
    /// bits `mode`.
    pub fn mkdir(
        &self,
        parent: &mut InodeHandle,
        name: &str,
        mode: Mode,
    ) -> Result<InodeHandle, Error> {
        self.create_object(parent, name, mode, true)
    }

    fn create_object(
        &self,
        parent: &mut InodeHandle,
        name: &str,
        mode: Mode,
        is_dir: bool,
    ) -> Result<InodeHandle, Error> {
        let mut guard = self.inner.write();
        // Re-borrow once into a plain reference: splitting `superblock` and
        // `device` borrows in the same statement (e.g. `allocate_block(&mut
        // device)` called on `superblock`) does not type-check directly
        // through a lock guard's `DerefMut`, since each field access would
        // otherwise re-invoke it.
        let inner = &mut *guard;

        let next_ino = inner.superblock.inodes_count() + 1;
        if next_ino > MAX_OBJECTS {
            return Err(Error::ObjectCapExceeded);
        }

        // (1) allocate the data block, persisting the bitmap immediately.
        let data_block = inner.superblock.allocate_block(&mut inner.device)?;

        let record = if is_dir {
            InodeRecord::new_dir(next_ino, data_block, mode)
        } else {
            InodeRecord::new_file(next_ino, data_block, mode)
        };

        // (2) append the inode record, then persist the bumped count. The
        // inode store never owns `inodes_count` itself (the superblock
        // does, per SPEC_FULL.md §3's ownership rule), so the bump and the
        // persist happen here rather than inside `InodeStore::append`.
        InodeStore::append(&mut inner.device, inner.superblock.inodes_count(), &record)?;
        inner.superblock.set_inodes_count(next_ino);
        inner.superblock.persist(&mut inner.device)?;

        // (3) link the new inode into its parent's child list.
        let inodes_count = inner.superblock.inodes_count();
        DirectoryOps::insert_child(&mut inner.device, inodes_count, &mut parent.info, name, next_ino)?;

        debug!(
            "created {} {:?} as inode {} (block {})",
            if is_dir { "directory" } else { "file" },
            name,
            next_ino,
            data_block
        );
        Ok(InodeHandle { info: record })
    }

    /// Emits `dir`'s children into `sink` exactly once per cursor: a
    /// non-zero `cursor.pos` means the directory was already fully
    /// enumerated, matching a real `readdir`'s `ctx->pos` convention.
    pub fn iterate<S: DirEntrySink>(
        &self,
        dir: &InodeHandle,
        cursor: &mut IterCursor,
        sink: &mut S,
    ) -> Result<usize, Error> {
        if cursor.pos != 0 {
            return Ok(0);
        }

        let inner = self.inner.read();
        let mut emitted = 0usize;
        for entry in DirectoryOps::iterate(&inner.device, &dir.info)? {
            let entry = entry?;
            sink.emit(entry.name_bytes(), entry.inode_no);
            emitted += 1;
        }

        let children_count = dir.info.dir_children_count().ok_or(Error::NotDir)?;
        cursor.pos += children_count * DIR_RECORD_SIZE as u64;
        Ok(emitted)
    }

    /// Forwards to [`FileOps::read`] under a shared lock.
    pub fn read(&self, file: &InodeHandle, buf: &mut [u8], offset: u64) -> Result<usize, Error> {
        let inner = self.inner.read();
        FileOps::read(&inner.device, &file.info, buf, offset)
    }

    /// Forwards to [`FileOps::write`] under the exclusive lock.
    pub fn write(&self, file: &mut InodeHandle, buf: &[u8], offset: u64) -> Result<usize, Error> {
        let mut inner = self.inner.write();
        let inodes_count = inner.superblock.inodes_count();
        FileOps::write(&mut inner.device, inodes_count, &mut file.info, buf, offset)
    }
}
