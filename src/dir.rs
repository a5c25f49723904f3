//! A directory's child list, packed into the single data block its inode
//! points to.

use log::{debug, trace, warn};

use crate::block::BlockDevice;
use crate::error::Error;
use crate::inode_store::InodeStore;
use crate::layout::{BlockBuf, DirRecord, InodeRecord, BLOCK_SIZE, DIR_RECORD_SIZE};

pub struct DirectoryOps;

impl DirectoryOps {
    /// Yields the `[0, dir_children_count)` records of `dir`'s data block,
    /// in append order. Order is stable across mounts because nothing ever
    /// reorders or deletes a record.
    pub fn iterate<D: BlockDevice>(device: &D, dir: &InodeRecord) -> Result<DirIter, Error> {
        let children_count = dir.dir_children_count().ok_or(Error::NotDir)?;
        let mut buf: BlockBuf = [0u8; BLOCK_SIZE];
        trace!("reading block {}", dir.data_block_number);
        device
            .read_block(dir.data_block_number, &mut buf)
            .map_err(Into::into)?;
        Ok(DirIter {
            buf,
            index: 0,
            count: children_count,
        })
    }

    /// Scans `dir`'s data block for `name`. When `name` appears more than
    /// once (see SPEC_FULL.md §9 — duplicates are shadowed, not rejected),
    /// the most recently inserted match wins, since a later `insert_child`
    /// call always lands at a higher offset than an earlier one.
    pub fn lookup<D: BlockDevice>(
        device: &D,
        dir: &InodeRecord,
        name: &str,
    ) -> Result<u64, Error> {
        let mut found = None;
        for entry in DirectoryOps::iterate(device, dir)? {
            let entry = entry?;
            if entry.matches_name(name) {
                found = Some(entry.inode_no);
            }
        }
        found.ok_or(Error::NotFound)
    }

    /// Appends a new `DirRecord` at offset `dir_children_count * DIR_RECORD_SIZE`
    /// in `dir`'s data block, then persists the bumped `dir_children_count`
    /// back onto `dir`'s inode record via [`InodeStore::update`].
    pub fn insert_child<D: BlockDevice>(
        device: &mut D,
        inodes_count: u64,
        dir: &mut InodeRecord,
        name: &str,
        child_ino: u64,
    ) -> Result<(), Error> {
        let children_count = dir.dir_children_count().ok_or(Error::NotDir)?;
        let offset = (children_count as usize) * DIR_RECORD_SIZE;
        if offset + DIR_RECORD_SIZE > BLOCK_SIZE {
            warn!("directory {} has no room for another entry", dir.inode_no);
            return Err(Error::NoSpace);
        }

        let record = DirRecord::new(name, child_ino)?;
        let mut buf: BlockBuf = [0u8; BLOCK_SIZE];
        trace!("reading block {}", dir.data_block_number);
        device
            .read_block(dir.data_block_number, &mut buf)
            .map_err(Into::into)?;

        let mut raw = [0u8; DIR_RECORD_SIZE];
        record.encode(&mut raw);
        buf[offset..offset + DIR_RECORD_SIZE].copy_from_slice(&raw);

        trace!("writing block {}", dir.data_block_number);
        device
            .write_block(dir.data_block_number, &buf)
            .map_err(Into::into)?;
        device.flush().map_err(Into::into)?;

        dir.set_dir_children_count(children_count + 1);
        InodeStore::update(device, inodes_count, dir)?;
        debug!(
            "inserted {:?} -> inode {} into directory {}",
            name, child_ino, dir.inode_no
        );
        Ok(())
    }
}

/// Iterator over a directory's child list, borrowing the already-read data
/// block rather than allocating.
pub struct DirIter {
    buf: BlockBuf,
    index: u64,
    count: u64,
}

impl Iterator for DirIter {
    type Item = Result<DirRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let offset = (self.index as usize) * DIR_RECORD_SIZE;
        let mut raw = [0u8; DIR_RECORD_SIZE];
        raw.copy_from_slice(&self.buf[offset..offset + DIR_RECORD_SIZE]);
        self.index += 1;
        Some(Ok(DirRecord::decode(&raw)))
    }
}
