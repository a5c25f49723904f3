//! The inode store: a single block (block 1) holding a packed, append-only
//! array of [`InodeRecord`]s.
//!
//! There is no free-list of records — creation is an O(1) append and update
//! is an O(n) scan bounded by `inodes_count`. With `MAX_OBJECTS = 64` that
//! scan never costs more than 64 record comparisons.

use log::{debug, trace, warn};

use crate::block::BlockDevice;
use crate::error::Error;
use crate::layout::{
    BlockBuf, InodeRecord, BLOCK_SIZE, INODESTORE_BLOCK, INODE_RECORD_SIZE, MAX_OBJECTS,
};

pub struct InodeStore;

impl InodeStore {
    /// Scans block 1 up to `inodes_count` records looking for `inode_no`.
    pub fn get<D: BlockDevice>(
        device: &D,
        inodes_count: u64,
        inode_no: u64,
    ) -> Result<InodeRecord, Error> {
        let mut buf: BlockBuf = [0u8; BLOCK_SIZE];
        trace!("reading block {}", INODESTORE_BLOCK);
        device.read_block(INODESTORE_BLOCK, &mut buf).map_err(Into::into)?;

        for i in 0..inodes_count {
            let record = decode_at(&buf, i)?;
            if record.inode_no == inode_no {
                return Ok(record);
            }
        }
        Err(Error::NotFound)
    }

    /// Appends `record` at offset `inodes_count * INODE_RECORD_SIZE`,
    /// flushes block 1, then persists the superblock's new `inodes_count`.
    /// Fails with [`Error::NoSpace`] once `inodes_count == MAX_OBJECTS`.
    pub fn append<D: BlockDevice>(
        device: &mut D,
        inodes_count: u64,
        record: &InodeRecord,
    ) -> Result<(), Error> {
        if inodes_count >= MAX_OBJECTS {
            warn!("inode store full at {} records", inodes_count);
            return Err(Error::NoSpace);
        }

        let mut buf: BlockBuf = [0u8; BLOCK_SIZE];
        trace!("reading block {}", INODESTORE_BLOCK);
        device.read_block(INODESTORE_BLOCK, &mut buf).map_err(Into::into)?;

        let offset = (inodes_count as usize) * INODE_RECORD_SIZE;
        let mut raw = [0u8; INODE_RECORD_SIZE];
        record.encode(&mut raw);
        buf[offset..offset + INODE_RECORD_SIZE].copy_from_slice(&raw);

        trace!("writing block {}", INODESTORE_BLOCK);
        device.write_block(INODESTORE_BLOCK, &buf).map_err(Into::into)?;
        device.flush().map_err(Into::into)?;
        debug!("appended inode {} at record index {}", record.inode_no, inodes_count);
        Ok(())
    }

    /// Overwrites the first record whose `inode_no` matches `record.inode_no`.
    /// Fails with [`Error::NotFound`] if no such record exists within
    /// `[0, inodes_count)`.
    pub fn update<D: BlockDevice>(
        device: &mut D,
        inodes_count: u64,
        record: &InodeRecord,
    ) -> Result<(), Error> {
        let mut buf: BlockBuf = [0u8; BLOCK_SIZE];
        trace!("reading block {}", INODESTORE_BLOCK);
        device.read_block(INODESTORE_BLOCK, &mut buf).map_err(Into::into)?;

        let mut index = None;
        for i in 0..inodes_count {
            if decode_at(&buf, i)?.inode_no == record.inode_no {
                index = Some(i);
                break;
            }
        }
        let index = match index {
            Some(index) => index,
            None => {
                warn!("update: no inode {} in store", record.inode_no);
                return Err(Error::NotFound);
            }
        };

        let offset = (index as usize) * INODE_RECORD_SIZE;
        let mut raw = [0u8; INODE_RECORD_SIZE];
        record.encode(&mut raw);
        buf[offset..offset + INODE_RECORD_SIZE].copy_from_slice(&raw);

        trace!("writing block {}", INODESTORE_BLOCK);
        device.write_block(INODESTORE_BLOCK, &buf).map_err(Into::into)?;
        device.flush().map_err(Into::into)?;
        debug!("updated inode {} at record index {}", record.inode_no, index);
        Ok(())
    }
}

fn decode_at(buf: &BlockBuf, index: u64) -> Result<InodeRecord, Error> {
    let offset = (index as usize) * INODE_RECORD_SIZE;
    let mut raw = [0u8; INODE_RECORD_SIZE];
    raw.copy_from_slice(&buf[offset..offset + INODE_RECORD_SIZE]);
    InodeRecord::decode(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::MemoryBlockDevice;
    use crate::layout::{Mode, ROOTDIR_BLOCK, ROOTDIR_INO};
    use crate::superblock::SuperblockManager;

    fn formatted_device() -> MemoryBlockDevice {
        let mut device = MemoryBlockDevice::new();
        SuperblockManager::format(&mut device).unwrap();
        device
    }

    #[test]
    fn append_then_get_round_trips() {
        let mut device = formatted_device();
        let record = InodeRecord::new_file(2, 3, Mode::from_bits_truncate(0o644));
        InodeStore::append(&mut device, 1, &record).unwrap();

        let fetched = InodeStore::get(&device, 2, 2).unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn update_then_get_round_trips() {
        let mut device = formatted_device();
        let mut record = InodeRecord::new_dir(ROOTDIR_INO, ROOTDIR_BLOCK, Mode::from_bits_truncate(0o755));
        record.set_dir_children_count(1);
        InodeStore::update(&mut device, 1, &record).unwrap();

        let fetched = InodeStore::get(&device, 1, ROOTDIR_INO).unwrap();
        assert_eq!(fetched.dir_children_count(), Some(1));
    }

    #[test]
    fn update_missing_inode_fails() {
        let mut device = formatted_device();
        let record = InodeRecord::new_file(99, 3, Mode::from_bits_truncate(0o644));
        assert_eq!(
            InodeStore::update(&mut device, 1, &record),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_missing_inode_fails() {
        let device = formatted_device();
        assert_eq!(InodeStore::get(&device, 1, 99), Err(Error::NotFound));
    }

    #[test]
    fn append_at_capacity_fails() {
        let mut device = formatted_device();
        let record = InodeRecord::new_file(2, 3, Mode::from_bits_truncate(0o644));
        assert_eq!(
            InodeStore::append(&mut device, MAX_OBJECTS, &record),
            Err(Error::NoSpace)
        );
    }
}
