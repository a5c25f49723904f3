//! Loads, validates and mutates the superblock (block 0): magic/block-size
//! validation on mount, the free-block bitmap, and the lowest-index-first
//! allocator.

use log::{debug, trace, warn};

use crate::block::BlockDevice;
use crate::error::Error;
use crate::layout::{self, BlockBuf, Superblock, BLOCK_SIZE, SUPERBLOCK_BLOCK};

/// Owns the loaded superblock and the free-block bitmap for the life of a
/// mount. All allocator and superblock mutations go through here so that
/// `persist` is the single place a crash can be reasoned about.
#[derive(Debug, PartialEq, Eq)]
pub struct SuperblockManager {
    superblock: Superblock,
}

impl SuperblockManager {
    /// Reads block 0 and validates it. Fails with [`Error::NotAssoofs`] or
    /// [`Error::WrongBlockSize`] without mutating anything.
    pub fn load<D: BlockDevice>(device: &D) -> Result<SuperblockManager, Error> {
        let mut buf: BlockBuf = [0u8; BLOCK_SIZE];
        trace!("reading block {}", SUPERBLOCK_BLOCK);
        device.read_block(SUPERBLOCK_BLOCK, &mut buf).map_err(Into::into)?;
        let superblock = Superblock::decode(&buf)?;
        debug!(
            "loaded superblock: inodes_count={} free_blocks={:#066b}",
            superblock.inodes_count, superblock.free_blocks
        );
        Ok(SuperblockManager { superblock })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn inodes_count(&self) -> u64 {
        self.superblock.inodes_count
    }

    pub fn set_inodes_count(&mut self, count: u64) {
        self.superblock.inodes_count = count;
    }

    /// Scans the free-block bitmap for the lowest-indexed free block with
    /// index >= 2 (blocks 0 and 1 are reserved for the superblock and the
    /// inode store), clears it, persists, and returns it.
    pub fn allocate_block<D: BlockDevice>(&mut self, device: &mut D) -> Result<u64, Error> {
        for bit in 2..64 {
            if self.superblock.free_blocks & (1u64 << bit) != 0 {
                self.superblock.free_blocks &= !(1u64 << bit);
                self.persist(device)?;
                debug!("allocated block {}", bit);
                return Ok(bit);
            }
        }
        warn!("allocate_block: no free block available");
        Err(Error::NoSpace)
    }

    /// Writes the superblock back to block 0 and flushes synchronously.
    /// Every mutator above calls this before returning control to its
    /// caller, per the ordering rules in SPEC_FULL.md §5.
    pub fn persist<D: BlockDevice>(&self, device: &mut D) -> Result<(), Error> {
        let mut buf: BlockBuf = [0u8; BLOCK_SIZE];
        self.superblock.encode(&mut buf);
        trace!("writing block {}", SUPERBLOCK_BLOCK);
        device.write_block(SUPERBLOCK_BLOCK, &buf).map_err(Into::into)?;
        device.flush().map_err(Into::into)?;
        Ok(())
    }

    /// Formats a fresh image: a clean superblock, one root-directory inode
    /// record in block 1, and a zeroed root directory data block. Exists
    /// for tests and embedders that need a ready-made image rather than one
    /// produced by a separate `mkfs` (out of scope per SPEC_FULL.md §1).
    pub fn format<D: BlockDevice>(device: &mut D) -> Result<(), Error> {
        let superblock = Superblock::fresh();
        let mut sb_buf: BlockBuf = [0u8; BLOCK_SIZE];
        superblock.encode(&mut sb_buf);
        trace!("writing block {}", SUPERBLOCK_BLOCK);
        device.write_block(SUPERBLOCK_BLOCK, &sb_buf).map_err(Into::into)?;

        let root = crate::layout::InodeRecord::new_dir(
            layout::ROOTDIR_INO,
            layout::ROOTDIR_BLOCK,
            crate::layout::Mode::from_bits_truncate(0o755),
        );
        let mut inode_buf: BlockBuf = [0u8; BLOCK_SIZE];
        let mut raw = [0u8; layout::INODE_RECORD_SIZE];
        root.encode(&mut raw);
        inode_buf[..layout::INODE_RECORD_SIZE].copy_from_slice(&raw);
        trace!("writing block {}", layout::INODESTORE_BLOCK);
        device
            .write_block(layout::INODESTORE_BLOCK, &inode_buf)
            .map_err(Into::into)?;

        let root_dir_buf: BlockBuf = [0u8; BLOCK_SIZE];
        trace!("writing block {}", layout::ROOTDIR_BLOCK);
        device
            .write_block(layout::ROOTDIR_BLOCK, &root_dir_buf)
            .map_err(Into::into)?;

        device.flush().map_err(Into::into)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::MemoryBlockDevice;

    #[test]
    fn load_fresh_image() {
        let mut device = MemoryBlockDevice::new();
        SuperblockManager::format(&mut device).unwrap();
        let mgr = SuperblockManager::load(&device).unwrap();
        assert_eq!(mgr.inodes_count(), 1);
    }

    #[test]
    fn load_rejects_bad_magic() {
        let mut device = MemoryBlockDevice::new();
        SuperblockManager::format(&mut device).unwrap();
        device.raw_block_mut(SUPERBLOCK_BLOCK)[8] ^= 0xff;
        assert_eq!(SuperblockManager::load(&device), Err(Error::NotAssoofs));
    }

    #[test]
    fn allocate_block_is_lowest_index_first() {
        let mut device = MemoryBlockDevice::new();
        SuperblockManager::format(&mut device).unwrap();
        let mut mgr = SuperblockManager::load(&device).unwrap();

        let first = mgr.allocate_block(&mut device).unwrap();
        assert_eq!(first, 3);
        let second = mgr.allocate_block(&mut device).unwrap();
        assert_eq!(second, 4);

        assert_eq!(mgr.superblock().free_blocks & (1 << 3), 0);
        assert_eq!(mgr.superblock().free_blocks & (1 << 4), 0);
    }

    #[test]
    fn allocate_block_persists_immediately() {
        let mut device = MemoryBlockDevice::new();
        SuperblockManager::format(&mut device).unwrap();
        let mut mgr = SuperblockManager::load(&device).unwrap();
        let block = mgr.allocate_block(&mut device).unwrap();

        let reloaded = SuperblockManager::load(&device).unwrap();
        assert_eq!(reloaded.superblock().free_blocks & (1 << block), 0);
    }

    #[test]
    fn allocate_block_exhaustion() {
        let mut device = MemoryBlockDevice::new();
        SuperblockManager::format(&mut device).unwrap();
        let mut mgr = SuperblockManager::load(&device).unwrap();

        // Blocks 0, 1 and 2 are reserved (superblock, inode store, root
        // directory data), leaving bits 3..=63 — 61 blocks — allocatable.
        for _ in 3..64 {
            mgr.allocate_block(&mut device).unwrap();
        }
        assert_eq!(mgr.allocate_block(&mut device), Err(Error::NoSpace));
    }
}
