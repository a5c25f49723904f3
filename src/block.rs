//! The block-device capability the host injects into the core.
//!
//! This models §6's "block read(block_no) -> buffer" / "block write(block_no,
//! buffer) + mark-dirty + sync" contract. The actual I/O primitive (talking
//! to a character device, a loop-mounted image, or a RAM disk) is entirely
//! the host's concern; the core only ever sees whole, fixed-size blocks.

use crate::layout::BlockBuf;

/// A fixed-block-size store the core reads and writes whole blocks from.
///
/// Implementations are expected to make every `write_block` durable before
/// returning `Ok`, i.e. `write_block` already implies `flush` for that
/// block; `flush` exists for callers that batch several block writes and
/// want one explicit sync point (matching the "mark dirty + sync" two-step
/// in the VFS host contract).
pub trait BlockDevice {
    type Error: Into<crate::error::Error>;

    /// Reads the block at `block_no` in full.
    fn read_block(&self, block_no: u64, buf: &mut BlockBuf) -> Result<(), Self::Error>;

    /// Writes `buf` to the block at `block_no` and marks it dirty.
    fn write_block(&mut self, block_no: u64, buf: &BlockBuf) -> Result<(), Self::Error>;

    /// Synchronously flushes any writes not yet durable.
    fn flush(&mut self) -> Result<(), Self::Error>;
}
