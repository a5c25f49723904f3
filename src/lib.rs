//! A small block-based filesystem core, meant to sit behind a VFS host the
//! way a real kernel filesystem module does: the host owns dentries, page
//! cache and syscall plumbing, and calls into the functions re-exported here
//! for the on-disk work.
//!
//! `no_std` outside of tests: nothing in the core path allocates. The one
//! piece of shared mutable state, [`vfs::Assoofs`], is guarded by a
//! `spin::RwLock` so the crate is safe to mount from more than one thread
//! without relying on a host-provided mutex.

#![cfg_attr(not(test), no_std)]

#[cfg(test)]
extern crate std;

pub mod block;
pub mod dir;
pub mod error;
pub mod file;
pub mod inode_store;
pub mod layout;
pub mod superblock;
pub mod vfs;

pub use block::BlockDevice;
pub use error::{Error, HostErrno};
pub use layout::Mode;
pub use vfs::{Assoofs, DirEntrySink, InodeHandle, IterCursor};
