//! The byte-copy primitive supplied by whoever hosts the store.
//!
//! The host decides what "external" memory is (a user address space, a
//! message buffer, a plain slice). The store only ever moves bytes across
//! that boundary through this trait, and treats each copy as all-or-nothing.

use crate::{FsError, Result};
use std::fmt;

pub trait BufferCopier: fmt::Debug + Send + Sync {
    /// Copy `src` (store memory) into `dest` (caller memory). Both slices
    /// have the same length.
    fn copy_out(&self, dest: &mut [u8], src: &[u8]) -> Result<()>;

    /// Copy `src` (caller memory) into `dest` (store memory). Both slices
    /// have the same length.
    fn copy_in(&self, dest: &mut [u8], src: &[u8]) -> Result<()>;
}

/// Copier for callers sharing the store's address space; it never faults.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostCopy;

impl BufferCopier for HostCopy {
    fn copy_out(&self, dest: &mut [u8], src: &[u8]) -> Result<()> {
        checked_copy(dest, src)
    }

    fn copy_in(&self, dest: &mut [u8], src: &[u8]) -> Result<()> {
        checked_copy(dest, src)
    }
}

fn checked_copy(dest: &mut [u8], src: &[u8]) -> Result<()> {
    if dest.len() != src.len() {
        return Err(FsError::Fault);
    }
    dest.copy_from_slice(src);
    Ok(())
}
