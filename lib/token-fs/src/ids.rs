//! Node identifier types.

use core::fmt;
use core::num::NonZeroU64;

/// Opaque handle naming a node of one mounted store.
///
/// Handles are slot indices into the node table and stay valid for the
/// lifetime of the store (nodes are never removed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// The root directory, always the first node allocated.
    pub const ROOT: NodeHandle = NodeHandle(0);

    #[inline]
    pub(crate) fn from_slot(slot: usize) -> Self {
        Self(slot)
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0
    }

    /// Serial inode number of the node behind this handle.
    #[inline]
    pub fn inode(self) -> InodeNumber {
        InodeNumber::from_slot(self.0)
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inode number reported to the host (the root is `1`).
///
/// `0` is reserved for "unset/invalid".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InodeNumber(NonZeroU64);

impl InodeNumber {
    /// Create an inode number from a raw value (must be non-zero).
    #[inline]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[inline]
    fn from_slot(slot: usize) -> Self {
        Self(NonZeroU64::MIN.saturating_add(slot as u64))
    }

    /// Get the raw inode number.
    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
