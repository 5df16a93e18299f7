//! A volatile, in-memory store whose regular files are ordered sequences of
//! word tokens and whose directory listings are synthesized sentences.
//!
//! Offsets passed to [`TokenFs::write`] and [`TokenFs::read_token`] address
//! tokens, not bytes. Reads go through a cursor shared by every handle open
//! on the same file, one token per call.

mod config;
mod copy;
mod dir;
mod filesystem;
mod handle;
mod ids;
mod node;
mod sentence;
mod sequence;
mod token;

pub use config::TokenFsConfig;
pub use copy::{BufferCopier, HostCopy};
pub use dir::{DirCookie, DirEntry, DirEntryKind, ReadDirBatch};
pub use filesystem::TokenFs;
pub use handle::{OpenDirectory, OpenFile, OpenHandle};
pub use ids::{InodeNumber, NodeHandle};
pub use node::{NodeKind, NodeMetadata};
pub use sentence::SentenceRenderer;
pub use sequence::{ReadOutcome, TokenSequence};
pub use token::Token;

use thiserror::Error;

pub type Result<T, E = FsError> = std::result::Result<T, E>;

/// Error type for external users
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsError {
    /// A node or a token buffer could not be allocated. The store is left
    /// consistent and only the requesting operation fails.
    #[error("allocation failed")]
    AllocationFailed,
    /// The external copy primitive reported a failure
    #[error("bad address")]
    Fault,
    /// The handle does not name a node of this store
    #[error("node not found")]
    NodeNotFound,
    /// Expected a directory but found a file
    #[error("not a directory")]
    NotADirectory,
    /// Expected a file but found a directory
    #[error("not a file")]
    NotAFile,
    /// The parent directory already holds an entry with this name
    #[error("file exists")]
    AlreadyExists,
    /// The name is empty, too long, reserved or contains a separator
    #[error("invalid name")]
    InvalidName,
    /// A configuration value is out of range
    #[error("invalid configuration")]
    InvalidConfig,
}
