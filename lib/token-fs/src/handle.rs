//! Open handles and the open/close lifecycle.
//!
//! A handle keeps no state of its own for files: every `OpenFile` on a node
//! reads through the node's shared cursor. An `OpenDirectory` only carries
//! its listing position.

use crate::node::Node;
use crate::{
    DirCookie, NodeHandle, NodeKind, NodeMetadata, ReadDirBatch, ReadOutcome, Result, TokenFs,
};
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub enum OpenHandle {
    File(OpenFile),
    Directory(OpenDirectory),
}

impl OpenHandle {
    pub fn handle(&self) -> NodeHandle {
        match self {
            Self::File(file) => file.handle(),
            Self::Directory(dir) => dir.handle(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::File(_) => NodeKind::File,
            Self::Directory(_) => NodeKind::Directory,
        }
    }

    pub fn into_file(self) -> Option<OpenFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Directory(_) => None,
        }
    }

    pub fn into_directory(self) -> Option<OpenDirectory> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::File(_) => None,
        }
    }
}

/// Registers one open on a node for as long as it lives.
struct OpenGuard {
    fs: TokenFs,
    node: Arc<Node>,
}

impl OpenGuard {
    fn new(fs: TokenFs, node: Arc<Node>) -> Self {
        let open_count = node.opened();
        tracing::trace!(inode = %node.handle.inode(), open_count, "open");
        Self { fs, node }
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        let open_count = self.node.released();
        tracing::trace!(inode = %self.node.handle.inode(), open_count, "release");
    }
}

impl fmt::Debug for OpenGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenGuard")
            .field("handle", &self.node.handle)
            .finish()
    }
}

#[derive(Debug)]
pub struct OpenFile {
    guard: OpenGuard,
}

impl OpenFile {
    pub(crate) fn new(fs: TokenFs, node: Arc<Node>) -> Self {
        Self {
            guard: OpenGuard::new(fs, node),
        }
    }

    pub fn handle(&self) -> NodeHandle {
        self.guard.node.handle
    }

    pub fn metadata(&self) -> NodeMetadata {
        self.guard.node.metadata()
    }

    /// Read one token through the cursor shared with every other handle on
    /// this file.
    pub fn read(&self, buf: &mut [u8]) -> Result<ReadOutcome> {
        self.guard.fs.inner.read_next(&self.guard.node, buf)
    }

    pub fn read_token(&self, token_offset: usize, buf: &mut [u8]) -> Result<ReadOutcome> {
        self.guard.fs.inner.read_token(&self.guard.node, token_offset, buf)
    }

    pub fn write(&self, token_offset: usize, payload: &[u8]) -> Result<usize> {
        self.guard.fs.inner.write(&self.guard.node, token_offset, payload)
    }

    pub fn rewind(&self) -> Result<()> {
        self.guard.fs.inner.rewind(&self.guard.node)
    }

    /// Read every remaining token through the shared cursor.
    pub fn read_to_end(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(token) = self.guard.fs.inner.read_next_token(&self.guard.node)? {
            out.extend_from_slice(&token);
        }
        Ok(out)
    }
}

#[derive(Debug)]
pub struct OpenDirectory {
    guard: OpenGuard,
    position: Option<DirCookie>,
}

impl OpenDirectory {
    pub(crate) fn new(fs: TokenFs, node: Arc<Node>) -> Self {
        Self {
            guard: OpenGuard::new(fs, node),
            position: Some(DirCookie::START),
        }
    }

    pub fn handle(&self) -> NodeHandle {
        self.guard.node.handle
    }

    pub fn metadata(&self) -> NodeMetadata {
        self.guard.node.metadata()
    }

    /// Position the next batch starts at, `None` once exhausted.
    pub fn tell(&self) -> Option<DirCookie> {
        self.position
    }

    pub fn seek(&mut self, cookie: DirCookie) {
        self.position = Some(cookie);
    }

    /// Next batch of at most `max` entries. An exhausted listing keeps
    /// returning empty batches.
    pub fn read_dir(&mut self, max: usize) -> Result<ReadDirBatch> {
        let Some(cookie) = self.position else {
            return Ok(ReadDirBatch {
                entries: Default::default(),
                next: None,
            });
        };
        let batch = self.guard.fs.inner.enumerate(&self.guard.node, cookie, max)?;
        self.position = batch.next;
        Ok(batch)
    }

    /// Next batch sized by the store configuration.
    pub fn next_batch(&mut self) -> Result<ReadDirBatch> {
        self.read_dir(self.guard.fs.inner.readdir_batch())
    }
}
