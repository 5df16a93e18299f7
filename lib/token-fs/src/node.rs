use crate::dir::DirectoryIndex;
use crate::{InodeNumber, NodeHandle, TokenSequence};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMetadata {
    pub handle: NodeHandle,
    pub inode: InodeNumber,
    pub kind: NodeKind,
    pub name: String,
    pub parent: NodeHandle,
    /// Token count of a file, child count of a directory.
    pub len: u64,
    /// Handles currently open on the node.
    pub open_count: usize,
}

#[derive(Debug)]
pub(crate) struct FileNode {
    pub(crate) sequence: Mutex<TokenSequence>,
}

#[derive(Debug)]
pub(crate) struct DirectoryNode {
    pub(crate) index: Mutex<DirectoryIndex>,
}

#[derive(Debug)]
pub(crate) enum NodeState {
    File(FileNode),
    Directory(DirectoryNode),
}

/// One entry of the node table. Per-node state sits behind its own lock so
/// reads, writes and listings on different nodes never contend.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) handle: NodeHandle,
    pub(crate) name: String,
    pub(crate) parent: NodeHandle,
    pub(crate) state: NodeState,
    open_count: AtomicUsize,
}

impl Node {
    pub(crate) fn new_file(
        handle: NodeHandle,
        parent: NodeHandle,
        name: String,
        max_tokens: Option<u64>,
    ) -> Self {
        Self::new(
            handle,
            parent,
            name,
            NodeState::File(FileNode {
                sequence: Mutex::new(TokenSequence::with_token_limit(max_tokens)),
            }),
        )
    }

    pub(crate) fn new_directory(handle: NodeHandle, parent: NodeHandle, name: String) -> Self {
        Self::new(
            handle,
            parent,
            name,
            NodeState::Directory(DirectoryNode {
                index: Mutex::new(DirectoryIndex::new(handle, parent)),
            }),
        )
    }

    fn new(handle: NodeHandle, parent: NodeHandle, name: String, state: NodeState) -> Self {
        Self {
            handle,
            name,
            parent,
            state,
            open_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self.state {
            NodeState::File(_) => NodeKind::File,
            NodeState::Directory(_) => NodeKind::Directory,
        }
    }

    pub(crate) fn as_file(&self) -> Option<&FileNode> {
        match &self.state {
            NodeState::File(file) => Some(file),
            NodeState::Directory(_) => None,
        }
    }

    pub(crate) fn as_directory(&self) -> Option<&DirectoryNode> {
        match &self.state {
            NodeState::Directory(dir) => Some(dir),
            NodeState::File(_) => None,
        }
    }

    pub(crate) fn opened(&self) -> usize {
        self.open_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn released(&self) -> usize {
        self.open_count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub(crate) fn metadata(&self) -> NodeMetadata {
        let len = match &self.state {
            NodeState::File(file) => file.sequence.lock().len(),
            NodeState::Directory(dir) => dir.index.lock().len(),
        };
        NodeMetadata {
            handle: self.handle,
            inode: self.handle.inode(),
            kind: self.kind(),
            name: self.name.clone(),
            parent: self.parent,
            len: len as u64,
            open_count: self.open_count.load(Ordering::Acquire),
        }
    }
}
