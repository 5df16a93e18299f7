//! This module contains the [`TokenFs`] type itself.

use crate::dir::ChildSource;
use crate::node::Node;
use crate::{
    BufferCopier, DirCookie, FsError, HostCopy, NodeHandle, NodeKind, NodeMetadata, OpenDirectory,
    OpenFile, OpenHandle, ReadDirBatch, ReadOutcome, Result, SentenceRenderer, TokenFsConfig,
};
use parking_lot::RwLock;
use slab::Slab;
use std::fmt;
use std::sync::Arc;

/// The token store.
///
/// This type can be cloned, it's a light copy of the shared node table.
/// Every node is created empty and lives until the store is dropped.
#[derive(Clone)]
pub struct TokenFs {
    pub(crate) inner: Arc<TokenFsInner>,
}

pub(crate) struct TokenFsInner {
    config: TokenFsConfig,
    copier: Arc<dyn BufferCopier>,
    storage: RwLock<Slab<Arc<Node>>>,
}

impl Default for TokenFs {
    fn default() -> Self {
        Self::build(TokenFsConfig::default(), Arc::new(HostCopy))
    }
}

impl fmt::Debug for TokenFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenFs")
            .field("config", &self.inner.config)
            .field("copier", &self.inner.copier)
            .field("nodes", &self.node_count())
            .finish()
    }
}

impl TokenFs {
    /// A store moving bytes with plain slice copies.
    pub fn new(config: TokenFsConfig) -> Result<Self> {
        Self::with_copier(config, Arc::new(HostCopy))
    }

    /// A store moving bytes across the caller boundary with `copier`.
    pub fn with_copier(config: TokenFsConfig, copier: Arc<dyn BufferCopier>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, copier))
    }

    fn build(config: TokenFsConfig, copier: Arc<dyn BufferCopier>) -> Self {
        let mut storage = Slab::new();
        let entry = storage.vacant_entry();
        let root = NodeHandle::from_slot(entry.key());
        debug_assert_eq!(root, NodeHandle::ROOT);
        entry.insert(Arc::new(Node::new_directory(root, root, "/".to_string())));
        tracing::debug!(?config, "token store created");

        Self {
            inner: Arc::new(TokenFsInner {
                config,
                copier,
                storage: RwLock::new(storage),
            }),
        }
    }

    pub fn config(&self) -> &TokenFsConfig {
        &self.inner.config
    }

    pub fn root(&self) -> NodeHandle {
        NodeHandle::ROOT
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.inner.storage.read().len()
    }

    /// Create an empty file or directory named `name` under `parent`.
    ///
    /// The new entry goes to the tail of the parent's listing.
    pub fn create_node(&self, parent: NodeHandle, name: &str, kind: NodeKind) -> Result<NodeHandle> {
        self.validate_name(name)?;
        let parent_node = self.inner.node(parent)?;
        let dir = parent_node.as_directory().ok_or(FsError::NotADirectory)?;

        let mut index = dir.index.lock();
        if index.find(name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let handle = {
            let mut storage = self.inner.storage.write();
            if self.inner.config.node_limit_reached(storage.len()) {
                tracing::debug!(
                    nodes = storage.len(),
                    limit = ?self.inner.config.max_nodes,
                    "node limit reached"
                );
                return Err(FsError::AllocationFailed);
            }
            let entry = storage.vacant_entry();
            let handle = NodeHandle::from_slot(entry.key());
            let node = match kind {
                NodeKind::File => Node::new_file(
                    handle,
                    parent,
                    name.to_string(),
                    self.inner.config.max_tokens_per_file,
                ),
                NodeKind::Directory => Node::new_directory(handle, parent, name.to_string()),
            };
            entry.insert(Arc::new(node));
            handle
        };
        index.push(name.to_string(), handle);

        tracing::debug!(
            parent = %parent,
            inode = %handle.inode(),
            child = name,
            ?kind,
            "node created"
        );
        Ok(handle)
    }

    /// Find the child of `parent` called `name`.
    pub fn lookup(&self, parent: NodeHandle, name: &str) -> Result<NodeHandle> {
        let parent_node = self.inner.node(parent)?;
        let dir = parent_node.as_directory().ok_or(FsError::NotADirectory)?;
        match name {
            "." => Ok(parent),
            ".." => Ok(parent_node.parent),
            _ => dir.index.lock().find(name).ok_or(FsError::NodeNotFound),
        }
    }

    pub fn metadata(&self, handle: NodeHandle) -> Result<NodeMetadata> {
        Ok(self.inner.node(handle)?.metadata())
    }

    /// Open a node. Files share their read cursor with every other open
    /// handle; directories start listing at position 0.
    pub fn open(&self, handle: NodeHandle) -> Result<OpenHandle> {
        let node = self.inner.node(handle)?;
        let open = match node.kind() {
            NodeKind::File => OpenHandle::File(OpenFile::new(self.clone(), node)),
            NodeKind::Directory => OpenHandle::Directory(OpenDirectory::new(self.clone(), node)),
        };
        Ok(open)
    }

    /// Link the words of `payload` into `file` right after token
    /// `token_offset`. See [`TokenSequence::write`](crate::TokenSequence::write).
    pub fn write(&self, file: NodeHandle, token_offset: usize, payload: &[u8]) -> Result<usize> {
        self.inner.write(&*self.inner.node(file)?, token_offset, payload)
    }

    /// Read the next token of `file` through its shared cursor.
    pub fn read_next(&self, file: NodeHandle, buf: &mut [u8]) -> Result<ReadOutcome> {
        self.inner.read_next(&*self.inner.node(file)?, buf)
    }

    /// Read the token at `token_offset` without touching the shared cursor.
    pub fn read_token(
        &self,
        file: NodeHandle,
        token_offset: usize,
        buf: &mut [u8],
    ) -> Result<ReadOutcome> {
        self.inner.read_token(&*self.inner.node(file)?, token_offset, buf)
    }

    /// Move the shared cursor of `file` back to its first token.
    pub fn rewind(&self, file: NodeHandle) -> Result<()> {
        self.inner.rewind(&*self.inner.node(file)?)
    }

    /// The sentence `file` is listed under.
    pub fn render(&self, file: NodeHandle) -> Result<Vec<u8>> {
        self.inner.lister().render(file)
    }

    /// List up to `max` entries of `dir` starting at `cookie`.
    pub fn enumerate(&self, dir: NodeHandle, cookie: DirCookie, max: usize) -> Result<ReadDirBatch> {
        self.inner.enumerate(&*self.inner.node(dir)?, cookie, max)
    }

    fn validate_name(&self, name: &str) -> Result<()> {
        let invalid = name.is_empty()
            || name.len() > self.inner.config.max_name_len
            || name == "."
            || name == ".."
            || name.bytes().any(|b| b == b'/' || b == 0);
        if invalid {
            return Err(FsError::InvalidName);
        }
        Ok(())
    }
}

impl TokenFsInner {
    pub(crate) fn node(&self, handle: NodeHandle) -> Result<Arc<Node>> {
        self.storage
            .read()
            .get(handle.slot())
            .cloned()
            .ok_or(FsError::NodeNotFound)
    }

    pub(crate) fn write(&self, node: &Node, token_offset: usize, payload: &[u8]) -> Result<usize> {
        let file = node.as_file().ok_or(FsError::NotAFile)?;
        let mut sequence = file.sequence.lock();
        sequence
            .write(token_offset, payload, &*self.copier)
            .inspect(|_| {
                tracing::debug!(
                    inode = %node.handle.inode(),
                    token_offset,
                    bytes = payload.len(),
                    tokens = sequence.len(),
                    "write"
                )
            })
            .inspect_err(|err| {
                tracing::warn!(inode = %node.handle.inode(), token_offset, error = %err, "write failed")
            })
    }

    pub(crate) fn read_next(&self, node: &Node, buf: &mut [u8]) -> Result<ReadOutcome> {
        let file = node.as_file().ok_or(FsError::NotAFile)?;
        file.sequence
            .lock()
            .read_next(buf, &*self.copier)
            .inspect_err(|err| {
                tracing::warn!(inode = %node.handle.inode(), error = %err, "read failed")
            })
    }

    /// Like [`read_next`](Self::read_next), with a buffer sized to fit the
    /// whole token. `None` at end of data.
    pub(crate) fn read_next_token(&self, node: &Node) -> Result<Option<Vec<u8>>> {
        let file = node.as_file().ok_or(FsError::NotAFile)?;
        let mut sequence = file.sequence.lock();
        let Some(len) = sequence.next_len() else {
            return Ok(None);
        };
        let mut buf = vec![0u8; len];
        let outcome = sequence.read_next(&mut buf, &*self.copier)?;
        buf.truncate(outcome.len);
        Ok(Some(buf))
    }

    pub(crate) fn read_token(
        &self,
        node: &Node,
        token_offset: usize,
        buf: &mut [u8],
    ) -> Result<ReadOutcome> {
        let file = node.as_file().ok_or(FsError::NotAFile)?;
        let outcome = file
            .sequence
            .lock()
            .read_token(token_offset, buf, &*self.copier)?;
        Ok(outcome)
    }

    pub(crate) fn rewind(&self, node: &Node) -> Result<()> {
        let file = node.as_file().ok_or(FsError::NotAFile)?;
        file.sequence.lock().rewind();
        Ok(())
    }

    pub(crate) fn enumerate(
        &self,
        node: &Node,
        cookie: DirCookie,
        max: usize,
    ) -> Result<ReadDirBatch> {
        let dir = node.as_directory().ok_or(FsError::NotADirectory)?;
        dir.index.lock().read_dir(cookie, max, &self.lister())
    }

    fn lister(&self) -> Lister<'_> {
        Lister {
            fs: self,
            renderer: SentenceRenderer::new(self.config.max_name_len),
        }
    }

    pub(crate) fn readdir_batch(&self) -> usize {
        self.config.readdir_batch
    }
}

/// Resolves listing children against the node table.
///
/// The table lock is only held while cloning a node out of it, never while
/// a child's own lock is taken.
struct Lister<'a> {
    fs: &'a TokenFsInner,
    renderer: SentenceRenderer,
}

impl ChildSource for Lister<'_> {
    fn is_listed(&self, child: NodeHandle) -> bool {
        self.fs
            .node(child)
            .is_ok_and(|node| node.kind() == NodeKind::File)
    }

    fn render(&self, child: NodeHandle) -> Result<Vec<u8>> {
        let node = self.fs.node(child)?;
        let file = node.as_file().ok_or(FsError::NotAFile)?;
        let sequence = file.sequence.lock();
        self.renderer.render(&sequence, &*self.fs.copier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn root_exists() {
        let fs = TokenFs::default();
        assert_eq!(fs.node_count(), 1);
        let root = fs.metadata(fs.root()).unwrap();
        assert_eq!(root.kind, NodeKind::Directory);
        assert_eq!(root.inode.get(), 1);
        assert_eq!(root.parent, NodeHandle::ROOT);
        assert_eq!(root.len, 0);
    }

    #[test]
    fn create_appends_to_parent() {
        let fs = TokenFs::default();
        let a = fs.create_node(fs.root(), "a", NodeKind::File).unwrap();
        let sub = fs.create_node(fs.root(), "sub", NodeKind::Directory).unwrap();
        let b = fs.create_node(sub, "b", NodeKind::File).unwrap();

        assert_eq!(a.inode().get(), 2);
        assert_eq!(fs.lookup(fs.root(), "a"), Ok(a));
        assert_eq!(fs.lookup(sub, "b"), Ok(b));
        assert_eq!(fs.lookup(sub, ".."), Ok(fs.root()));
        assert_eq!(fs.lookup(sub, "."), Ok(sub));
        assert_eq!(fs.lookup(fs.root(), "b"), Err(FsError::NodeNotFound));
        assert_eq!(fs.metadata(fs.root()).unwrap().len, 2);

        let root = fs.inner.node(fs.root()).unwrap();
        let names: Vec<_> = root
            .as_directory()
            .unwrap()
            .index
            .lock()
            .children()
            .iter()
            .map(|child| child.name.clone())
            .collect();
        assert_eq!(names, ["a", "sub"]);
    }

    #[test]
    fn create_rejects_bad_requests() {
        let fs = TokenFs::default();
        let file = fs.create_node(fs.root(), "f", NodeKind::File).unwrap();

        assert_eq!(
            fs.create_node(file, "x", NodeKind::File),
            Err(FsError::NotADirectory)
        );
        assert_eq!(
            fs.create_node(fs.root(), "f", NodeKind::Directory),
            Err(FsError::AlreadyExists)
        );
        for name in ["", ".", "..", "a/b", "nul\0"] {
            assert_eq!(
                fs.create_node(fs.root(), name, NodeKind::File),
                Err(FsError::InvalidName),
                "{name:?}"
            );
        }
        assert_eq!(
            fs.create_node(NodeHandle::from_slot(77), "x", NodeKind::File),
            Err(FsError::NodeNotFound)
        );
    }

    #[test]
    fn node_limit_refuses_allocation() {
        let fs = TokenFs::new(TokenFsConfig {
            max_nodes: Some(2),
            ..Default::default()
        })
        .unwrap();
        fs.create_node(fs.root(), "one", NodeKind::File).unwrap();
        assert_eq!(
            fs.create_node(fs.root(), "two", NodeKind::File),
            Err(FsError::AllocationFailed)
        );
        assert_eq!(fs.node_count(), 2);
        assert_eq!(fs.metadata(fs.root()).unwrap().len, 1);
    }

    #[test]
    fn file_operations_check_kind() {
        let fs = TokenFs::default();
        let mut buf = [0u8; 8];
        assert_eq!(fs.write(fs.root(), 0, b"x "), Err(FsError::NotAFile));
        assert_eq!(fs.read_next(fs.root(), &mut buf), Err(FsError::NotAFile));
        assert_eq!(fs.rewind(fs.root()), Err(FsError::NotAFile));

        let file = fs.create_node(fs.root(), "f", NodeKind::File).unwrap();
        assert_eq!(
            fs.enumerate(file, DirCookie::START, 4),
            Err(FsError::NotADirectory)
        );
    }

    #[test]
    fn metadata_counts_tokens() {
        let fs = TokenFs::default();
        let file = fs.create_node(fs.root(), "f", NodeKind::File).unwrap();
        fs.write(file, 0, b"a b c").unwrap();
        let meta = fs.metadata(file).unwrap();
        assert_eq!(meta.len, 2);
        assert_eq!(meta.name, "f");
        assert_eq!(meta.kind, NodeKind::File);
    }
}
