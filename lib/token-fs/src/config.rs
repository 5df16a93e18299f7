use crate::{FsError, Result};

#[derive(Clone, Debug)]
pub struct TokenFsConfig {
    /// Optional max node count (root included) allowed in this store.
    pub max_nodes: Option<u64>,
    /// Optional max token count allowed in a single file.
    pub max_tokens_per_file: Option<u64>,
    /// Longest accepted child name, in bytes. Also bounds the rendered
    /// sentence used as a listing name.
    pub max_name_len: usize,
    /// Number of entries an `OpenDirectory` asks for per batch.
    pub readdir_batch: usize,
}

impl Default for TokenFsConfig {
    fn default() -> Self {
        Self {
            max_nodes: None,
            max_tokens_per_file: None,
            max_name_len: 255,
            readdir_batch: 16,
        }
    }
}

impl TokenFsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_name_len == 0 || self.readdir_batch == 0 {
            return Err(FsError::InvalidConfig);
        }
        // The root directory occupies the first slot.
        if self.max_nodes == Some(0) {
            return Err(FsError::InvalidConfig);
        }
        Ok(())
    }

    pub(crate) fn node_limit_reached(&self, live_nodes: usize) -> bool {
        self.max_nodes.is_some_and(|max| live_nodes as u64 >= max)
    }
}
