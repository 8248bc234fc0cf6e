//! Index construction by walking a directory tree once.

use crate::error::IndexError;
use crate::index::walker::Walker;
use crate::index::FsIndex;
use std::time::Instant;
use tracing::{error, info, instrument};

// Initial reservation for the backing regions, ~16 MiB combined. Both
// regions grow geometrically past this.
const NODE_RESERVE: usize = 12 << 20;
const NAME_RESERVE: usize = 4 << 20;

/// Builds an [`FsIndex`] from a single pre-order walk.
pub struct IndexBuilder {
    root: String,
}

impl IndexBuilder {
    /// Create a builder for the given absolute root path. A trailing
    /// separator is added when missing.
    pub fn new(root: impl Into<String>) -> Self {
        let mut root = root.into();
        if !root.ends_with('/') {
            root.push('/');
        }
        Self { root }
    }

    /// Walk the filesystem and assemble the index.
    ///
    /// Records are appended in visitation order; each directory's subtree
    /// end is back-patched once the walk leaves it. Any walker error
    /// discards the partial buffer.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn build(&self) -> Result<FsIndex, IndexError> {
        let start = Instant::now();
        let mut index = FsIndex::with_root(self.root.clone());
        index.reserve(NODE_RESERVE, NAME_RESERVE);

        // Directories whose subtree end is not yet known; the root record
        // stays open for the whole walk.
        let mut open_dirs: Vec<u32> = vec![0];

        for entry in Walker::new(&self.root) {
            let entry = entry.map_err(|e| {
                error!(root = %self.root, error = %e, "Filesystem walk failed");
                IndexError::BuildFailed(e.to_string())
            })?;

            while open_dirs.len() > entry.depth {
                let done = open_dirs.pop().unwrap_or(0);
                let end = index.nodes_len();
                index.set_subtree_end(done, end);
            }

            let name_off = index.append_name(&entry.name);
            let off = index.nodes_len();
            let (children_begin, subtree_end) = if entry.is_dir {
                (off + crate::index::NODE_SIZE, 0)
            } else {
                (0, 0)
            };
            index.push_record(name_off, children_begin, subtree_end, entry.is_dir);
            if entry.is_dir {
                open_dirs.push(off);
                index.bump_counts(0, 1);
            } else {
                index.bump_counts(1, 0);
            }
        }

        while let Some(done) = open_dirs.pop() {
            let end = index.nodes_len();
            index.set_subtree_end(done, end);
        }

        info!(
            root = %self.root,
            files = index.file_count(),
            dirs = index.dir_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Index build completed"
        );
        Ok(index)
    }
}
