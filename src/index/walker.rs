//! Filesystem walker feeding index construction.

use std::os::unix::ffi::OsStrExt;
use walkdir::WalkDir;

/// One enumerated filesystem entry.
#[derive(Debug)]
pub struct WalkEntry {
    /// Raw basename bytes, no separator, no terminator.
    pub name: Vec<u8>,
    /// Depth below the walk root; direct children are at depth 1.
    pub depth: usize,
    pub is_dir: bool,
}

/// Depth-first pre-order walker with byte-lexicographic sibling order.
///
/// Symbolic links are reported as leaves and never followed into
/// directories, so cyclic link structures cannot loop the walk. The order
/// is locale-independent: siblings compare as raw bytes.
pub struct Walker {
    inner: walkdir::IntoIter,
}

impl Walker {
    pub fn new(root: &str) -> Self {
        let inner = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter();
        Self { inner }
    }
}

impl Iterator for Walker {
    type Item = Result<WalkEntry, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(WalkEntry {
            name: entry.file_name().as_bytes().to_vec(),
            depth: entry.depth(),
            is_dir: entry.file_type().is_dir(),
        }))
    }
}
