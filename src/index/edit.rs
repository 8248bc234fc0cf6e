//! In-place index edits: insert, remove, rename.
//!
//! Edits keep the pre-order layout intact by splicing whole records and
//! fixing up every stored offset that the splice moved. Name-table bytes
//! orphaned by removals and renames are left unreclaimed; the table is
//! rebuilt wholesale on the next full index build.

use crate::index::builder::IndexBuilder;
use crate::index::{encode_record, FsIndex, NODE_SIZE};
use tracing::debug;

impl FsIndex {
    /// Insert `path` as a fresh entry. No-op (returning false) when the
    /// parent is not present, the entry already exists, or the name is
    /// not representable.
    pub fn insert(&mut self, path: &str, is_dir: bool) -> bool {
        let Some((parent_chain, name)) = self.resolve_parent(path) else {
            return false;
        };
        self.insert_under(&parent_chain, name.as_bytes(), is_dir)
    }

    /// Remove `path` and, for directories, its whole subtree. No-op when
    /// the path is not present; the root record cannot be removed.
    pub fn remove(&mut self, path: &str) -> bool {
        let Some(chain) = self.find_chain(path) else {
            return false;
        };
        if chain.len() < 2 {
            return false;
        }
        let node = chain[chain.len() - 1];
        let ancestors = &chain[..chain.len() - 1];

        let start = node;
        let end = if self.is_dir(node) {
            self.subtree_end(node)
        } else {
            node + NODE_SIZE
        };
        let delta = end - start;

        let mut files = 0i64;
        let mut dirs = 0i64;
        let mut off = start;
        while off < end {
            if self.is_dir(off) {
                dirs += 1;
            } else {
                files += 1;
            }
            off += NODE_SIZE;
        }

        self.splice_nodes(start, delta, &[]);

        let total = self.nodes_len();
        let mut off = start;
        while off < total {
            if self.is_dir(off) {
                let cb = self.children_begin(off);
                let se = self.subtree_end(off);
                self.set_children_begin(off, cb - delta);
                self.set_subtree_end(off, se - delta);
            }
            off += NODE_SIZE;
        }
        for &anc in ancestors {
            let se = self.subtree_end(anc);
            self.set_subtree_end(anc, se - delta);
        }
        self.bump_counts(-files, -dirs);
        debug!(path, removed_bytes = delta, "Removed index entry");
        true
    }

    /// Rename `old` to `new`.
    ///
    /// A same-parent rename rewrites the basename in the name table when
    /// the new name fits the old slot, appending otherwise. Cross-parent
    /// renames decompose into remove + insert; when the moved entry is a
    /// directory and `new` is walkable on disk, the subtree is rebuilt at
    /// the new location instead of collapsing to an empty directory.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        let Some((old_parent, _)) = split_path(old) else {
            return false;
        };
        let Some((new_parent, new_name)) = split_path(new) else {
            return false;
        };

        if old_parent == new_parent {
            let Some(chain) = self.find_chain(old) else {
                return false;
            };
            return self.rename_in_place(chain[chain.len() - 1], new_name.as_bytes());
        }

        let Some(chain) = self.find_chain(old) else {
            return false;
        };
        let was_dir = self.is_dir(chain[chain.len() - 1]);
        self.remove(old);
        if was_dir && std::fs::metadata(new).map(|m| m.is_dir()).unwrap_or(false) {
            if self.graft_subtree(new) {
                return true;
            }
        }
        self.insert(new, was_dir)
    }

    /// Parent chain and basename for an entry that would live at `path`.
    fn resolve_parent<'p>(&self, path: &'p str) -> Option<(Vec<u32>, &'p str)> {
        let (parent, name) = split_path(path)?;
        if name.as_bytes().contains(&0) {
            return None;
        }
        let chain = self.find_chain(parent)?;
        Some((chain, name))
    }

    /// Insertion offset for `name` among the children of `parent`, or
    /// `None` when a child with that name already exists.
    fn sibling_slot(&self, parent: u32, name: &[u8]) -> Option<u32> {
        let end = self.subtree_end(parent);
        let mut child = self.children_begin(parent);
        let mut slot = end;
        while child < end {
            let cname = self.name(child);
            if cname == name {
                return None;
            }
            // In-place renames can leave siblings locally unordered, so
            // the duplicate check scans the whole run regardless.
            if cname > name && slot == end {
                slot = child;
            }
            child = self.next_sibling(child);
        }
        Some(slot)
    }

    fn insert_under(&mut self, chain: &[u32], name: &[u8], is_dir: bool) -> bool {
        let Some(&parent) = chain.last() else {
            return false;
        };
        if !self.is_dir(parent) || name.is_empty() {
            return false;
        }
        let Some(pos) = self.sibling_slot(parent, name) else {
            return false;
        };

        let name_off = self.append_name(name);
        let (cb, se) = if is_dir { (pos + NODE_SIZE, pos + NODE_SIZE) } else { (0, 0) };
        let record = encode_record(name_off, cb, se, is_dir);
        self.splice_nodes(pos, 0, &record);

        let total = self.nodes_len();
        let mut off = pos + NODE_SIZE;
        while off < total {
            if self.is_dir(off) {
                let cb = self.children_begin(off);
                let se = self.subtree_end(off);
                self.set_children_begin(off, cb + NODE_SIZE);
                self.set_subtree_end(off, se + NODE_SIZE);
            }
            off += NODE_SIZE;
        }
        for &anc in chain {
            let se = self.subtree_end(anc);
            self.set_subtree_end(anc, se + NODE_SIZE);
        }
        self.bump_counts(if is_dir { 0 } else { 1 }, if is_dir { 1 } else { 0 });
        true
    }

    fn rename_in_place(&mut self, node: u32, new_name: &[u8]) -> bool {
        if new_name.is_empty() || new_name.contains(&0) {
            return false;
        }
        let old_len = self.name(node).len();
        if new_name == self.name(node) {
            return false;
        }
        if new_name.len() <= old_len {
            let start = self.name_off(node) as usize;
            self.names[start..start + new_name.len()].copy_from_slice(new_name);
            self.names[start + new_name.len()] = 0;
        } else {
            let off = self.append_name(new_name);
            self.set_name_off(node, off);
        }
        true
    }

    /// Walk `path` on disk and splice the resulting subtree under its
    /// parent in this index.
    fn graft_subtree(&mut self, path: &str) -> bool {
        let Some((chain, name)) = self.resolve_parent(path) else {
            return false;
        };
        let Some(&parent) = chain.last() else {
            return false;
        };
        if !self.is_dir(parent) {
            return false;
        }
        let sub = match IndexBuilder::new(path).build() {
            Ok(sub) => sub,
            Err(e) => {
                debug!(path, error = %e, "Subtree rebuild failed, falling back to leaf insert");
                return false;
            }
        };
        let Some(pos) = self.sibling_slot(parent, name.as_bytes()) else {
            return false;
        };

        let sub_len = sub.nodes_len();
        let name_off = self.append_name(name.as_bytes());
        let names_base = self.names.len() as u32;
        self.names.extend_from_slice(&sub.names[1..]);

        // Sub offsets land at pos + offset; the sub root record becomes
        // the grafted directory's own record.
        let mut block = Vec::with_capacity(sub_len as usize);
        block.extend_from_slice(&encode_record(name_off, pos + NODE_SIZE, pos + sub_len, true));
        let mut sub_off = NODE_SIZE;
        while sub_off < sub_len {
            let n = names_base + (sub.name_off(sub_off) - 1);
            let (cb, se) = if sub.is_dir(sub_off) {
                (sub.children_begin(sub_off) + pos, sub.subtree_end(sub_off) + pos)
            } else {
                (0, 0)
            };
            block.extend_from_slice(&encode_record(n, cb, se, sub.is_dir(sub_off)));
            sub_off += NODE_SIZE;
        }
        self.splice_nodes(pos, 0, &block);

        let total = self.nodes_len();
        let mut off = pos + sub_len;
        while off < total {
            if self.is_dir(off) {
                let cb = self.children_begin(off);
                let se = self.subtree_end(off);
                self.set_children_begin(off, cb + sub_len);
                self.set_subtree_end(off, se + sub_len);
            }
            off += NODE_SIZE;
        }
        for &anc in &chain {
            let se = self.subtree_end(anc);
            self.set_subtree_end(anc, se + sub_len);
        }
        self.bump_counts(sub.file_count() as i64, sub.dir_count() as i64 + 1);
        debug!(path, grafted_bytes = sub_len, "Rebuilt moved subtree");
        true
    }
}

/// Split an absolute path into parent and basename.
fn split_path(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let pos = trimmed.rfind('/')?;
    let name = &trimmed[pos + 1..];
    if name.is_empty() {
        return None;
    }
    let parent = if pos == 0 { "/" } else { &trimmed[..pos] };
    Some((parent, name))
}
