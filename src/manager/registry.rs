//! Mount-point registry: the map from mount-point path to index state.

use crate::index::FsIndex;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A shared, independently lockable index. Multi-mount devices alias one
/// value under several registry keys; the buffer is freed when the last
/// key (and borrower) lets go.
pub type SharedIndex = Arc<RwLock<FsIndex>>;

/// Completion handle for an in-flight build.
///
/// Resolves exactly once, to the installed index or `None` on failure;
/// every waiter observes the same resolution.
pub struct BuildTicket {
    result: Mutex<Option<Option<SharedIndex>>>,
    done: Condvar,
}

impl BuildTicket {
    pub(crate) fn new() -> Arc<BuildTicket> {
        Arc::new(BuildTicket {
            result: Mutex::new(None),
            done: Condvar::new(),
        })
    }

    pub(crate) fn complete(&self, outcome: Option<SharedIndex>) {
        let mut slot = self.result.lock();
        if slot.is_none() {
            *slot = Some(outcome);
            self.done.notify_all();
        }
    }

    /// Block until the build resolves.
    pub fn wait(&self) -> Option<SharedIndex> {
        let mut slot = self.result.lock();
        while slot.is_none() {
            self.done.wait(&mut slot);
        }
        slot.as_ref().and_then(|outcome| outcome.clone())
    }

    /// The resolution, if the build has finished.
    pub fn try_result(&self) -> Option<Option<SharedIndex>> {
        self.result.lock().clone()
    }
}

/// Registry value for one mount-point key.
#[derive(Clone)]
pub enum IndexState {
    /// Construction in flight; carries the completion handle.
    Building(Arc<BuildTicket>),
    /// Usable index.
    Ready(SharedIndex),
}

/// Outcome of resolving a caller path against the registry.
pub(crate) enum Located {
    /// Matched a ready index. `key` is the matched mount point and
    /// `local` the caller path rewritten into the index's coordinates.
    Ready {
        key: String,
        index: SharedIndex,
        local: String,
    },
    Building,
    Absent,
}

#[derive(Default)]
pub(crate) struct RegisterMap {
    entries: BTreeMap<String, IndexState>,
}

impl RegisterMap {
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&IndexState> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, state: IndexState) {
        self.entries.insert(key, state);
    }

    pub fn remove(&mut self, key: &str) -> Option<IndexState> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn ready_entries(&self) -> Vec<(String, SharedIndex)> {
        self.entries
            .iter()
            .filter_map(|(key, state)| match state {
                IndexState::Ready(index) => Some((key.clone(), index.clone())),
                IndexState::Building(_) => None,
            })
            .collect()
    }

    /// Resolve `path` (normalized, absolute) to its governing registry
    /// entry by walking the path leftward one separator at a time; the
    /// longest matching prefix wins and the walk continues all the way
    /// down to `/`.
    pub fn locate(&self, path: &str) -> Located {
        if !path.starts_with('/') {
            return Located::Absent;
        }
        let mut candidate = path.to_string();
        loop {
            if let Some(state) = self.entries.get(&candidate) {
                return match state {
                    IndexState::Building(_) => Located::Building,
                    IndexState::Ready(index) => {
                        let local = rewrite_local(path, &candidate, index.read().root());
                        Located::Ready {
                            key: candidate,
                            index: index.clone(),
                            local,
                        }
                    }
                };
            }
            if candidate == "/" {
                return Located::Absent;
            }
            candidate = parent_of(&candidate);
        }
    }
}

/// Normalize a caller path into registry-key form: absolute, no trailing
/// separator (the filesystem root stays `/`).
pub(crate) fn normalize_key(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(key: &str) -> String {
    match key.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(pos) => key[..pos].to_string(),
    }
}

/// Rewrite `path` from caller coordinates (under matched key `key`) into
/// the coordinates of an index rooted at `root`.
pub(crate) fn rewrite_local(path: &str, key: &str, root: &str) -> String {
    let suffix = if key == "/" { path } else { &path[key.len()..] };
    let root_trim = root.trim_end_matches('/');
    let mut local = format!("{root_trim}{suffix}");
    if local.is_empty() {
        local.push('/');
    }
    while local.len() > 1 && local.ends_with('/') {
        local.pop();
    }
    local
}
