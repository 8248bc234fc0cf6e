//! Index manager: mount-point registry, background builds, persistence,
//! and mount-event intake.
//!
//! The registry lock guards only the mount-point map; callers clone the
//! owning reference out and operate on the index under its own lock.
//! Searches and sync take read locks, mutations take the write lock, and
//! builds run one worker thread each, installing their result (or backing
//! out) under the registry lock when they finish.

pub mod events;
pub mod persistence;
pub mod registry;

pub use registry::{BuildTicket, IndexState, SharedIndex};

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::index::{FsIndex, IndexBuilder, NameMatcher};
use crate::mount::{path_has_prefix, MountResolver, SerialUri};
use parking_lot::{Mutex, RwLock};
use registry::{normalize_key, rewrite_local, Located, RegisterMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Callback invoked once per registry key when a background build
/// resolves, with the installed index or `None` on failure.
pub type BuildListener = Box<dyn Fn(&str, Option<&SharedIndex>) + Send + Sync>;

/// Owns the registry and serves every index operation.
///
/// Dropping the manager syncs all resident indexes to disk and releases
/// them; there is no process-global state.
pub struct Manager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: ManagerConfig,
    resolver: Arc<dyn MountResolver>,
    cache_dir: PathBuf,
    registry: Mutex<RegisterMap>,
    listeners: Mutex<Vec<BuildListener>>,
}

impl Manager {
    /// Create a manager and load whatever the cache directory holds.
    pub fn new(config: ManagerConfig, resolver: Arc<dyn MountResolver>) -> Result<Manager, ManagerError> {
        let cache_dir = persistence::cache_dir(&config)?;
        let manager = Manager {
            inner: Arc::new(ManagerInner {
                config,
                resolver,
                cache_dir,
                registry: Mutex::new(RegisterMap::default()),
                listeners: Mutex::new(Vec::new()),
            }),
        };
        let loaded = manager.refresh(None);
        info!(
            cache_dir = %manager.inner.cache_dir.display(),
            loaded = loaded.len(),
            "Manager started"
        );
        Ok(manager)
    }

    /// The directory holding `.lft` files.
    pub fn cache_dir(&self) -> &Path {
        &self.inner.cache_dir
    }

    /// Register a listener for build completions.
    pub fn on_build_finished(&self, listener: impl Fn(&str, Option<&SharedIndex>) + Send + Sync + 'static) {
        self.inner.listeners.lock().push(Box::new(listener));
    }

    /// Start indexing the mount containing `path`.
    ///
    /// Every mount point of the underlying device is seeded as `Building`
    /// and the build itself runs on a worker thread against the device's
    /// first mount point. The returned ticket resolves when the build
    /// installs its index or fails.
    pub fn add_path(&self, path: &str) -> Result<Arc<BuildTicket>, ManagerError> {
        if !path.starts_with('/') {
            return Err(ManagerError::NotAbsolute(path.to_string()));
        }
        let key = normalize_key(path);
        let serial = self
            .inner
            .resolver
            .path_to_serial_uri(&key)
            .ok_or_else(|| ManagerError::UnknownMount(key.clone()))?;
        let mount_points: Vec<String> = self
            .inner
            .resolver
            .from_serial_uri(&serial)
            .iter()
            .map(|mount| normalize_key(mount))
            .collect();
        let Some(root) = mount_points.first().cloned() else {
            return Err(ManagerError::UnknownMount(key));
        };

        let ticket = BuildTicket::new();
        {
            let mut registry = self.inner.registry.lock();
            if registry.contains(&key) {
                return Err(ManagerError::AlreadyIndexed(key));
            }
            for mount in &mount_points {
                registry.insert(mount.clone(), IndexState::Building(ticket.clone()));
            }
        }
        info!(path = %key, root = %root, aliases = mount_points.len(), "Scheduled index build");

        let inner = Arc::clone(&self.inner);
        let worker_ticket = ticket.clone();
        thread::Builder::new()
            .name("lft-build".to_string())
            .spawn(move || run_build(inner, worker_ticket, root, mount_points))
            .map_err(ManagerError::Io)?;
        Ok(ticket)
    }

    /// True when `path` is covered by a ready index.
    pub fn has_lft(&self, path: &str) -> bool {
        matches!(self.locate(path), Located::Ready { .. })
    }

    /// True when the index covering `path` is still being built.
    pub fn lft_building(&self, path: &str) -> bool {
        matches!(self.locate(path), Located::Building)
    }

    /// Every registry key, in order.
    pub fn all_paths(&self) -> Vec<String> {
        self.inner.registry.lock().keys()
    }

    /// Registry keys lying underneath `path`.
    pub fn has_lft_subdirectories(&self, path: &str) -> Vec<String> {
        let base = normalize_key(path);
        let prefix = if base == "/" { "/".to_string() } else { format!("{base}/") };
        self.inner
            .registry
            .lock()
            .keys()
            .into_iter()
            .filter(|key| format!("{key}/").starts_with(&prefix))
            .collect()
    }

    /// Drop every resident index and reload the cache directory,
    /// restricted to files for `filter`'s device when given. Returns the
    /// registry keys installed. Unreadable files are skipped and left on
    /// disk for diagnosis.
    pub fn refresh(&self, filter: Option<&SerialUri>) -> Vec<String> {
        let mut registry = self.inner.registry.lock();
        registry.clear();

        let mut loaded = Vec::new();
        let entries = match fs::read_dir(&self.inner.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.inner.cache_dir.display(), error = %e, "Cannot read cache directory");
                return loaded;
            }
        };
        let filter_prefix = filter.map(persistence::encode_serial);

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable cache entry");
                    continue;
                }
            };
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = name.strip_suffix(persistence::LFT_SUFFIX) else {
                continue;
            };
            if let Some(prefix) = &filter_prefix {
                if !name.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            let path = entry.path();
            let index = match FsIndex::load(&path) {
                Ok(index) => index,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping corrupt index file");
                    continue;
                }
            };
            let serial = persistence::serial_from_file_stem(stem);
            let mounts = self.inner.resolver.from_serial_uri(&serial);
            if mounts.is_empty() {
                debug!(file = %path.display(), "Device not mounted, leaving file cached");
                continue;
            }
            let shared: SharedIndex = Arc::new(RwLock::new(index));
            for mount in mounts {
                let key = normalize_key(&mount);
                registry.insert(key.clone(), IndexState::Ready(shared.clone()));
                loaded.push(key);
            }
        }
        loaded
    }

    /// Write resident indexes to the cache directory, restricted to
    /// `mount_point`'s storage root when given. Shared indexes are
    /// written once and every alias key is still reported. Per-file
    /// failures are logged and skipped.
    pub fn sync(&self, mount_point: Option<&str>) -> Vec<String> {
        let snapshot = self.inner.registry.lock().ready_entries();
        let mut synced = Vec::new();
        let mut written: Vec<usize> = Vec::new();

        for (key, index) in snapshot {
            if let Some(mount) = mount_point {
                let mount = normalize_key(mount);
                match self.inner.resolver.storage_root(&key) {
                    Some(root) if normalize_key(&root) == mount => {}
                    _ => continue,
                }
            }
            let identity = Arc::as_ptr(&index) as usize;
            if written.contains(&identity) {
                synced.push(key);
                continue;
            }
            let guard = index.read();
            let root_key = normalize_key(guard.root());
            let Some(serial) = self.inner.resolver.path_to_serial_uri(&root_key) else {
                warn!(root = %root_key, "No serial for index root, not syncing");
                continue;
            };
            let file = self.inner.cache_dir.join(persistence::lft_file_name(&serial));
            match guard.save(&file) {
                Ok(()) => {
                    written.push(identity);
                    synced.push(key);
                }
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Failed to write index file");
                }
            }
        }
        synced
    }

    /// Search the subtree at `path` for basenames matching `keyword`.
    ///
    /// Unknown paths, in-flight builds, and invalid patterns all yield an
    /// empty result.
    pub fn search(&self, path: &str, keyword: &str, use_regex: bool) -> Vec<String> {
        let query = normalize_key(path);
        let Located::Ready { index, local, .. } = self.locate(&query) else {
            return Vec::new();
        };
        let matcher = if use_regex {
            match NameMatcher::regex(keyword) {
                Ok(matcher) => matcher,
                Err(e) => {
                    debug!(pattern = keyword, error = %e, "Invalid search pattern");
                    return Vec::new();
                }
            }
        } else {
            NameMatcher::substring(keyword)
        };

        let guard = index.read();
        let mut results = Vec::new();
        if let Some(mut scan) = guard.scan(&local) {
            let cap = self.inner.config.search_chunk_size.max(1);
            while !scan.next_chunk(&matcher, cap, &mut results) {}
        }
        drop(guard);

        if local != query {
            let strip = if local == "/" { 0 } else { local.len() };
            results = results
                .into_iter()
                .map(|result| rejoin(&query, &result[strip..]))
                .collect();
        }
        results
    }

    /// Record a newly created file or directory in its index. Silent
    /// no-op when the path is not covered.
    pub fn insert_file(&self, path: &str) {
        let caller = normalize_key(path);
        let Located::Ready { index, local, .. } = self.locate(&caller) else {
            return;
        };
        let is_dir = fs::metadata(&caller).map(|meta| meta.is_dir()).unwrap_or(false);
        let mut guard = index.write();
        if guard.insert(&local, is_dir) {
            self.mark_dirty(&guard);
        }
    }

    /// Drop a deleted entry (and its subtree) from its index. Silent
    /// no-op when the path is not covered.
    pub fn remove_file(&self, path: &str) {
        let caller = normalize_key(path);
        let Located::Ready { index, local, .. } = self.locate(&caller) else {
            return;
        };
        let mut guard = index.write();
        if guard.remove(&local) {
            self.mark_dirty(&guard);
        }
    }

    /// Apply a rename to the index covering `old`. The new path must lie
    /// under the same mount alias; silent no-op otherwise.
    pub fn rename_file(&self, old: &str, new: &str) {
        let old_caller = normalize_key(old);
        let new_caller = normalize_key(new);
        let Located::Ready { key, index, local } = self.locate(&old_caller) else {
            return;
        };
        if !path_has_prefix(&new_caller, &key) {
            warn!(old = %old_caller, new = %new_caller, "Rename target leaves the mount, ignoring");
            return;
        }
        let new_local = rewrite_local(&new_caller, &key, index.read().root());
        let mut guard = index.write();
        if guard.rename(&local, &new_local) {
            self.mark_dirty(&guard);
        }
    }

    fn locate(&self, path: &str) -> Located {
        let normalized = normalize_key(path);
        self.inner.registry.lock().locate(&normalized)
    }

    /// Mark the on-disk file for `index` dirty by deleting it; the next
    /// sync writes a fresh copy.
    fn mark_dirty(&self, index: &FsIndex) {
        let root_key = normalize_key(index.root());
        let Some(serial) = self.inner.resolver.path_to_serial_uri(&root_key) else {
            return;
        };
        let file = self.inner.cache_dir.join(persistence::lft_file_name(&serial));
        match fs::remove_file(&file) {
            Ok(()) => debug!(file = %file.display(), "Marked index dirty"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %file.display(), error = %e, "Failed to mark index dirty"),
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        let synced = self.sync(None);
        debug!(synced = synced.len(), "Manager teardown");
        self.inner.registry.lock().clear();
    }
}

fn run_build(inner: Arc<ManagerInner>, ticket: Arc<BuildTicket>, root: String, keys: Vec<String>) {
    let outcome = match IndexBuilder::new(root.as_str()).build() {
        Ok(index) => Some(Arc::new(RwLock::new(index))),
        Err(e) => {
            warn!(root = %root, error = %e, "Index build failed");
            None
        }
    };

    let mut resolved: Vec<(String, Option<SharedIndex>)> = Vec::new();
    {
        let mut registry = inner.registry.lock();
        for key in &keys {
            // A key dropped or replaced while building no longer belongs
            // to this ticket; its result is discarded.
            let ours = matches!(
                registry.get(key),
                Some(IndexState::Building(current)) if Arc::ptr_eq(current, &ticket)
            );
            if !ours {
                debug!(key = %key, "Build result discarded");
                continue;
            }
            match &outcome {
                Some(index) => registry.insert(key.clone(), IndexState::Ready(index.clone())),
                None => {
                    registry.remove(key);
                }
            }
            resolved.push((key.clone(), outcome.clone()));
        }
    }
    ticket.complete(outcome);

    let listeners = inner.listeners.lock();
    for (key, index) in &resolved {
        for listener in listeners.iter() {
            listener(key, index.as_ref());
        }
    }
}

fn rejoin(query: &str, suffix: &str) -> String {
    if query == "/" {
        suffix.to_string()
    } else {
        format!("{query}{suffix}")
    }
}
