//! Mount resolution: stable device identifiers and their mount points.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;

/// Stable device+subpath identifier, independent of where the device is
/// currently mounted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerialUri(Vec<u8>);

impl SerialUri {
    pub fn new(bytes: impl Into<Vec<u8>>) -> SerialUri {
        SerialUri(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for SerialUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Resolves paths to device identity and back.
///
/// Implementations are host-specific; the rest of the system only needs
/// these two pure mappings.
pub trait MountResolver: Send + Sync {
    /// Stable identifier for the device exposing `path`, or `None` when
    /// `path` is not on a known mount.
    fn path_to_serial_uri(&self, path: &str) -> Option<SerialUri>;

    /// Every mount point currently exposing the device behind `uri`.
    fn from_serial_uri(&self, uri: &SerialUri) -> Vec<String>;

    /// The mount point containing `path`: the longest mount point of the
    /// path's device that is a prefix of `path`.
    fn storage_root(&self, path: &str) -> Option<String> {
        let uri = self.path_to_serial_uri(path)?;
        let mut best: Option<String> = None;
        for mount in self.from_serial_uri(&uri) {
            if !path_has_prefix(path, &mount) {
                continue;
            }
            match &best {
                Some(current) if current.len() >= mount.len() => {}
                _ => best = Some(mount),
            }
        }
        best
    }
}

/// True when `prefix` is `path` itself or one of its ancestor directories.
pub(crate) fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// In-memory mount table.
///
/// Daemon wiring feeds this from the platform's block-device service, the
/// CLI seeds it from device metadata, and tests populate it directly.
#[derive(Default)]
pub struct MountTable {
    entries: RwLock<BTreeMap<String, SerialUri>>,
}

impl MountTable {
    pub fn new() -> MountTable {
        MountTable::default()
    }

    /// Register a mount point for a device.
    pub fn add(&self, mount_point: impl Into<String>, uri: SerialUri) {
        let key = normalize_mount(mount_point.into());
        self.entries.write().insert(key, uri);
    }

    /// Drop a mount point.
    pub fn remove(&self, mount_point: &str) {
        let key = normalize_mount(mount_point.to_string());
        self.entries.write().remove(&key);
    }
}

fn normalize_mount(mut mount_point: String) -> String {
    while mount_point.len() > 1 && mount_point.ends_with('/') {
        mount_point.pop();
    }
    mount_point
}

impl MountResolver for MountTable {
    fn path_to_serial_uri(&self, path: &str) -> Option<SerialUri> {
        let entries = self.entries.read();
        entries
            .iter()
            .filter(|(mount, _)| path_has_prefix(path, mount))
            .max_by_key(|(mount, _)| mount.len())
            .map(|(_, uri)| uri.clone())
    }

    fn from_serial_uri(&self, uri: &SerialUri) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .filter(|(_, candidate)| *candidate == uri)
            .map(|(mount, _)| mount.clone())
            .collect()
    }
}
