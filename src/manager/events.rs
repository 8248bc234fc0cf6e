//! Mount add/remove intake and the auto-index policy.

use super::registry::normalize_key;
use super::Manager;
use tracing::{debug, info};

impl Manager {
    /// Handle a mount-added event from the block service.
    ///
    /// Reloads cached indexes for the device; when the mount point is
    /// still unindexed afterwards and matches a configured auto-index
    /// root, a fresh build is scheduled.
    pub fn mount_added(&self, _device: &str, mount_point: &str) {
        let key = normalize_key(mount_point);
        let serial = self.inner.resolver.path_to_serial_uri(&key);
        let loaded = self.refresh(serial.as_ref());
        if loaded.iter().any(|path| path == &key) {
            debug!(mount_point = %key, "Mount restored from cache");
            return;
        }
        if !self.inner.config.auto_index_allows(&key) {
            debug!(mount_point = %key, "Mount outside auto-index roots, ignoring");
            return;
        }
        info!(mount_point = %key, "Auto-indexing new mount");
        if let Err(e) = self.add_path(&key) {
            debug!(mount_point = %key, error = %e, "Auto-index rejected");
        }
    }

    /// Handle a mount-removed event: flush the mount's indexes. They stay
    /// resident so cached content remains searchable after unmount.
    pub fn mount_removed(&self, _device: &str, mount_point: &str) {
        let synced = self.sync(Some(mount_point));
        debug!(mount_point, synced = synced.len(), "Flushed indexes for removed mount");
    }
}
