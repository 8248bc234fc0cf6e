//! Shared fixtures for the integration suites.

use lft::config::ManagerConfig;
use lft::manager::Manager;
use lft::mount::{MountTable, SerialUri};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Create the reference tree from the search scenarios:
/// `<root>/a`, `<root>/b/c`, `<root>/b/d`.
pub fn sample_tree() -> (TempDir, String) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir(root.join("b")).unwrap();
    fs::write(root.join("a"), "").unwrap();
    fs::write(root.join("b/c"), "").unwrap();
    fs::write(root.join("b/d"), "").unwrap();
    let root = root.to_str().unwrap().to_string();
    (temp, root)
}

/// Everything a manager test needs: the indexed tree, a private cache
/// directory, the mount table, and the manager itself.
pub struct ManagerFixture {
    pub tree: TempDir,
    pub cache: TempDir,
    pub mounts: Arc<MountTable>,
    pub manager: Manager,
    pub root: String,
    pub serial: SerialUri,
}

pub fn manager_fixture() -> ManagerFixture {
    let (tree, root) = sample_tree();
    let cache = TempDir::new().unwrap();
    let mounts = Arc::new(MountTable::new());
    let serial = SerialUri::new(b"serial:fixture".to_vec());
    mounts.add(root.clone(), serial.clone());
    let config = ManagerConfig {
        cache_dir: Some(cache.path().to_path_buf()),
        ..ManagerConfig::default()
    };
    let manager = Manager::new(config, mounts.clone()).unwrap();
    ManagerFixture {
        tree,
        cache,
        mounts,
        manager,
        root,
        serial,
    }
}

impl ManagerFixture {
    /// Build the fixture tree's index and wait for it to install.
    pub fn index(&self) {
        let ticket = self.manager.add_path(&self.root).unwrap();
        assert!(ticket.wait().is_some(), "fixture build failed");
    }

    pub fn lft_file(&self) -> std::path::PathBuf {
        self.manager
            .cache_dir()
            .join(lft::manager::persistence::lft_file_name(&self.serial))
    }
}

/// Recursively list every path under `root` (excluding `root` itself),
/// in no particular order.
pub fn walk_all(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            out.push(entry.path().to_str().unwrap().to_string());
            if entry.file_type().unwrap().is_dir() {
                stack.push(entry.path());
            }
        }
    }
    out
}
