//! Registry lifecycle: builds, aliasing, prefix resolution, teardown.

use super::test_utils::{manager_fixture, sample_tree};
use lft::config::ManagerConfig;
use lft::manager::Manager;
use lft::mount::{MountTable, SerialUri};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_building_state_resolves_to_ready() {
    let f = manager_fixture();
    let ticket = f.manager.add_path(&f.root).unwrap();
    // Between scheduling and completion the key answers as building or,
    // if the worker already finished, as ready; never as absent.
    assert!(f.manager.lft_building(&f.root) || f.manager.has_lft(&f.root));
    assert!(ticket.wait().is_some());
    assert!(f.manager.has_lft(&f.root));
    assert!(!f.manager.lft_building(&f.root));
}

#[test]
fn test_concurrent_waiters_see_one_resolution() {
    let f = manager_fixture();
    let ticket = f.manager.add_path(&f.root).unwrap();
    let mut waiters = Vec::new();
    for _ in 0..4 {
        let ticket = ticket.clone();
        waiters.push(std::thread::spawn(move || ticket.wait().is_some()));
    }
    let outcomes: Vec<bool> = waiters.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(outcomes, vec![true; 4]);
}

#[test]
fn test_mount_aliasing_shares_one_index() {
    let tree = TempDir::new().unwrap();
    std::fs::write(tree.path().join("shared"), "").unwrap();
    let root = tree.path().to_str().unwrap().to_string();
    // Sorts after the real root so the build walks an existing path.
    let alias = "/zz-alias";

    let cache = TempDir::new().unwrap();
    let mounts = Arc::new(MountTable::new());
    let serial = SerialUri::new(b"serial:aliased".to_vec());
    mounts.add(root.clone(), serial.clone());
    mounts.add(alias, serial);

    let config = ManagerConfig {
        cache_dir: Some(cache.path().to_path_buf()),
        ..ManagerConfig::default()
    };
    let manager = Manager::new(config, mounts).unwrap();
    manager.add_path(&root).unwrap().wait();

    // Both mount points answer, through one shared index.
    assert!(manager.has_lft(&root));
    assert!(manager.has_lft(alias));
    assert_eq!(manager.all_paths(), vec![root.clone(), alias.to_string()]);
    assert_eq!(
        manager.search(alias, "shared", false),
        vec![format!("{alias}/shared")]
    );

    // One device: sync reports both keys but writes exactly one file.
    let synced = manager.sync(None);
    assert_eq!(synced.len(), 2);
    let lft_files = std::fs::read_dir(manager.cache_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".lft"))
        .count();
    assert_eq!(lft_files, 1);
}

#[test]
fn test_longest_prefix_resolution() {
    let f = manager_fixture();
    f.index();
    // Deep paths resolve through the mount-point key.
    assert!(f.manager.has_lft(&format!("{}/b/c", f.root)));
    assert!(f.manager.has_lft(&format!("{}/b", f.root)));
    // Sibling names that merely share a string prefix do not.
    assert!(!f.manager.has_lft(&format!("{}sibling", f.root)));
}

#[test]
fn test_has_lft_subdirectories() {
    let f = manager_fixture();
    f.index();
    let parent = std::path::Path::new(&f.root)
        .parent()
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(f.manager.has_lft_subdirectories(&parent), vec![f.root.clone()]);
    assert_eq!(f.manager.has_lft_subdirectories(&f.root), vec![f.root.clone()]);
    assert!(f.manager.has_lft_subdirectories("/elsewhere").is_empty());
}

#[test]
fn test_build_finished_notification() {
    let f = manager_fixture();
    let seen: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    f.manager.on_build_finished(move |path, index| {
        sink.lock().push((path.to_string(), index.is_some()));
    });

    f.manager.add_path(&f.root).unwrap().wait();
    for _ in 0..200 {
        if !seen.lock().is_empty() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(seen.lock().as_slice(), &[(f.root.clone(), true)]);
}

#[test]
fn test_failed_build_notifies_with_none() {
    let tree = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let ghost = format!("{}/missing", tree.path().to_str().unwrap());
    let mounts = Arc::new(MountTable::new());
    mounts.add(ghost.clone(), SerialUri::new(b"serial:none".to_vec()));
    let config = ManagerConfig {
        cache_dir: Some(cache.path().to_path_buf()),
        ..ManagerConfig::default()
    };
    let manager = Manager::new(config, mounts).unwrap();

    let seen: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    manager.on_build_finished(move |path, index| {
        sink.lock().push((path.to_string(), index.is_some()));
    });

    let ticket = manager.add_path(&ghost).unwrap();
    assert!(ticket.wait().is_none());
    for _ in 0..200 {
        if !seen.lock().is_empty() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(seen.lock().as_slice(), &[(ghost.clone(), false)]);
    assert!(!manager.has_lft(&ghost));
}

#[test]
fn test_drop_flushes_to_disk() {
    let (tree, root) = sample_tree();
    let cache = TempDir::new().unwrap();
    let mounts = Arc::new(MountTable::new());
    let serial = SerialUri::new(b"serial:teardown".to_vec());
    mounts.add(root.clone(), serial.clone());
    let config = ManagerConfig {
        cache_dir: Some(cache.path().to_path_buf()),
        ..ManagerConfig::default()
    };

    {
        let manager = Manager::new(config.clone(), mounts.clone()).unwrap();
        manager.add_path(&root).unwrap().wait();
        // Not synced yet; teardown must write it.
    }

    let file = cache
        .path()
        .join(lft::manager::persistence::lft_file_name(&serial));
    assert!(file.exists());

    // A fresh manager restores the index from the flushed file.
    let manager = Manager::new(config, mounts).unwrap();
    assert!(manager.has_lft(&root));
    drop(tree);
}
