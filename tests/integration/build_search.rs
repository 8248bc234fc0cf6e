//! Build + search behavior over real directory trees.

use super::test_utils::{manager_fixture, sample_tree, walk_all};
use lft::index::{IndexBuilder, NameMatcher};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_substring_search_scenarios() {
    let f = manager_fixture();
    f.index();

    assert_eq!(f.manager.search(&f.root, "c", false), vec![format!("{}/b/c", f.root)]);
    assert_eq!(
        f.manager.search(&format!("{}/b", f.root), "c", false),
        vec![format!("{}/b/c", f.root)]
    );
    assert!(f.manager.search(&f.root, "X", false).is_empty());
}

#[test]
fn test_search_is_deterministic() {
    let f = manager_fixture();
    f.index();
    let first = f.manager.search(&f.root, "", false);
    let second = f.manager.search(&f.root, "", false);
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_search_agrees_with_filesystem_walk() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src/nested")).unwrap();
    fs::write(root.join("src/main.rs"), "").unwrap();
    fs::write(root.join("src/nested/util.rs"), "").unwrap();
    fs::write(root.join("readme.md"), "").unwrap();
    let root_str = root.to_str().unwrap().to_string();

    let index = IndexBuilder::new(root_str.as_str()).build().unwrap();
    let matcher = NameMatcher::substring("rs");
    let mut results = index.search_all(&root_str, &matcher);

    let mut expected: Vec<String> = walk_all(root)
        .into_iter()
        .filter(|path| {
            let name = path.rsplit('/').next().unwrap();
            name.to_ascii_lowercase().contains("rs")
        })
        .collect();
    results.sort();
    expected.sort();
    assert_eq!(results, expected);
}

#[test]
fn test_subtree_search_is_a_subset_of_root_search() {
    let f = manager_fixture();
    f.index();

    let from_root = f.manager.search(&f.root, "", false);
    let from_child = f.manager.search(&format!("{}/b", f.root), "", false);
    assert!(from_child.iter().all(|path| from_root.contains(path)));
    let child_prefix = format!("{}/b/", f.root);
    assert!(from_child.iter().all(|path| path.starts_with(&child_prefix)));
}

#[test]
fn test_regex_search() {
    let f = manager_fixture();
    f.index();

    // Case-insensitive by contract.
    assert_eq!(f.manager.search(&f.root, "^C$", true), vec![format!("{}/b/c", f.root)]);
    assert_eq!(
        f.manager.search(&f.root, "^[cd]$", true),
        vec![format!("{}/b/c", f.root), format!("{}/b/d", f.root)]
    );
}

#[test]
fn test_invalid_regex_returns_empty() {
    let f = manager_fixture();
    f.index();
    assert!(f.manager.search(&f.root, "[", true).is_empty());
    assert!(f.manager.search(&f.root, "(unclosed", true).is_empty());
}

#[test]
fn test_empty_keyword_matches_everything() {
    let f = manager_fixture();
    f.index();
    let all = f.manager.search(&f.root, "", false);
    assert_eq!(all.len(), 4);
}

#[test]
fn test_unindexed_path_yields_empty() {
    let f = manager_fixture();
    f.index();
    assert!(f.manager.search("/somewhere/else", "c", false).is_empty());
    assert!(!f.manager.has_lft("/somewhere/else"));
}

#[test]
fn test_build_skips_symlinked_directories() {
    let (temp, root) = sample_tree();
    std::os::unix::fs::symlink(temp.path().join("b"), temp.path().join("loop")).unwrap();

    let index = IndexBuilder::new(root.as_str()).build().unwrap();
    let all = index.search_all(&root, &NameMatcher::All);
    // The link shows up as a leaf; nothing under it is enumerated.
    assert!(all.contains(&format!("{root}/loop")));
    assert!(!all.contains(&format!("{root}/loop/c")));
}
