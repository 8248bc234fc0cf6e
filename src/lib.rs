//! lft: fast filename search over mounted filesystems.
//!
//! Each mount gets a filesystem name index: a serializable pre-order tree
//! of every path under the mount root, searchable by substring or regex
//! over basenames and editable as files appear, vanish, or get renamed.
//! A manager keys the indexes by mount point, persists them as `.lft`
//! cache files, rebuilds them on startup, and reacts to mount events.

pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod manager;
pub mod mount;
