//! On-disk `.lft` cache: directory resolution, file naming, dirty marking.
//!
//! A `.lft` file is the exact byte image of an index. Mutations mark the
//! file dirty by deleting it; the next sync writes a fresh copy. A crash
//! during the dirty window therefore surfaces as a missing file, which
//! behaves exactly like a never-indexed mount on the next refresh.

use crate::config::ManagerConfig;
use crate::mount::SerialUri;
use percent_encoding::{percent_decode, percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Bytes escaped in `.lft` filenames: everything outside
/// `[A-Za-z0-9-._~/]`. `:` is always escaped and `/` always preserved.
const LFT_NAME_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

pub(crate) const LFT_SUFFIX: &str = ".lft";

/// Resolve the directory holding `.lft` files.
///
/// Prefers the system-wide `/var/cache/<org>/<app>` when the process can
/// write there; otherwise falls back to the per-user cache location from
/// the environment. An explicit configuration override wins outright.
pub fn cache_dir(config: &ManagerConfig) -> io::Result<PathBuf> {
    if let Some(dir) = &config.cache_dir {
        fs::create_dir_all(dir)?;
        return Ok(dir.clone());
    }

    let system = PathBuf::from("/var/cache")
        .join(&config.organization)
        .join(&config.application);
    if dir_is_writable(&system) {
        return Ok(system);
    }

    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no usable cache directory"))?;
    let dir = base.join(&config.organization).join(&config.application);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn dir_is_writable(dir: &Path) -> bool {
    if fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".write-probe");
    match fs::OpenOptions::new().write(true).create(true).open(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

/// Percent-encoded filename stem for a serial URI.
pub fn encode_serial(uri: &SerialUri) -> String {
    percent_encode(uri.as_bytes(), LFT_NAME_SET).to_string()
}

/// `.lft` filename for an index whose root resolves to `uri`.
pub fn lft_file_name(uri: &SerialUri) -> String {
    format!("{}{}", encode_serial(uri), LFT_SUFFIX)
}

/// Decode a cache filename stem (the name without `.lft`) back into the
/// serial URI it was derived from.
pub fn serial_from_file_stem(stem: &str) -> SerialUri {
    SerialUri::new(percent_decode(stem.as_bytes()).collect::<Vec<u8>>())
}
