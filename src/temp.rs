//! Absolute temp locations for staging downloads and extracted artifacts.

use std::env;
use std::path::PathBuf;

/// Returns a directory path suitable for staging and temporary directories.
/// Never returns a relative path: under `sudo` a relative TMPDIR would put
/// multi-gigabyte staging trees into whatever directory pixgpu was started from.
pub fn temp_dir_base() -> PathBuf {
    let t = env::temp_dir();
    if t.is_absolute() {
        t
    } else {
        PathBuf::from("/tmp")
    }
}

/// Default parent of the per-component staging directories
pub fn default_staging_root() -> PathBuf {
    temp_dir_base().join("pixgpu")
}
