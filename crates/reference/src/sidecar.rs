use assetpack_protocol::SIDECAR_EXTENSION;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// True when `path` is itself a sidecar file.
pub fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == SIDECAR_EXTENSION)
}

/// Sidecar of `path`; a sidecar maps to itself.
pub fn sidecar_path(path: &Path) -> PathBuf {
    if is_sidecar(path) {
        return path.to_path_buf();
    }
    let mut raw = OsString::from(path.as_os_str());
    raw.push(".");
    raw.push(SIDECAR_EXTENSION);
    PathBuf::from(raw)
}

/// Asset described by `path`; a non-sidecar maps to itself.
pub fn asset_path(path: &Path) -> PathBuf {
    if is_sidecar(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}
