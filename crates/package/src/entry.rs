use crate::error::Result;
use assetpack_protocol::SIDECAR_EXTENSION;
use std::path::{Path, PathBuf};

/// Member kinds stored under each GUID directory of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Asset,
    Sidecar,
    Pathname,
}

impl EntryKind {
    pub fn file_name(self) -> &'static str {
        match self {
            EntryKind::Asset => "asset",
            EntryKind::Sidecar => "asset.meta",
            EntryKind::Pathname => "pathname",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "asset" => Some(EntryKind::Asset),
            "asset.meta" => Some(EntryKind::Sidecar),
            "pathname" => Some(EntryKind::Pathname),
            _ => None,
        }
    }

    /// Archive member name for `guid`.
    pub fn member_name(self, guid: &str) -> String {
        format!("{guid}/{}", self.file_name())
    }
}

/// Split an archive member name into `(guid, kind)`.
///
/// A leading `./` is ignored. Returns `None` for anything not shaped `<guid>/<kind>`.
pub fn split_member_name(name: &str) -> Option<(&str, EntryKind)> {
    let name = name.strip_prefix("./").unwrap_or(name);
    let (guid, kind) = name.split_once('/')?;
    if guid.is_empty() || kind.contains('/') {
        return None;
    }
    Some((guid, EntryKind::from_file_name(kind)?))
}

/// One asset being reassembled from a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageEntry {
    pub content: Option<Vec<u8>>,
    pub sidecar: Option<Vec<u8>>,
    /// Project-relative path with `/` separators.
    pub pathname: Option<String>,
}

impl PackageEntry {
    /// All three parts have been seen. Empty bodies count.
    pub fn is_complete(&self) -> bool {
        self.content.is_some() && self.sidecar.is_some() && self.pathname.is_some()
    }

    /// Write the asset and its sidecar under `dest`, creating directories as needed.
    ///
    /// Returns the asset path, or `None` if the entry is not complete yet.
    pub fn write_to(&self, dest: &Path) -> Result<Option<PathBuf>> {
        let (Some(content), Some(sidecar), Some(pathname)) =
            (&self.content, &self.sidecar, &self.pathname)
        else {
            return Ok(None);
        };

        let target = dest.join(pathname);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
        std::fs::write(sidecar_target(&target), sidecar)?;
        Ok(Some(target))
    }
}

/// `<target>.meta`, even when `target` itself already ends in `.meta`.
fn sidecar_target(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}
