use crate::entry::{split_member_name, EntryKind, PackageEntry};
use crate::error::Result;
use crate::normalize::copy_normalized;
use crate::stats::UnpackStats;
use assetpack_protocol::paths::{is_safe_relative_path, to_forward_slashes};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Streams a package and reassembles its per-GUID entries.
///
/// Members may appear in any order. An entry is handed out as soon as its three parts have
/// been seen and is then dropped, so only incomplete entries are held in memory.
pub struct Unpacker<R: Read> {
    archive: tar::Archive<GzDecoder<R>>,
}

impl Unpacker<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        log::debug!("Reading package {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> Unpacker<R> {
    pub fn new(reader: R) -> Self {
        Self {
            archive: tar::Archive::new(GzDecoder::new(reader)),
        }
    }

    /// Call `on_entry` with `(guid, entry)` for every complete entry, in completion order.
    ///
    /// Asset and sidecar bodies are line-ending normalized. Malformed member names, unknown
    /// kinds and unsafe pathnames are logged and skipped; errors returned by `on_entry` abort
    /// the walk.
    pub fn for_each_entry<F>(mut self, mut on_entry: F) -> Result<UnpackStats>
    where
        F: FnMut(&str, PackageEntry) -> Result<()>,
    {
        let mut stats = UnpackStats::default();
        let mut pending: HashMap<String, PackageEntry> = HashMap::new();

        for member in self.archive.entries()? {
            let mut member = member?;
            if !member.header().entry_type().is_file() {
                continue;
            }
            let name = to_forward_slashes(&member.path()?.to_string_lossy());
            let Some((guid, kind)) = split_member_name(&name) else {
                log::warn!("Skipping unexpected package member {name}");
                stats.skipped += 1;
                continue;
            };
            let guid = guid.to_string();

            match kind {
                EntryKind::Asset | EntryKind::Sidecar => {
                    let mut body = Vec::new();
                    copy_normalized(&mut member, &mut body)?;
                    let entry = pending.entry(guid.clone()).or_default();
                    if kind == EntryKind::Asset {
                        entry.content = Some(body);
                    } else {
                        entry.sidecar = Some(body);
                    }
                }
                EntryKind::Pathname => {
                    let mut raw = Vec::new();
                    member.read_to_end(&mut raw)?;
                    let pathname = first_line(&raw);
                    if !is_safe_relative_path(&pathname) {
                        log::warn!("Skipping {guid}: unsafe pathname {pathname:?}");
                        stats.skipped += 1;
                        continue;
                    }
                    pending.entry(guid.clone()).or_default().pathname = Some(pathname);
                }
            }

            if pending.get(&guid).is_some_and(PackageEntry::is_complete) {
                if let Some(entry) = pending.remove(&guid) {
                    on_entry(&guid, entry)?;
                    stats.entries += 1;
                }
            }
        }

        stats.incomplete = pending.len();
        for (guid, entry) in &pending {
            log::warn!(
                "Entry {guid} is incomplete (asset: {}, sidecar: {}, pathname: {})",
                entry.content.is_some(),
                entry.sidecar.is_some(),
                entry.pathname.is_some()
            );
        }
        Ok(stats)
    }

    /// Extract every complete entry below `dest`.
    pub fn extract_to(self, dest: &Path) -> Result<UnpackStats> {
        let stats = self.for_each_entry(|guid, entry| {
            if let Some(path) = entry.write_to(dest)? {
                log::info!("Unpacked {guid} -> {}", path.display());
            }
            Ok(())
        })?;
        log::info!(
            "Extracted {} assets into {} ({} skipped, {} incomplete)",
            stats.entries,
            dest.display(),
            stats.skipped,
            stats.incomplete
        );
        Ok(stats)
    }

    /// Collect every complete entry in memory.
    pub fn read_entries(self) -> Result<(Vec<(String, PackageEntry)>, UnpackStats)> {
        let mut entries = Vec::new();
        let stats = self.for_each_entry(|guid, entry| {
            entries.push((guid.to_string(), entry));
            Ok(())
        })?;
        Ok((entries, stats))
    }
}

/// Pathname text up to the first line break, with a leading `./` removed.
fn first_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let line = text.lines().next().unwrap_or("").trim_end_matches('\r');
    let line = to_forward_slashes(line);
    line.strip_prefix("./").map(str::to_string).unwrap_or(line)
}
