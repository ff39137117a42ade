use crate::error::{IndexerError, Result};
use crate::limits::index_concurrency;
use crate::stats::IndexStats;
use assetpack_reference::{asset_path, read_identity_file, Guid, Identifier};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// GUID <-> path index of one project, built from sidecar files.
///
/// Build first (`add_file` / `add_files` take `&mut self`), then share `&AssetIndex` with the
/// resolver; the borrow rules keep the two phases apart.
#[derive(Debug, Default, Clone)]
pub struct AssetIndex {
    by_guid: HashMap<Guid, PathBuf>,
    by_path: HashMap<PathBuf, Identifier>,
}

impl AssetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every path in `paths`, skipping unreadable ones.
    pub async fn build<I, P>(paths: I) -> (Self, IndexStats)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut index = Self::new();
        let stats = index.add_files(paths).await;
        (index, stats)
    }

    /// Index one asset (or its sidecar). Failures are returned to the caller.
    pub async fn add_file(&mut self, path: &Path) -> Result<Identifier> {
        let asset = asset_path(path);
        let identity = read_identity_file(path).await.map_err(|err| {
            if err.is_not_found() {
                IndexerError::MissingSidecar(asset.clone())
            } else {
                err.into()
            }
        })?;
        self.insert(asset, identity.clone());
        Ok(identity)
    }

    /// Index many files. Sidecars are read concurrently and merged here one at a time; a file
    /// that cannot be read is logged, recorded in the stats and skipped.
    pub async fn add_files<I, P>(&mut self, paths: I) -> IndexStats
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let start = Instant::now();
        let mut stats = IndexStats::new();
        let files: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        let max_concurrent = index_concurrency();

        for batch in files.chunks(max_concurrent) {
            let mut tasks = Vec::with_capacity(batch.len());
            for path in batch {
                let path = path.clone();
                tasks.push(tokio::spawn(async move {
                    let identity = read_identity_file(&path).await;
                    (path, identity)
                }));
            }

            for task in tasks {
                match task.await {
                    Ok((path, Ok(identity))) => {
                        stats.add_file(identity.has_guid());
                        if self.insert(asset_path(&path), identity).is_some() {
                            stats.add_duplicate();
                        }
                    }
                    Ok((_, Err(e))) => {
                        log::warn!("Skipping unreadable sidecar: {e}");
                        stats.add_error(e.to_string());
                    }
                    Err(e) => stats.add_error(format!("Task panicked: {e}")),
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        {
            stats.time_ms = start.elapsed().as_millis() as u64;
        }
        log::info!(
            "Indexed {} sidecars ({} with GUID) in {}ms",
            stats.files,
            stats.guids,
            stats.time_ms
        );
        stats
    }

    /// Record `identity` for `asset`. Returns the path previously registered under the same
    /// GUID when that was a different file.
    ///
    /// Re-adding a path whose GUID changed releases the old GUID if it still points here.
    pub fn insert(&mut self, asset: PathBuf, identity: Identifier) -> Option<PathBuf> {
        if let Some(old) = self.by_path.get(&asset).and_then(|id| id.guid.as_ref()) {
            if identity.guid.as_ref() != Some(old)
                && self.by_guid.get(old).is_some_and(|owner| owner == &asset)
            {
                log::debug!("{} changed GUID; dropping {old}", asset.display());
                self.by_guid.remove(old);
            }
        }

        let mut displaced = None;
        if let Some(guid) = &identity.guid {
            if let Some(previous) = self.by_guid.insert(guid.clone(), asset.clone()) {
                if previous != asset {
                    log::warn!(
                        "Duplicate GUID {guid}: {} replaces {}",
                        asset.display(),
                        previous.display()
                    );
                    displaced = Some(previous);
                }
            }
        }
        self.by_path.insert(asset, identity);
        displaced
    }

    /// Path of the asset owning `guid`.
    pub fn find_path(&self, guid: &Guid) -> Option<&Path> {
        self.by_guid.get(guid).map(PathBuf::as_path)
    }

    /// Identity recorded for `path` (asset or sidecar path).
    pub fn identity_of(&self, path: &Path) -> Option<&Identifier> {
        self.by_path.get(&asset_path(path))
    }

    pub fn guid_of(&self, path: &Path) -> Option<&Guid> {
        self.identity_of(path).and_then(|id| id.guid.as_ref())
    }

    /// Every indexed asset path, GUID-addressable or not.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.by_path.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn guid_count(&self) -> usize {
        self.by_guid.len()
    }
}
