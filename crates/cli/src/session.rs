use anyhow::{anyhow, Context, Result};
use assetpack_graph::{
    CancellationToken, DependencyResolver, NoScriptOracle, ScriptReferenceOracle,
    StaticScriptOracle,
};
use assetpack_indexer::{AssetIndex, FileScanner, IndexStats};
use assetpack_package::{PackStats, PackageError, Packer, UnpackStats, Unpacker};
use assetpack_protocol::PackConfig;
use assetpack_reference::asset_path;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

type FilePacker = Packer<BufWriter<File>>;

/// Outcome of one packing run.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub output: PathBuf,
    /// Files matched by the include/exclude globs.
    pub explicit: usize,
    /// Files added only because something referenced them.
    pub resolved: usize,
    pub pack: PackStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexStats>,
    pub unpacked: Vec<UnpackStats>,
    pub cancelled: bool,
    pub time_ms: u64,
}

/// How failures on individual files are treated while packing a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePolicy {
    /// The caller named these files; any failure ends the run.
    Abort,
    /// Found through references; missing or foreign files are skipped.
    Skip,
}

/// One packing run over a project: unpack, enumerate, resolve, pack.
pub struct Session {
    config: PackConfig,
    cancel: CancellationToken,
}

impl Session {
    /// `config` must carry absolute paths (see [`crate::config::load`]).
    pub fn new(config: PackConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self) -> Result<SessionReport> {
        let start = Instant::now();
        let root = self.config.source_root.clone();

        let unpacked = self.unpack_archives().await?;

        if let Some(parent) = self.config.output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let packer = FilePacker::create(&root, &self.config.output)
            .with_context(|| format!("Failed to create {}", self.config.output.display()))?;
        let packer = Arc::new(packer);
        let output = self
            .config
            .output
            .canonicalize()
            .unwrap_or_else(|_| self.config.output.clone());

        let explicit = self.explicit_assets(&output)?;
        log::info!("{} files matched in {}", explicit.len(), root.display());

        let explicit_task = {
            let packer = Arc::clone(&packer);
            let files = explicit.clone();
            let cancel = self.cancel.clone();
            tokio::task::spawn_blocking(move || {
                pack_list(&packer, &files, &cancel, FailurePolicy::Abort)
            })
        };

        let mut index_stats = None;
        let mut resolved = Vec::new();
        let mut cancelled = false;
        if self.config.skip_dependency_analysis {
            log::info!("Dependency analysis skipped");
        } else {
            let (index, stats) = self.build_index().await?;
            index_stats = Some(stats);

            let oracle = self.oracle().await?;
            let resolver = DependencyResolver::new(&index);
            let closure = resolver
                .resolve(&explicit, oracle.as_ref(), &self.cancel)
                .await
                .context("Dependency analysis failed")?;
            cancelled = closure.cancelled;

            let seeds: BTreeSet<&PathBuf> = explicit.iter().collect();
            resolved = closure
                .items
                .into_iter()
                .filter(|path| !seeds.contains(path))
                .collect();
            log::info!("{} additional files referenced", resolved.len());
        }

        explicit_task
            .await
            .map_err(|e| anyhow!("Packing task failed: {e}"))??;

        let resolved_count = resolved.len();
        let resolved_task = {
            let packer = Arc::clone(&packer);
            let cancel = self.cancel.clone();
            tokio::task::spawn_blocking(move || {
                pack_list(&packer, &resolved, &cancel, FailurePolicy::Skip)
            })
        };
        resolved_task
            .await
            .map_err(|e| anyhow!("Packing task failed: {e}"))??;

        let packer = Arc::try_unwrap(packer)
            .map_err(|_| anyhow!("Package writer is still shared after packing"))?;
        let (_, pack) = packer.finish()?;
        cancelled |= self.cancel.is_cancelled();

        #[allow(clippy::cast_possible_truncation)]
        let time_ms = start.elapsed().as_millis() as u64;
        log::info!(
            "Wrote {} ({} assets) in {}ms",
            self.config.output.display(),
            pack.assets,
            time_ms
        );

        Ok(SessionReport {
            output: self.config.output.clone(),
            explicit: explicit.len(),
            resolved: resolved_count,
            pack,
            index: index_stats,
            unpacked,
            cancelled,
            time_ms,
        })
    }

    async fn unpack_archives(&self) -> Result<Vec<UnpackStats>> {
        let mut all = Vec::with_capacity(self.config.unpack.len());
        for archive in &self.config.unpack {
            log::info!("Unpacking {}", archive.display());
            let archive = archive.clone();
            let dest = self.config.source_root.clone();
            let stats = tokio::task::spawn_blocking(move || {
                Unpacker::open(&archive)?.extract_to(&dest)
            })
            .await
            .map_err(|e| anyhow!("Unpack task failed: {e}"))?
            .context("Failed to unpack archive")?;
            all.push(stats);
        }
        Ok(all)
    }

    /// Assets selected by the globs. Sidecars stand for their asset; sidecars of directories
    /// and orphaned sidecars are dropped.
    fn explicit_assets(&self, output: &Path) -> Result<Vec<PathBuf>> {
        let candidates = FileScanner::new(&self.config.source_root)
            .include(self.config.assets.iter().cloned())
            .exclude(self.config.exclude.iter().cloned())
            .exclude_path(output)
            .scan()?;

        let mut assets = BTreeSet::new();
        for candidate in candidates {
            let asset = asset_path(&candidate);
            if asset == output {
                continue;
            }
            if asset != candidate && !asset.is_file() {
                if asset.is_dir() {
                    log::trace!("Skipping directory sidecar {}", candidate.display());
                } else {
                    log::warn!("Sidecar without asset: {}", candidate.display());
                }
                continue;
            }
            assets.insert(asset);
        }
        Ok(assets.into_iter().collect())
    }

    async fn build_index(&self) -> Result<(AssetIndex, IndexStats)> {
        build_index(&self.config.asset_root_dir()).await
    }

    async fn oracle(&self) -> Result<Box<dyn ScriptReferenceOracle>> {
        load_oracle(
            self.config.script_references.as_deref(),
            &self.config.source_root,
        )
        .await
    }
}

/// Index every sidecar below `asset_root`. A missing asset root yields an empty index.
pub(crate) async fn build_index(asset_root: &Path) -> Result<(AssetIndex, IndexStats)> {
    if !asset_root.is_dir() {
        log::warn!(
            "Asset root {} does not exist; nothing can be resolved",
            asset_root.display()
        );
        return Ok((AssetIndex::new(), IndexStats::new()));
    }
    let sidecars = FileScanner::new(asset_root)
        .include(["**/*.meta"])
        .scan()?;
    Ok(AssetIndex::build(sidecars).await)
}

pub(crate) async fn load_oracle(
    map: Option<&Path>,
    project_root: &Path,
) -> Result<Box<dyn ScriptReferenceOracle>> {
    match map {
        Some(path) => {
            let oracle = StaticScriptOracle::load(path, project_root)
                .await
                .with_context(|| format!("Failed to load {}", path.display()))?;
            Ok(Box::new(oracle))
        }
        None => Ok(Box::new(NoScriptOracle)),
    }
}

fn pack_list(
    packer: &FilePacker,
    files: &[PathBuf],
    cancel: &CancellationToken,
    policy: FailurePolicy,
) -> Result<usize> {
    let mut added = 0;
    for (position, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            log::warn!("Packing cancelled; {} files left out", files.len() - position);
            break;
        }
        match packer.add_asset(file) {
            Ok(true) => added += 1,
            Ok(false) => {}
            Err(e @ (PackageError::NotFound(_) | PackageError::OutsideProject(_)))
                if policy == FailurePolicy::Skip =>
            {
                log::warn!("Skipping referenced file: {e}");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to pack {}", file.display()))
            }
        }
    }
    Ok(added)
}
