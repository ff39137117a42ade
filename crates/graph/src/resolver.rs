use crate::error::{ResolveError, Result};
use crate::oracle::{is_script, ScriptReferenceOracle};
use crate::types::Closure;
use assetpack_indexer::AssetIndex;
use assetpack_reference::{
    asset_path, has_reference_table, read_identity_file, read_references_file, Guid,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Dependency queries over a frozen [`AssetIndex`].
///
/// Every query parses documents on demand; nothing is cached between calls. Paths are expected
/// in the same form the index was built with (absolute paths in practice).
pub struct DependencyResolver<'a> {
    index: &'a AssetIndex,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(index: &'a AssetIndex) -> Self {
        Self { index }
    }

    /// Files directly referenced by `path`. GUIDs missing from the index are dropped with a warning.
    pub async fn file_dependencies(&self, path: &Path) -> Result<BTreeSet<PathBuf>> {
        let path = asset_path(path);
        ensure_exists(&path).await?;
        self.read_files(&path).await
    }

    /// GUIDs directly referenced by `path`, resolvable or not.
    pub async fn guid_dependencies(&self, path: &Path) -> Result<BTreeSet<Guid>> {
        let path = asset_path(path);
        ensure_exists(&path).await?;
        self.read_guids(&path).await
    }

    /// Seeds plus every file transitively referenced from them.
    pub async fn deep_file_dependencies(
        &self,
        seeds: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Closure<PathBuf>> {
        let seeds = prepare_seeds(seeds).await?;
        let mut closure = Closure::new();
        let mut queue = VecDeque::new();
        for seed in &seeds {
            if closure.items.insert(seed.clone()) {
                queue.push_back(seed.clone());
            }
        }

        while let Some(current) = queue.pop_front() {
            if cancel.is_cancelled() {
                log::warn!(
                    "Dependency search cancelled with {} files queued",
                    queue.len() + 1
                );
                closure.cancelled = true;
                break;
            }

            log::trace!("Searching {}", current.display());
            let dependencies = match self.read_files(&current).await {
                Ok(dependencies) => dependencies,
                Err(e) if seeds.contains(&current) => return Err(e),
                Err(e) => {
                    log::warn!("Skipping references of {}: {e}", current.display());
                    continue;
                }
            };
            closure.expanded += 1;

            for dependency in dependencies {
                if closure.items.insert(dependency.clone()) {
                    log::trace!(" - Found {}", dependency.display());
                    queue.push_back(dependency);
                }
            }
        }

        log::info!(
            "Resolved {} files from {} seeds ({} expanded)",
            closure.len(),
            seeds.len(),
            closure.expanded
        );
        Ok(closure)
    }

    /// Every GUID transitively referenced from the seeds. Unresolved GUIDs are kept but cannot
    /// be followed further.
    pub async fn deep_guid_dependencies(
        &self,
        seeds: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Closure<Guid>> {
        let seeds = prepare_seeds(seeds).await?;
        let mut closure = Closure::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        for seed in &seeds {
            if visited.insert(seed.clone()) {
                queue.push_back(seed.clone());
            }
        }

        while let Some(current) = queue.pop_front() {
            if cancel.is_cancelled() {
                closure.cancelled = true;
                break;
            }

            let guids = match self.read_guids(&current).await {
                Ok(guids) => guids,
                Err(e) if seeds.contains(&current) => return Err(e),
                Err(e) => {
                    log::warn!("Skipping references of {}: {e}", current.display());
                    continue;
                }
            };
            closure.expanded += 1;

            for guid in guids {
                if let Some(found) = self.index.find_path(&guid) {
                    if visited.insert(found.to_path_buf()) {
                        queue.push_back(found.to_path_buf());
                    }
                } else {
                    log::trace!("GUID {guid} from {} is not indexed", current.display());
                }
                closure.items.insert(guid);
            }
        }

        Ok(closure)
    }

    /// Indexed files that reference `target` directly. Scans the whole index.
    pub async fn dependents(&self, target: &Path) -> Result<BTreeSet<PathBuf>> {
        let target = asset_path(target);
        let guid = self.target_guid(&target).await?;

        let mut found = BTreeSet::new();
        for candidate in self.reference_candidates() {
            if candidate == target {
                continue;
            }
            match self.read_guids(&candidate).await {
                Ok(guids) if guids.contains(&guid) => {
                    found.insert(candidate);
                }
                Ok(_) => {}
                Err(e) => log::warn!("Skipping {}: {e}", candidate.display()),
            }
        }
        Ok(found)
    }

    /// Seeds plus every indexed file that transitively references one of them.
    ///
    /// Each candidate document is parsed once per call; the scan table is dropped afterwards.
    pub async fn deep_dependents(
        &self,
        seeds: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Closure<PathBuf>> {
        let mut guids: HashMap<PathBuf, Guid> = HashMap::new();
        let mut closure = Closure::new();
        let mut queue = VecDeque::new();
        for seed in seeds {
            let seed = asset_path(seed);
            let guid = self.target_guid(&seed).await?;
            guids.insert(seed.clone(), guid);
            if closure.items.insert(seed.clone()) {
                queue.push_back(seed);
            }
        }

        let mut table: Vec<(PathBuf, BTreeSet<Guid>)> = Vec::new();
        for candidate in self.reference_candidates() {
            if cancel.is_cancelled() {
                closure.cancelled = true;
                return Ok(closure);
            }
            match self.read_guids(&candidate).await {
                Ok(referenced) if !referenced.is_empty() => table.push((candidate, referenced)),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping {}: {e}", candidate.display()),
            }
        }

        while let Some(current) = queue.pop_front() {
            if cancel.is_cancelled() {
                closure.cancelled = true;
                break;
            }

            let guid = match guids.get(&current) {
                Some(guid) => guid.clone(),
                None => match self.index.guid_of(&current) {
                    Some(guid) => guid.clone(),
                    None => {
                        log::debug!("{} has no GUID; nothing can reference it", current.display());
                        continue;
                    }
                },
            };
            closure.expanded += 1;

            for (candidate, referenced) in &table {
                if candidate != &current
                    && referenced.contains(&guid)
                    && closure.items.insert(candidate.clone())
                {
                    queue.push_back(candidate.clone());
                }
            }
        }

        Ok(closure)
    }

    /// Deep file closure of the seeds, extended with whatever the script oracle reports for the
    /// source files inside it.
    pub async fn resolve(
        &self,
        seeds: &[PathBuf],
        oracle: &dyn ScriptReferenceOracle,
        cancel: &CancellationToken,
    ) -> Result<Closure<PathBuf>> {
        let mut closure = self.deep_file_dependencies(seeds, cancel).await?;
        if closure.cancelled {
            return Ok(closure);
        }

        let scripts: Vec<PathBuf> = closure
            .items
            .iter()
            .filter(|path| is_script(path))
            .cloned()
            .collect();
        if scripts.is_empty() {
            return Ok(closure);
        }

        let map = oracle.script_references(&scripts).await?;
        let before = closure.len();
        let mut visited: HashSet<PathBuf> = scripts.iter().cloned().collect();
        let mut queue: VecDeque<PathBuf> = scripts.into_iter().collect();

        while let Some(script) = queue.pop_front() {
            if cancel.is_cancelled() {
                closure.cancelled = true;
                break;
            }
            let Some(referenced) = map.get(&script) else {
                continue;
            };
            for other in referenced {
                if visited.insert(other.clone()) {
                    queue.push_back(other.clone());
                }
                closure.items.insert(other.clone());
            }
        }

        log::info!(
            "Script references added {} files",
            closure.len().saturating_sub(before)
        );
        Ok(closure)
    }

    async fn read_guids(&self, path: &Path) -> Result<BTreeSet<Guid>> {
        let references = read_references_file(path).await?;
        Ok(references.into_iter().filter_map(|id| id.guid).collect())
    }

    async fn read_files(&self, path: &Path) -> Result<BTreeSet<PathBuf>> {
        let guids = self.read_guids(path).await?;
        let mut files = BTreeSet::new();
        for guid in guids {
            match self.index.find_path(&guid) {
                Some(found) => {
                    files.insert(found.to_path_buf());
                }
                None if guid.is_null() => {}
                None => log::warn!("Unresolved reference {guid} in {}", path.display()),
            }
        }
        Ok(files)
    }

    async fn target_guid(&self, target: &Path) -> Result<Guid> {
        if let Some(guid) = self.index.guid_of(target) {
            return Ok(guid.clone());
        }

        match read_identity_file(target).await {
            Ok(identity) => identity
                .guid
                .ok_or_else(|| ResolveError::MissingSidecar(target.to_path_buf())),
            Err(e) if e.is_not_found() => {
                ensure_exists(target).await?;
                Err(ResolveError::MissingSidecar(target.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn reference_candidates(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = self
            .index
            .paths()
            .filter(|path| has_reference_table(path))
            .map(Path::to_path_buf)
            .collect();
        candidates.sort();
        candidates
    }
}

async fn ensure_exists(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ResolveError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn prepare_seeds(seeds: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut prepared = Vec::with_capacity(seeds.len());
    let mut seen = HashSet::new();
    for seed in seeds {
        let seed = asset_path(seed);
        ensure_exists(&seed).await?;
        if seen.insert(seed.clone()) {
            prepared.push(seed);
        }
    }
    Ok(prepared)
}
