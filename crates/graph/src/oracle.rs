use crate::error::{ResolveError, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Extension of source files handed to the oracle.
pub const SCRIPT_EXTENSION: &str = "cs";

/// Script file -> script files it needs because they declare a type or enum it uses.
pub type ScriptReferenceMap = HashMap<PathBuf, BTreeSet<PathBuf>>;

pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == SCRIPT_EXTENSION)
}

/// Source-level reference analysis the resolver cannot do itself.
///
/// The returned map must cover the given scripts and every script reachable from them; the
/// resolver walks it transitively.
#[async_trait]
pub trait ScriptReferenceOracle: Send + Sync {
    async fn script_references(&self, scripts: &[PathBuf]) -> Result<ScriptReferenceMap>;
}

/// Oracle for runs without source analysis: nothing references anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScriptOracle;

#[async_trait]
impl ScriptReferenceOracle for NoScriptOracle {
    async fn script_references(&self, scripts: &[PathBuf]) -> Result<ScriptReferenceMap> {
        log::debug!(
            "No script oracle configured; {} scripts keep their own files only",
            scripts.len()
        );
        Ok(ScriptReferenceMap::new())
    }
}

/// Oracle answering from a precomputed map, e.g. one exported by an external analyser.
#[derive(Debug, Default, Clone)]
pub struct StaticScriptOracle {
    map: ScriptReferenceMap,
}

impl StaticScriptOracle {
    pub fn new(map: ScriptReferenceMap) -> Self {
        Self { map }
    }

    /// Parse `{"<script>": ["<script>", ...]}`; relative paths are joined onto `base`.
    pub fn from_json(json: &str, base: &Path) -> Result<Self> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| ResolveError::Oracle(format!("invalid script reference map: {e}")))?;

        let map = raw
            .into_iter()
            .map(|(script, refs)| {
                let refs = refs.iter().map(|r| join_relative(base, r)).collect();
                (join_relative(base, &script), refs)
            })
            .collect();
        Ok(Self { map })
    }

    pub async fn load(path: &Path, base: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let oracle = Self::from_json(&json, base)?;
        log::info!(
            "Loaded script references for {} scripts from {}",
            oracle.map.len(),
            path.display()
        );
        Ok(oracle)
    }
}

fn join_relative(base: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[async_trait]
impl ScriptReferenceOracle for StaticScriptOracle {
    async fn script_references(&self, _scripts: &[PathBuf]) -> Result<ScriptReferenceMap> {
        Ok(self.map.clone())
    }
}
