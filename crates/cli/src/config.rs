use anyhow::{Context, Result};
use assetpack_protocol::{PackConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Values given on the command line; `None` / empty means "not given".
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub source_root: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub assets: Vec<String>,
    pub exclude: Vec<String>,
    pub skip_dependency_analysis: bool,
    pub asset_root: Option<String>,
    pub unpack: Vec<PathBuf>,
    pub script_references: Option<PathBuf>,
}

/// Whether a configuration file was read, and from where.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PackConfig,
    pub file: Option<PathBuf>,
}

/// Build the configuration of one run: defaults, then the TOML file (`explicit`, or
/// `assetpack.toml` in the project root when present), then command-line overrides.
///
/// Relative paths from the file are taken from the file's directory, relative paths from the
/// command line from `cwd`. The source root is canonicalized.
pub fn load(explicit: Option<&Path>, overrides: ConfigOverrides, cwd: &Path) -> Result<LoadedConfig> {
    let project_hint = overrides
        .source_root
        .as_deref()
        .map(|root| absolutize(cwd, root))
        .unwrap_or_else(|| cwd.to_path_buf());

    let file = match explicit {
        Some(path) => Some(absolutize(cwd, path)),
        None => {
            let candidate = project_hint.join(CONFIG_FILE_NAME);
            candidate.is_file().then_some(candidate)
        }
    };

    let mut config = match &file {
        Some(path) => read_file(path)?,
        None => PackConfig::default(),
    };
    if file.is_none() {
        config.source_root = cwd.to_path_buf();
        config.output = absolutize(cwd, &config.output);
    }

    apply(&mut config, overrides, cwd);
    config.source_root = config
        .source_root
        .canonicalize()
        .with_context(|| format!("Invalid project path {}", config.source_root.display()))?;

    Ok(LoadedConfig { config, file })
}

/// Parse a TOML file, resolving its relative paths against the file's directory.
pub fn read_file(path: &Path) -> Result<PackConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let mut config: PackConfig =
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.source_root = absolutize(base, &config.source_root);
    config.output = absolutize(base, &config.output);
    config.unpack = config
        .unpack
        .iter()
        .map(|archive| absolutize(base, archive))
        .collect();
    config.script_references = config
        .script_references
        .as_deref()
        .map(|map| absolutize(base, map));
    Ok(config)
}

fn apply(config: &mut PackConfig, overrides: ConfigOverrides, cwd: &Path) {
    if let Some(root) = overrides.source_root {
        config.source_root = absolutize(cwd, &root);
    }
    if let Some(output) = overrides.output {
        config.output = absolutize(cwd, &output);
    }
    if !overrides.assets.is_empty() {
        config.assets = overrides.assets;
    }
    config.exclude.extend(overrides.exclude);
    if overrides.skip_dependency_analysis {
        config.skip_dependency_analysis = true;
    }
    if let Some(asset_root) = overrides.asset_root {
        config.asset_root = asset_root;
    }
    config
        .unpack
        .extend(overrides.unpack.iter().map(|archive| absolutize(cwd, archive)));
    if let Some(map) = overrides.script_references {
        config.script_references = Some(absolutize(cwd, &map));
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
