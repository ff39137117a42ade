use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod paths;

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "assetpack.toml";

/// Suffix of the identity-carrying companion file of every asset.
pub const SIDECAR_EXTENSION: &str = "meta";

/// Log severity requested by the caller.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Verbosity {
    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::Trace => log::LevelFilter::Trace,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Warn => log::LevelFilter::Warn,
            Verbosity::Error => log::LevelFilter::Error,
        }
    }
}

/// Resolved options of one packing run.
///
/// Relative `output`, `unpack` and `script_references` paths are resolved against the
/// working directory by the caller, not here.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PackConfig {
    /// Project root; every packed pathname is relative to it.
    pub source_root: PathBuf,

    /// Archive to write.
    pub output: PathBuf,

    /// Include globs, relative to the source root.
    pub assets: Vec<String>,

    /// Exclude globs, relative to the source root.
    pub exclude: Vec<String>,

    /// Pack the matched files only, without following references.
    pub skip_dependency_analysis: bool,

    /// Sub-directory of the source root whose sidecars feed the asset index.
    pub asset_root: String,

    pub verbosity: Verbosity,

    /// Archives extracted into the source root before packing.
    pub unpack: Vec<PathBuf>,

    /// JSON map of script file -> script files it references.
    pub script_references: Option<PathBuf>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            output: PathBuf::from("package.unitypackage"),
            assets: vec!["**/*".to_string()],
            exclude: Vec::new(),
            skip_dependency_analysis: false,
            asset_root: "Assets".to_string(),
            verbosity: Verbosity::Info,
            unpack: Vec::new(),
            script_references: None,
        }
    }
}

impl PackConfig {
    /// Directory scanned for sidecar files when building the asset index.
    pub fn asset_root_dir(&self) -> PathBuf {
        let sub = paths::to_forward_slashes(&self.asset_root);
        let sub = sub.trim_matches('/');
        if sub.is_empty() || sub == "." {
            self.source_root.clone()
        } else {
            self.source_root.join(sub)
        }
    }
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: PackConfig =
            serde_json::from_str(r#"{"source_root":"/proj","skip_dependency_analysis":true}"#)
                .unwrap();
        assert_eq!(config.source_root, PathBuf::from("/proj"));
        assert!(config.skip_dependency_analysis);
        assert_eq!(config.assets, vec!["**/*".to_string()]);
        assert_eq!(config.asset_root, "Assets");
        assert_eq!(config.verbosity, Verbosity::Info);
    }

    #[test]
    fn asset_root_dir_handles_empty_and_nested_values() {
        let mut config = PackConfig {
            source_root: PathBuf::from("/proj"),
            ..Default::default()
        };
        assert_eq!(config.asset_root_dir(), PathBuf::from("/proj/Assets"));

        config.asset_root = "./".to_string();
        assert_eq!(config.asset_root_dir(), PathBuf::from("/proj"));

        config.asset_root = String::new();
        assert_eq!(config.asset_root_dir(), PathBuf::from("/proj"));

        config.asset_root = "Assets\\Game\\".to_string();
        assert_eq!(config.asset_root_dir(), PathBuf::from("/proj/Assets/Game"));
    }

    #[test]
    fn verbosity_parses_snake_case() {
        let v: Verbosity = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(v, Verbosity::Warn);
        assert_eq!(v.as_level_filter(), log::LevelFilter::Warn);
    }
}
