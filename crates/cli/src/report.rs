use crate::session::SessionReport;
use assetpack_package::UnpackStats;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Which dependency query `deps` ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepsQuery {
    Files,
    Guids,
    DeepFiles,
    DeepGuids,
    Dependents,
    DeepDependents,
}

impl DepsQuery {
    pub const fn from_flags(reverse: bool, deep: bool, guids: bool) -> Self {
        match (reverse, deep, guids) {
            (true, false, _) => DepsQuery::Dependents,
            (true, true, _) => DepsQuery::DeepDependents,
            (false, false, false) => DepsQuery::Files,
            (false, false, true) => DepsQuery::Guids,
            (false, true, false) => DepsQuery::DeepFiles,
            (false, true, true) => DepsQuery::DeepGuids,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DepsReport {
    pub query: DepsQuery,
    pub targets: Vec<String>,
    /// Paths (project-relative where possible) or GUIDs, sorted.
    pub items: Vec<String>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListedEntry {
    pub guid: String,
    pub pathname: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListReport {
    pub archive: PathBuf,
    pub entries: Vec<ListedEntry>,
    pub stats: UnpackStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnpackReport {
    pub archive: PathBuf,
    pub destination: PathBuf,
    pub stats: UnpackStats,
}

/// `path` relative to `root` with `/` separators, or the full path when it lies elsewhere.
pub fn display_path(root: &Path, path: &Path) -> String {
    assetpack_protocol::paths::relative_forward_path(root, path)
        .unwrap_or_else(|| path.display().to_string())
}

pub fn render_session(report: &SessionReport) -> String {
    let mut out = format!(
        "Packed {} assets into {} ({} matched, {} referenced",
        report.pack.assets,
        report.output.display(),
        report.explicit,
        report.resolved
    );
    if report.pack.synthesized_sidecars > 0 {
        out.push_str(&format!(
            ", {} generated sidecars",
            report.pack.synthesized_sidecars
        ));
    }
    out.push_str(&format!(") in {}ms", report.time_ms));
    if report.cancelled {
        out.push_str(" [cancelled: package is partial]");
    }
    out
}
