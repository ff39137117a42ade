use crate::error::{IndexerError, Result};
use assetpack_protocol::paths::relative_forward_path;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Glob-driven file enumerator rooted at a project directory.
///
/// Patterns are matched against the `/`-separated path relative to the root. A directory whose
/// relative path matches an exclude pattern is not descended into.
pub struct FileScanner {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    excluded_paths: Vec<PathBuf>,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            include: Vec::new(),
            exclude: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }

    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Never report this exact file (e.g. the archive being written).
    pub fn exclude_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded_paths.push(path.into());
        self
    }

    /// Matching regular files, sorted by path.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "Not a directory: {}",
                self.root.display()
            )));
        }

        let include = build_set(&self.include)?;
        let exclude = build_set(&self.exclude)?;

        let root = self.root.clone();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                relative_forward_path(&root, entry.path())
                    .map(|rel| !exclude.is_match(&rel))
                    .unwrap_or(true)
            });

        let mut files = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if self.excluded_paths.iter().any(|p| p == path) {
                log::debug!("Skipping excluded file {}", path.display());
                continue;
            }

            let Some(rel) = relative_forward_path(&self.root, path) else {
                continue;
            };
            if include.is_match(&rel) && !exclude.is_match(&rel) {
                files.push(path.to_path_buf());
            }
        }

        log::debug!(
            "Matched {} files under {}",
            files.len(),
            self.root.display()
        );
        Ok(files)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile(pattern)?);
    }
    builder.build().map_err(|e| IndexerError::InvalidPattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

fn compile(pattern: &str) -> Result<Glob> {
    let normalized = pattern.trim().replace('\\', "/");
    let normalized = normalized.trim_start_matches("./");
    GlobBuilder::new(normalized)
        .literal_separator(true)
        .build()
        .map_err(|e| IndexerError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::FileScanner;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn names(files: &[std::path::PathBuf], root: &std::path::Path) -> Vec<String> {
        files
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn include_and_exclude_globs() {
        let temp = tempdir().unwrap();
        let assets = temp.path().join("Assets");
        fs::create_dir_all(assets.join("Trees")).unwrap();
        fs::create_dir_all(assets.join("Editor")).unwrap();
        fs::write(assets.join("Trees/tree.prefab"), b"x").unwrap();
        fs::write(assets.join("Trees/tree.prefab.meta"), b"x").unwrap();
        fs::write(assets.join("Editor/tool.cs"), b"x").unwrap();
        fs::write(temp.path().join("README.md"), b"x").unwrap();

        let files = FileScanner::new(temp.path())
            .include(["Assets/**/*"])
            .exclude(["**/Editor"])
            .scan()
            .unwrap();

        assert_eq!(
            names(&files, temp.path()),
            vec!["Assets/Trees/tree.prefab", "Assets/Trees/tree.prefab.meta"]
        );
    }

    #[test]
    fn sidecar_only_pattern() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.mat"), b"x").unwrap();
        fs::write(temp.path().join("a.mat.meta"), b"x").unwrap();

        let files = FileScanner::new(temp.path())
            .include(["**/*.meta"])
            .scan()
            .unwrap();
        assert_eq!(names(&files, temp.path()), vec!["a.mat.meta"]);
    }

    #[test]
    fn excluded_path_is_skipped() {
        let temp = tempdir().unwrap();
        let output = temp.path().join("out.unitypackage");
        fs::write(&output, b"").unwrap();
        fs::write(temp.path().join("a.mat"), b"x").unwrap();

        let files = FileScanner::new(temp.path())
            .include(["**/*"])
            .exclude_path(&output)
            .scan()
            .unwrap();
        assert_eq!(names(&files, temp.path()), vec!["a.mat"]);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let temp = tempdir().unwrap();
        let err = FileScanner::new(temp.path())
            .include(["Assets/[unclosed"])
            .scan()
            .unwrap_err();
        assert!(err.to_string().contains("Invalid glob pattern"));
    }
}
