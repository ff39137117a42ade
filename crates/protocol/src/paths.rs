use std::path::{Component, Path};

/// Replace every backslash separator with `/`.
pub fn to_forward_slashes(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Path of `path` relative to `root`, with `/` separators.
///
/// Returns `None` when `path` is not located under `root` or equals it.
pub fn relative_forward_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
            Component::CurDir => continue,
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(to_forward_slashes(&parts.join("/")))
}

/// True when `raw` names a location strictly inside whatever directory it is joined onto.
pub fn is_safe_relative_path(raw: &str) -> bool {
    let normalized = to_forward_slashes(raw);
    if normalized.is_empty() || normalized.starts_with('/') {
        return false;
    }
    // Drive prefixes such as `C:` are absolute on some hosts.
    if normalized.as_bytes().get(1) == Some(&b':') {
        return false;
    }

    let mut depth = 0usize;
    for segment in normalized.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return false,
            _ => depth += 1,
        }
    }
    depth > 0
}
