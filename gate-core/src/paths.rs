use crate::constants::ROOT_RECORD_PATH;
use std::path::{Component, Path, PathBuf};

/// Lexically clean a path: drop `.` components and fold `name/..` pairs.
///
/// Leading `..` components of a relative path are kept, and `..` directly
/// under a root is dropped. An empty result becomes `.`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir) | None => out.push(component),
                Some(Component::CurDir) => unreachable!("current dir components are never kept"),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(ROOT_RECORD_PATH);
    }
    out.iter().collect()
}

/// Relative path that leads from directory `from` to `to`.
///
/// Both inputs are expected to be absolute. When they live under different
/// prefixes (e.g. Windows drives) no relative path exists and `to` is
/// returned unchanged.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);

    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    if from_parts.first() != to_parts.first() {
        return to;
    }

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push("..");
    }
    for part in &to_parts[common..] {
        rel.push(part.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        PathBuf::from(ROOT_RECORD_PATH)
    } else {
        rel
    }
}

/// Render a relative path the way records store it: `/`-separated, `.` for
/// the empty path.
pub fn to_record_path(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if parts.is_empty() {
        ROOT_RECORD_PATH.to_string()
    } else {
        parts.join("/")
    }
}
