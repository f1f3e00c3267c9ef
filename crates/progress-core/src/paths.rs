use crate::error::{ProgressError, Result};
use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CLAUDE_DIR: &str = ".claude";
pub const PROGRESS_MD: &str = "progress.md";
pub const PROGRESS_JSON: &str = ".claude/progress.json";
pub const CHECKPOINTS_JSON: &str = ".claude/checkpoints.json";
pub const CONFIG_FILE: &str = ".claude/progress-ui.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn progress_json_path(root: &Path) -> PathBuf {
    root.join(PROGRESS_JSON)
}

pub fn checkpoints_json_path(root: &Path) -> PathBuf {
    root.join(CHECKPOINTS_JSON)
}

// ---------------------------------------------------------------------------
// Client path validation
// ---------------------------------------------------------------------------

/// Lexically validate a client-supplied relative path.
///
/// Absolute paths and `..` components are traversal attempts and are
/// rejected outright; `.` components are dropped. Backslashes are treated as
/// separators so `..\\x` cannot slip through on any platform.
pub fn normalize_relative(rel: &str) -> Result<PathBuf> {
    let unified = rel.replace('\\', "/");
    if unified.starts_with('/') || unified.starts_with('~') {
        return Err(ProgressError::PathOutsideRoot(rel.to_string()));
    }
    let mut out = PathBuf::new();
    for comp in Path::new(&unified).components() {
        match comp {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ProgressError::PathOutsideRoot(rel.to_string()));
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(ProgressError::UnsupportedDocument(rel.to_string()));
    }
    Ok(out)
}

/// Forward-slash form of a relative path, used on the wire and for
/// whitelist matching.
pub fn display(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `rel` against the canonical `root`, following symlinks, and make
/// sure the result still lives under `root`.
///
/// For a target that does not exist yet the nearest existing ancestor is
/// canonicalized instead, so a symlinked directory cannot redirect a create.
pub fn resolve_under(root: &Path, rel: &Path) -> Result<PathBuf> {
    let full = root.join(rel);
    let outside = || ProgressError::PathOutsideRoot(display(rel));

    if full.exists() {
        let canon = full.canonicalize()?;
        if !canon.starts_with(root) {
            return Err(outside());
        }
        return Ok(canon);
    }

    let ancestor = full
        .ancestors()
        .find(|a| a.exists())
        .ok_or_else(outside)?;
    let canon_ancestor = ancestor.canonicalize()?;
    if !canon_ancestor.starts_with(root) {
        return Err(outside());
    }
    let rest = full.strip_prefix(ancestor).map_err(|_| outside())?;
    Ok(canon_ancestor.join(rest))
}

/// True when `rel` sits strictly inside one of `dirs` (the directory itself
/// never matches).
pub fn is_inside_any(rel: &str, dirs: &[String]) -> bool {
    dirs.iter().any(|d| {
        let d = d.replace('\\', "/");
        let d = d.trim_end_matches('/');
        rel.starts_with(&format!("{d}/"))
    })
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn normalize_accepts_plain_relative() {
        assert_eq!(
            normalize_relative(".claude/progress.md").unwrap(),
            PathBuf::from(".claude/progress.md")
        );
        assert_eq!(
            normalize_relative("./.claude/./a.md").unwrap(),
            PathBuf::from(".claude/a.md")
        );
    }

    #[test]
    fn normalize_rejects_traversal() {
        for bad in [
            "../etc/passwd",
            ".claude/../../x.md",
            "/etc/passwd",
            "~/notes.md",
            "..\\secret.md",
        ] {
            assert!(
                matches!(
                    normalize_relative(bad),
                    Err(ProgressError::PathOutsideRoot(_))
                ),
                "expected traversal rejection for {bad}"
            );
        }
    }

    #[test]
    fn normalize_rejects_empty() {
        assert!(normalize_relative("").is_err());
        assert!(normalize_relative(".").is_err());
    }

    #[test]
    fn whitelist_matches_only_inside() {
        let dirs = vec![".claude".to_string()];
        assert!(is_inside_any(".claude/progress.md", &dirs));
        assert!(is_inside_any(".claude/plans/p.md", &dirs));
        assert!(!is_inside_any(".claude", &dirs));
        assert!(!is_inside_any(".claudex/a.md", &dirs));
        assert!(!is_inside_any("README.md", &dirs));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let exts = vec!["md".to_string(), "txt".to_string()];
        assert!(has_extension(Path::new("a.MD"), &exts));
        assert!(has_extension(Path::new("b.txt"), &exts));
        assert!(!has_extension(Path::new("c.json"), &exts));
        assert!(!has_extension(Path::new("noext"), &exts));
    }

    #[test]
    fn resolve_existing_and_missing_targets() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join(".claude")).unwrap();
        std::fs::write(root.join(".claude/a.md"), "x").unwrap();

        let existing = resolve_under(&root, Path::new(".claude/a.md")).unwrap();
        assert_eq!(existing, root.join(".claude/a.md"));

        let missing = resolve_under(&root, Path::new(".claude/new/b.md")).unwrap();
        assert_eq!(missing, root.join(".claude/new/b.md"));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.md"), "s").unwrap();
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        let err = resolve_under(&root, Path::new("link/secret.md")).unwrap_err();
        assert!(matches!(err, ProgressError::PathOutsideRoot(_)));
        let err = resolve_under(&root, Path::new("link/new.md")).unwrap_err();
        assert!(matches!(err, ProgressError::PathOutsideRoot(_)));
    }
}
