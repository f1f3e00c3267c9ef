use crate::config::Config;
use crate::error::{ProgressError, Result};
use crate::guard::{self, DocumentLocks};
use crate::io;
use crate::lines;
use crate::paths;
use crate::revision::{mtime_secs, Precondition, Revision};
use crate::status::{self, CheckboxLine, Marker};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentEntry {
    pub path: String,
    pub name: String,
    pub mtime: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub path: String,
    pub content: String,
    pub mtime: i64,
    pub rev: Revision,
}

impl Document {
    pub fn checkboxes(&self) -> Vec<CheckboxLine> {
        status::checkbox_lines(&self.content)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    pub rev: Revision,
    pub mtime: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchOutcome {
    pub rev: Revision,
    pub mtime: i64,
    pub updated_line: String,
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Documents under one project root. Cheap to clone; clones share the
/// per-document locks.
#[derive(Clone)]
pub struct DocumentStore {
    root: PathBuf,
    config: Arc<Config>,
    locks: DocumentLocks,
}

struct Located {
    display: String,
    full: PathBuf,
}

impl DocumentStore {
    pub fn open(root: &Path, config: Config) -> Result<Self> {
        Ok(Self {
            root: root.canonicalize()?,
            config: Arc::new(config),
            locks: DocumentLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Eligible documents under the configured directories.
    ///
    /// A `progress.md` sitting directly in a document directory comes first;
    /// everything else is ordered by relative path, so the order never
    /// depends on directory iteration order.
    pub fn list(&self) -> Result<Vec<DocumentEntry>> {
        let mut found = Vec::new();
        for dir in &self.config.documents {
            // A document directory that is itself a symlink out of the root
            // would list files that `read` refuses.
            let Ok(base) = self.root.join(dir).canonicalize() else {
                continue;
            };
            if !base.starts_with(&self.root) {
                tracing::warn!(dir = %dir, "document directory resolves outside the project root");
                continue;
            }
            if base.is_dir() {
                collect(&base, &self.config.extensions, &mut found)?;
            }
        }

        let mut entries: Vec<(bool, DocumentEntry)> = Vec::new();
        for full in found {
            let Ok(rel) = full.strip_prefix(&self.root) else {
                continue;
            };
            let path = paths::display(rel);
            if entries.iter().any(|(_, e)| e.path == path) {
                continue;
            }
            let Ok(mtime) = mtime_secs(&full) else {
                continue;
            };
            let name = full
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let pinned = self.is_pinned(&path);
            entries.push((pinned, DocumentEntry { path, name, mtime }));
        }
        entries.sort_by(|(pa, a), (pb, b)| pb.cmp(pa).then_with(|| a.path.cmp(&b.path)));
        Ok(entries.into_iter().map(|(_, e)| e).collect())
    }

    fn is_pinned(&self, path: &str) -> bool {
        self.config.documents.iter().any(|d| {
            let d = d.trim_end_matches('/');
            path == format!("{d}/{}", paths::PROGRESS_MD)
        })
    }

    pub fn read(&self, rel: &str) -> Result<Document> {
        let loc = self.locate(rel)?;
        self.locks.with_lock(&loc.full, || -> Result<Document> {
            let (content, rev, mtime) = snapshot(&loc)?
                .ok_or_else(|| ProgressError::DocumentNotFound(loc.display.clone()))?;
            Ok(Document {
                path: loc.display.clone(),
                content,
                mtime,
                rev,
            })
        })
    }

    /// Replace the whole document if `expected` still describes it. A
    /// missing document inside a writable directory is created when
    /// `expected` carries an empty revision.
    pub fn write_full(
        &self,
        rel: &str,
        content: &str,
        expected: &Precondition,
    ) -> Result<WriteOutcome> {
        let loc = self.locate(rel)?;
        self.ensure_writable(&loc)?;
        self.locks.with_lock(&loc.full, || -> Result<WriteOutcome> {
            match snapshot(&loc)? {
                Some((_, rev, mtime)) => guard::check(&loc.display, expected, &rev, mtime)?,
                None if expected.expects_absent() => {}
                None => return Err(ProgressError::DocumentNotFound(loc.display.clone())),
            }
            io::atomic_write(&loc.full, content.as_bytes())?;
            let outcome = WriteOutcome {
                rev: Revision::of(content),
                mtime: mtime_secs(&loc.full)?,
            };
            tracing::debug!(path = %loc.display, rev = %outcome.rev, "document written");
            Ok(outcome)
        })
    }

    /// Set the marker of one checkbox line, addressed by its index in the
    /// canonical split of the stored content.
    pub fn write_line(
        &self,
        rel: &str,
        line_index: usize,
        marker: Marker,
        expected: &Precondition,
    ) -> Result<PatchOutcome> {
        let loc = self.locate(rel)?;
        self.ensure_writable(&loc)?;
        self.locks.with_lock(&loc.full, || -> Result<PatchOutcome> {
            let (content, rev, mtime) = snapshot(&loc)?
                .ok_or_else(|| ProgressError::DocumentNotFound(loc.display.clone()))?;
            guard::check(&loc.display, expected, &rev, mtime)?;

            let mut split: Vec<String> = lines::split(&content)
                .into_iter()
                .map(str::to_string)
                .collect();
            let len = split.len();
            let target = split
                .get(line_index)
                .ok_or(ProgressError::LineOutOfRange {
                    index: line_index,
                    len,
                })?;
            let updated =
                status::render(target, marker).ok_or(ProgressError::NotACheckbox(line_index))?;
            let updated_line = lines::strip_ending(&updated).0.to_string();
            split[line_index] = updated;

            let new_content = lines::join(&split);
            io::atomic_write(&loc.full, new_content.as_bytes())?;
            let outcome = PatchOutcome {
                rev: Revision::of(&new_content),
                mtime: mtime_secs(&loc.full)?,
                updated_line,
            };
            tracing::debug!(
                path = %loc.display,
                line = line_index,
                marker = %marker,
                rev = %outcome.rev,
                "checkbox updated"
            );
            Ok(outcome)
        })
    }

    fn locate(&self, rel: &str) -> Result<Located> {
        let rel_path = paths::normalize_relative(rel)?;
        let display = paths::display(&rel_path);
        if !paths::has_extension(&rel_path, &self.config.extensions) {
            return Err(ProgressError::UnsupportedDocument(display));
        }
        let full = paths::resolve_under(&self.root, &rel_path)?;
        Ok(Located { display, full })
    }

    fn ensure_writable(&self, loc: &Located) -> Result<()> {
        // Match against the resolved location so a symlink inside the root
        // cannot lend write access to a non-writable directory.
        let resolved = loc
            .full
            .strip_prefix(&self.root)
            .map(paths::display)
            .unwrap_or_default();
        if paths::is_inside_any(&loc.display, &self.config.writable)
            && paths::is_inside_any(&resolved, &self.config.writable)
        {
            Ok(())
        } else {
            Err(ProgressError::NotWritable(loc.display.clone()))
        }
    }
}

/// Current `(content, revision, mtime)` of a file, `None` when it does not
/// exist.
fn snapshot(loc: &Located) -> Result<Option<(String, Revision, i64)>> {
    let full = &loc.full;
    if !full.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(full).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => ProgressError::UnsupportedDocument(loc.display.clone()),
        _ => e.into(),
    })?;
    let mtime = mtime_secs(full)?;
    let rev = Revision::of(&content);
    Ok(Some((content, rev, mtime)))
}

/// Recursively gather eligible files. Symlinks are skipped so a scan can
/// neither leave the root nor loop.
fn collect(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            collect(&path, extensions, out)?;
        } else if file_type.is_file() && paths::has_extension(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use tempfile::TempDir;

    const FIVE_LINES: &str = "# Plan\n\n- [ ] write docs\n- [参考] background\n- [/] build it\n";

    fn store_with(files: &[(&str, &str)]) -> (TempDir, DocumentStore) {
        let dir = TempDir::new().unwrap();
        io::ensure_dir(&dir.path().join(".claude")).unwrap();
        for (rel, content) in files {
            let p = dir.path().join(rel);
            io::ensure_dir(p.parent().unwrap()).unwrap();
            std::fs::write(p, content).unwrap();
        }
        let store = DocumentStore::open(dir.path(), Config::default()).unwrap();
        (dir, store)
    }

    fn current(store: &DocumentStore, rel: &str) -> Precondition {
        Precondition::new(store.read(rel).unwrap().rev.as_str())
    }

    #[test]
    fn list_empty_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path(), Config::default()).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn list_pins_progress_md_then_sorts_by_path() {
        let (_dir, store) = store_with(&[
            (".claude/zeta.md", "z"),
            (".claude/alpha.md", "a"),
            (".claude/progress.md", "p"),
            (".claude/plans/beta.md", "b"),
            (".claude/progress.json", "{}"),
            ("README.md", "outside documents dir"),
        ]);
        let paths: Vec<String> = store.list().unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![
                ".claude/progress.md",
                ".claude/alpha.md",
                ".claude/plans/beta.md",
                ".claude/zeta.md",
            ]
        );
    }

    #[test]
    fn list_is_repeatable() {
        let (_dir, store) = store_with(&[(".claude/b.md", "b"), (".claude/a.txt", "a")]);
        assert_eq!(store.list().unwrap(), store.list().unwrap());
        assert_eq!(store.list().unwrap()[0].name, "a");
    }

    #[test]
    fn read_returns_content_and_revision() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let doc = store.read(".claude/progress.md").unwrap();
        assert_eq!(doc.content, FIVE_LINES);
        assert_eq!(doc.rev, Revision::of(FIVE_LINES));
        assert_eq!(doc.checkboxes().len(), 2);
    }

    #[test]
    fn read_missing_is_not_found() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.read(".claude/nope.md"),
            Err(ProgressError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn read_rejects_traversal() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.read("../outside.md"),
            Err(ProgressError::PathOutsideRoot(_))
        ));
    }

    #[test]
    fn read_rejects_ineligible_extension() {
        let (_dir, store) = store_with(&[(".claude/progress.json", "{}")]);
        assert!(matches!(
            store.read(".claude/progress.json"),
            Err(ProgressError::UnsupportedDocument(_))
        ));
    }

    #[test]
    fn write_then_read_round_trips_with_new_revision() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let before = store.read(".claude/progress.md").unwrap();
        let out = store
            .write_full(".claude/progress.md", "- [x] done\n", &current(&store, ".claude/progress.md"))
            .unwrap();
        let after = store.read(".claude/progress.md").unwrap();
        assert_eq!(after.content, "- [x] done\n");
        assert_eq!(after.rev, out.rev);
        assert_ne!(after.rev, before.rev);
    }

    #[test]
    fn stale_write_conflicts_and_leaves_content() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let stale = Precondition::new(Revision::of("something else").as_str());
        let err = store
            .write_full(".claude/progress.md", "clobber", &stale)
            .unwrap_err();
        assert!(matches!(err, ProgressError::Conflict { .. }));
        assert_eq!(store.read(".claude/progress.md").unwrap().content, FIVE_LINES);
    }

    #[test]
    fn stale_mtime_conflicts() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let doc = store.read(".claude/progress.md").unwrap();
        let expected = Precondition::new(doc.rev.as_str()).with_mtime(Some(doc.mtime - 100));
        assert!(matches!(
            store.write_full(".claude/progress.md", "x", &expected),
            Err(ProgressError::Conflict { .. })
        ));
    }

    #[test]
    fn write_outside_whitelist_is_forbidden() {
        let (dir, store) = store_with(&[("README.md", "readme")]);
        let expected = Precondition::new(Revision::of("readme").as_str());
        assert!(matches!(
            store.write_full("README.md", "pwned", &expected),
            Err(ProgressError::NotWritable(_))
        ));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("README.md")).unwrap(),
            "readme"
        );
    }

    #[test]
    fn write_creates_missing_document_only_with_empty_base() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.write_full(".claude/new.md", "x", &Precondition::new("abc")),
            Err(ProgressError::DocumentNotFound(_))
        ));
        let out = store
            .write_full(".claude/new.md", "- [ ] first\n", &Precondition::default())
            .unwrap();
        assert_eq!(out.rev, Revision::of("- [ ] first\n"));
        // Once it exists an empty base is stale.
        assert!(matches!(
            store.write_full(".claude/new.md", "again", &Precondition::default()),
            Err(ProgressError::Conflict { .. })
        ));
    }

    #[test]
    fn patch_changes_only_the_target_line() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let out = store
            .write_line(".claude/progress.md", 2, Marker::Done, &current(&store, ".claude/progress.md"))
            .unwrap();
        assert_eq!(out.updated_line, "- [x] write docs");

        let after = store.read(".claude/progress.md").unwrap();
        let before_lines = lines::split(FIVE_LINES);
        let after_lines = lines::split(&after.content);
        assert_eq!(before_lines.len(), after_lines.len());
        for (i, (b, a)) in before_lines.iter().zip(&after_lines).enumerate() {
            if i == 2 {
                assert_eq!(*a, "- [x] write docs\n");
            } else {
                assert_eq!(b, a, "line {i} changed");
            }
        }
        assert_eq!(after.rev, out.rev);
    }

    #[test]
    fn patch_replayed_with_old_revision_conflicts() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let base = current(&store, ".claude/progress.md");
        store
            .write_line(".claude/progress.md", 2, Marker::Done, &base)
            .unwrap();
        let err = store
            .write_line(".claude/progress.md", 2, Marker::Done, &base)
            .unwrap_err();
        assert!(matches!(err, ProgressError::Conflict { .. }));
    }

    #[test]
    fn patch_refuses_non_checkbox_lines() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let base = current(&store, ".claude/progress.md");
        for idx in [0, 1, 3] {
            assert!(matches!(
                store.write_line(".claude/progress.md", idx, Marker::Done, &base),
                Err(ProgressError::NotACheckbox(i)) if i == idx
            ));
        }
        assert_eq!(store.read(".claude/progress.md").unwrap().content, FIVE_LINES);
    }

    #[test]
    fn patch_out_of_range() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let base = current(&store, ".claude/progress.md");
        assert!(matches!(
            store.write_line(".claude/progress.md", 5, Marker::Done, &base),
            Err(ProgressError::LineOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn patch_preserves_crlf_endings() {
        let doc = "- [ ] a\r\n- [ ] b\r\n";
        let (_dir, store) = store_with(&[(".claude/progress.md", doc)]);
        let base = current(&store, ".claude/progress.md");
        store
            .write_line(".claude/progress.md", 1, Marker::Blocked, &base)
            .unwrap();
        assert_eq!(
            store.read(".claude/progress.md").unwrap().content,
            "- [ ] a\r\n- [!] b\r\n"
        );
    }

    #[test]
    fn concurrent_writers_with_same_base_one_wins() {
        let (_dir, store) = store_with(&[(".claude/progress.md", FIVE_LINES)]);
        let base = current(&store, ".claude/progress.md");
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["first\n", "second\n"]
            .into_iter()
            .map(|body| {
                let store = store.clone();
                let base = base.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    store.write_full(".claude/progress.md", body, &base)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ProgressError::Conflict { .. })))
            .count();
        assert_eq!((ok, conflicts), (1, 1));

        let content = store.read(".claude/progress.md").unwrap().content;
        assert!(content == "first\n" || content == "second\n");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_into_read_only_dir_is_not_writable() {
        let (dir, store) = store_with(&[("docs/todo.md", "- [ ] ship\n")]);
        std::os::unix::fs::symlink(
            dir.path().join("docs/todo.md"),
            dir.path().join(".claude/todo.md"),
        )
        .unwrap();
        std::os::unix::fs::symlink(dir.path().join("docs"), dir.path().join(".claude/shared"))
            .unwrap();

        for rel in [".claude/todo.md", ".claude/shared/todo.md"] {
            let base = current(&store, rel);
            assert!(matches!(
                store.write_line(rel, 0, Marker::Done, &base),
                Err(ProgressError::NotWritable(_))
            ));
            assert!(matches!(
                store.write_full(rel, "pwned", &base),
                Err(ProgressError::NotWritable(_))
            ));
        }
        assert_eq!(
            std::fs::read_to_string(dir.path().join("docs/todo.md")).unwrap(),
            "- [ ] ship\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn list_skips_document_dir_linked_outside_root() {
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.md"), "s").unwrap();
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join(".claude")).unwrap();

        let store = DocumentStore::open(dir.path(), Config::default()).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(
            store.read(".claude/secret.md"),
            Err(ProgressError::PathOutsideRoot(_))
        ));
    }

    #[test]
    fn non_utf8_document_is_unsupported() {
        let (dir, store) = store_with(&[]);
        std::fs::write(dir.path().join(".claude/binary.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(matches!(
            store.read(".claude/binary.md"),
            Err(ProgressError::UnsupportedDocument(_))
        ));
    }
}
