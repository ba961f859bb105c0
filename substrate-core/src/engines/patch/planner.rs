use std::path::{Path, PathBuf};

use crate::abort::AbortSignal;
use crate::diff::{self, DiffResult};
use crate::engines::patch::parser::{Hunk, PatchOp, ParsedPatch};
use crate::engines::suggest;
use crate::error::EditError;
use crate::file_io::{self, FileSnapshot};
use crate::path_guard::PathGuard;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub moved_to: Option<PathBuf>,
    pub diff: DiffResult,
    pub additions: usize,
    pub removals: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub changes: Vec<FileChange>,
}

/// Resolve every operation's target path and existence precondition before
/// touching disk, so a patch with one bad op never leaves a partial write.
fn preflight(
    guard: &PathGuard,
    ops: &[PatchOp],
) -> Result<Vec<(PatchOp, PathBuf, Option<PathBuf>)>, EditError> {
    let mut resolved = Vec::with_capacity(ops.len());

    for op in ops {
        match op {
            PatchOp::AddFile { path, .. } => {
                let target = guard.resolve(path)?;
                if target.exists() {
                    return Err(EditError::FileExists { path: target });
                }
                resolved.push((op.clone(), target, None));
            }
            PatchOp::DeleteFile { path } => {
                let target = guard.resolve(path)?;
                if !target.is_file() {
                    return Err(EditError::FileNotFound { path: target });
                }
                resolved.push((op.clone(), target, None));
            }
            PatchOp::UpdateFile { path, move_to, .. } => {
                let target = guard.resolve(path)?;
                if !target.is_file() {
                    return Err(EditError::FileNotFound { path: target });
                }
                let dest = match move_to {
                    Some(dest) => {
                        let resolved_dest = guard.resolve(dest)?;
                        if resolved_dest.exists() {
                            return Err(EditError::FileExists {
                                path: resolved_dest,
                            });
                        }
                        Some(resolved_dest)
                    }
                    None => None,
                };
                resolved.push((op.clone(), target, dest));
            }
        }
    }

    Ok(resolved)
}

/// Apply a parsed patch envelope against `workspace_root`/`cwd` via `guard`.
/// Every op is validated up front; I/O only starts once the whole batch is
/// known-applicable.
pub async fn apply(
    parsed: &ParsedPatch,
    guard: &PathGuard,
    max_file_size: u64,
    abort: &AbortSignal,
) -> Result<PlanOutcome, EditError> {
    tracing::debug!(op_count = parsed.ops.len(), "patch apply starting");
    abort.check()?;
    let resolved = preflight(guard, &parsed.ops).map_err(|err| {
        tracing::warn!(error = %err, "patch preflight rejected");
        err
    })?;

    let mut changes = Vec::with_capacity(resolved.len());

    for (op, target, dest) in resolved {
        abort.check()?;

        let change = match op {
            PatchOp::AddFile { lines, .. } => {
                let content = lines.join("\n");
                let snapshot = FileSnapshot::from_bytes(content.as_bytes())?;
                file_io::write(&target, &snapshot).await?;
                FileChange {
                    path: target,
                    moved_to: None,
                    diff: diff::build("", &snapshot.joined()),
                    additions: lines.len(),
                    removals: 0,
                }
            }
            PatchOp::DeleteFile { .. } => {
                let snapshot = file_io::read(&target, max_file_size).await?;
                let original = snapshot.joined();
                tokio::fs::remove_file(&target)
                    .await
                    .map_err(|e| EditError::io(&e))?;
                let removals = snapshot.lines.len();
                FileChange {
                    path: target,
                    moved_to: None,
                    diff: diff::build(&original, ""),
                    additions: 0,
                    removals,
                }
            }
            PatchOp::UpdateFile { hunks, .. } => {
                let snapshot = file_io::read(&target, max_file_size).await?;
                let original = snapshot.joined();
                let (new_lines, additions, removals) =
                    apply_hunks(&snapshot.lines, &hunks).map_err(|err| {
                        tracing::warn!(path = %target.display(), error = %err, "patch hunk resolution failed");
                        err
                    })?;
                let new_snapshot = snapshot.with_lines(new_lines);
                let new_content = new_snapshot.joined();

                let write_path = dest.clone().unwrap_or_else(|| target.clone());
                file_io::write(&write_path, &new_snapshot).await?;
                if let Some(dest_path) = &dest {
                    if dest_path != &target {
                        tokio::fs::remove_file(&target)
                            .await
                            .map_err(|e| EditError::io(&e))?;
                    }
                }

                FileChange {
                    path: target,
                    moved_to: dest,
                    diff: diff::build(&original, &new_content),
                    additions,
                    removals,
                }
            }
        };

        changes.push(change);
    }

    tracing::info!(file_count = changes.len(), "patch applied");
    Ok(PlanOutcome { changes })
}

/// Apply every hunk of an `UpdateFile` op against `lines`, resolving each
/// hunk's position by exact, first-occurrence match of its context+removed
/// lines. Hunks are applied in descending position order so earlier
/// positions are unaffected by later splices.
fn apply_hunks(
    lines: &[String],
    hunks: &[Hunk],
) -> Result<(Vec<String>, usize, usize), EditError> {
    let mut positioned: Vec<(usize, &Hunk)> = Vec::with_capacity(hunks.len());
    let mut search_from = 0usize;

    for hunk in hunks {
        let needle: Vec<String> = hunk
            .context_and_removed()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let pos = find_exact(lines, &needle, search_from).ok_or_else(|| {
            let suggestion = suggest::find_closest(lines, &needle).map(|m| m.feedback());
            EditError::ContextNotFound { suggestion }
        })?;
        search_from = pos + needle.len().max(1);
        positioned.push((pos, hunk));
    }

    positioned.sort_by(|a, b| b.0.cmp(&a.0));

    let mut result = lines.to_vec();
    let mut additions = 0usize;
    let mut removals = 0usize;

    for (pos, hunk) in positioned {
        let removed_len = hunk.context_and_removed().len();
        let replacement: Vec<String> = hunk
            .context_and_added()
            .iter()
            .map(|s| s.to_string())
            .collect();

        additions += hunk.additions();
        removals += hunk.removals();

        result.splice(pos..pos + removed_len, replacement);
    }

    Ok((result, additions, removals))
}

fn find_exact(lines: &[String], needle: &[String], start_from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(start_from.min(lines.len()));
    }
    if needle.len() > lines.len() {
        return None;
    }
    for start in start_from..=(lines.len() - needle.len()) {
        if lines[start..start + needle.len()] == needle[..] {
            return Some(start);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engines::patch::parser;

    fn guard_for(root: &Path) -> PathGuard {
        PathGuard::new(root.to_path_buf(), root.to_path_buf(), &EngineConfig::default())
    }

    #[tokio::test]
    async fn adds_new_file() {
        let tmp = tempfile::tempdir().unwrap();
        let patch = parser::parse("*** Add File: new.txt\n+hello\n+world").unwrap();
        let guard = guard_for(tmp.path());
        let abort = AbortSignal::new();

        let outcome = apply(&patch, &guard, 10 * 1024 * 1024, &abort)
            .await
            .unwrap();
        assert_eq!(outcome.changes.len(), 1);

        let written = tokio::fs::read_to_string(tmp.path().join("new.txt"))
            .await
            .unwrap();
        assert_eq!(written, "hello\nworld");
    }

    #[tokio::test]
    async fn rejects_add_when_file_exists() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("new.txt"), "x").await.unwrap();
        let patch = parser::parse("*** Add File: new.txt\n+hello").unwrap();
        let guard = guard_for(tmp.path());
        let abort = AbortSignal::new();

        let err = apply(&patch, &guard, 10 * 1024 * 1024, &abort)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::FileExists { .. }));
    }

    #[tokio::test]
    async fn deletes_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("gone.txt"), "bye")
            .await
            .unwrap();
        let patch = parser::parse("*** Delete File: gone.txt").unwrap();
        let guard = guard_for(tmp.path());
        let abort = AbortSignal::new();

        apply(&patch, &guard, 10 * 1024 * 1024, &abort)
            .await
            .unwrap();
        assert!(!tmp.path().join("gone.txt").exists());
    }

    #[tokio::test]
    async fn updates_file_with_exact_match() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("f.txt"), "one\ntwo\nthree")
            .await
            .unwrap();
        let patch_text = "*** Update File: f.txt\n@@\n one\n-two\n+TWO\n three";
        let patch = parser::parse(patch_text).unwrap();
        let guard = guard_for(tmp.path());
        let abort = AbortSignal::new();

        apply(&patch, &guard, 10 * 1024 * 1024, &abort)
            .await
            .unwrap();
        let written = tokio::fs::read_to_string(tmp.path().join("f.txt"))
            .await
            .unwrap();
        assert_eq!(written, "one\nTWO\nthree");
    }

    #[tokio::test]
    async fn update_moves_file_to_new_path() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("old.txt"), "a\nb")
            .await
            .unwrap();
        let patch_text = "*** Update File: old.txt\n*** Move to: new.txt\n@@\n a\n-b\n+B";
        let patch = parser::parse(patch_text).unwrap();
        let guard = guard_for(tmp.path());
        let abort = AbortSignal::new();

        apply(&patch, &guard, 10 * 1024 * 1024, &abort)
            .await
            .unwrap();
        assert!(!tmp.path().join("old.txt").exists());
        let written = tokio::fs::read_to_string(tmp.path().join("new.txt"))
            .await
            .unwrap();
        assert_eq!(written, "a\nB");
    }

    #[tokio::test]
    async fn update_fails_when_context_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("f.txt"), "one\ntwo\nthree")
            .await
            .unwrap();
        let patch_text = "*** Update File: f.txt\n@@\n one\n-nope\n+NOPE\n three";
        let patch = parser::parse(patch_text).unwrap();
        let guard = guard_for(tmp.path());
        let abort = AbortSignal::new();

        let err = apply(&patch, &guard, 10 * 1024 * 1024, &abort)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::ContextNotFound { .. }));
    }

    #[tokio::test]
    async fn preflight_rejects_before_any_write() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("a.txt"), "x").await.unwrap();
        let patch = parser::parse(
            "*** Add File: a.txt\n+dup\n*** Delete File: missing.txt",
        )
        .unwrap();
        let guard = guard_for(tmp.path());
        let abort = AbortSignal::new();

        let err = apply(&patch, &guard, 10 * 1024 * 1024, &abort)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::FileExists { .. }));
    }
}
