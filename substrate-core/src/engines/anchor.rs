use std::path::Path;

use crate::abort::AbortSignal;
use crate::diff::{self, DiffResult};
use crate::engines::suggest;
use crate::error::EditError;
use crate::file_io::{self, FileSnapshot};
use crate::fuzzy::{self, FuzzyOutcome};

/// Result of a successful anchor edit, matching the `{content, details}`
/// shape consumed by the tool-call boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub summary: String,
    pub diff: DiffResult,
}

/// Replace exactly one occurrence of `old_text` with `new_text` in `content`,
/// under the fuzzy-match cascade. Pure function, no I/O, so `MultiEditor`
/// can call it repeatedly against an in-memory, growing buffer.
pub fn apply(content: &str, old_text: &str, new_text: &str) -> Result<String, EditError> {
    match fuzzy::find(content, old_text) {
        FuzzyOutcome::Ambiguous { count } => Err(EditError::NeedleAmbiguous { count }),
        FuzzyOutcome::NotFound => {
            let source_lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
            let needle_lines: Vec<String> = old_text.lines().map(|l| l.to_string()).collect();
            let suggestion = suggest::find_closest(&source_lines, &needle_lines)
                .filter(|m| m.similarity < 1.0)
                .map(|m| m.feedback());
            Err(EditError::NeedleNotFound { suggestion })
        }
        FuzzyOutcome::Found(m) => {
            let mut result = String::with_capacity(content.len() + new_text.len());
            result.push_str(&content[..m.start]);
            result.push_str(new_text);
            result.push_str(&content[m.start + m.length..]);

            if result == content {
                return Err(EditError::NoChange);
            }

            Ok(result)
        }
    }
}

/// Read, apply, write, and diff a single anchor edit against a file on
/// disk. Polls `abort` before the read and again before the write.
pub async fn edit_file(
    path: &Path,
    old_text: &str,
    new_text: &str,
    max_file_size: u64,
    abort: &AbortSignal,
) -> Result<EditOutcome, EditError> {
    tracing::debug!(path = %path.display(), "anchor edit starting");
    abort.check()?;
    let snapshot = file_io::read(path, max_file_size).await?;

    let old_content = snapshot.joined();
    let new_content = match apply(&old_content, old_text, new_text) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "anchor edit failed");
            return Err(err);
        }
    };

    abort.check()?;

    let new_lines: Vec<String> = new_content.split('\n').map(|s| s.to_string()).collect();
    let new_snapshot: FileSnapshot = snapshot.with_lines(new_lines);
    file_io::write(path, &new_snapshot).await?;

    let diff = diff::build(&old_content, &new_content);
    tracing::info!(
        path = %path.display(),
        first_changed_line = ?diff.first_changed_line,
        "anchor edit written"
    );
    Ok(EditOutcome {
        summary: format!("Edited {}", path.display()),
        diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_unique_occurrence() {
        let result = apply("line1\nsearch\nline2", "search", "replaced").unwrap();
        assert_eq!(result, "line1\nreplaced\nline2");
    }

    #[test]
    fn fails_on_multiple_occurrences() {
        let err = apply("a\nsearch\nb\nsearch\nc", "search", "x").unwrap_err();
        assert!(matches!(err, EditError::NeedleAmbiguous { count: 2 }));
    }

    #[test]
    fn fails_on_identical_replacement() {
        let err = apply("a\nsearch\nb", "search", "search").unwrap_err();
        assert!(matches!(err, EditError::NoChange));
    }

    #[test]
    fn fails_with_suggestion_when_not_found() {
        let err = apply("if x.is_dir() {\n return true;\n}", "if x.is_dir() {\n return true", "x")
            .unwrap_err();
        match err {
            EditError::NeedleNotFound { suggestion } => assert!(suggestion.is_some()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn tolerates_whitespace_normalization() {
        let result = apply(
            "hello world   \nnext line",
            "hello world\nnext",
            "hello universe\nnext",
        )
        .unwrap();
        assert_eq!(result, "hello universe\nnext line");
    }

    #[tokio::test]
    async fn edit_file_round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("file.txt");
        tokio::fs::write(&path, "aaa\nbbb\nccc").await.unwrap();

        let abort = AbortSignal::new();
        let outcome = edit_file(&path, "bbb", "BBB", 10 * 1024 * 1024, &abort)
            .await
            .unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "aaa\nBBB\nccc");
        assert_eq!(outcome.diff.first_changed_line, Some(2));
    }

    #[tokio::test]
    async fn edit_file_respects_abort_before_write() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("file.txt");
        tokio::fs::write(&path, "aaa\nbbb\nccc").await.unwrap();

        let abort = AbortSignal::new();
        abort.abort();
        let err = edit_file(&path, "bbb", "BBB", 10 * 1024 * 1024, &abort)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::OperationAborted));

        let unchanged = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(unchanged, "aaa\nbbb\nccc");
    }
}
