use std::path::Path;

use crate::abort::AbortSignal;
use crate::diff::{self, DiffResult};
use crate::engines::anchor;
use crate::error::EditError;
use crate::file_io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub old_text: String,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiEditOutcome {
    pub results: Vec<DiffResult>,
    pub overall_diff: DiffResult,
}

/// Apply `edits` in order against `path`, each against the content left by
/// the previous one. Stops at the first failure; edits already applied
/// remain written to disk (no rollback), matching `AnchorEditor`'s
/// fail-fast, no-retry contract.
pub async fn edit_file(
    path: &Path,
    edits: &[TextEdit],
    max_file_size: u64,
    abort: &AbortSignal,
) -> Result<MultiEditOutcome, EditError> {
    tracing::debug!(path = %path.display(), edit_count = edits.len(), "multi-edit starting");
    abort.check()?;
    let snapshot = file_io::read(path, max_file_size).await?;
    let original_content = snapshot.joined();

    let mut current = snapshot.clone();
    let mut current_content = original_content.clone();
    let mut results = Vec::with_capacity(edits.len());

    for (index, edit) in edits.iter().enumerate() {
        abort.check()?;

        let new_content = match anchor::apply(&current_content, &edit.old_text, &edit.new_text) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %path.display(), index, error = %err, "multi-edit step failed");
                return Err(err);
            }
        };
        let step_diff = diff::build(&current_content, &new_content);

        let new_lines: Vec<String> = new_content.split('\n').map(|s| s.to_string()).collect();
        current = current.with_lines(new_lines);
        file_io::write(path, &current).await?;

        current_content = new_content;
        results.push(step_diff);
    }

    let overall_diff = diff::build(&original_content, &current_content);
    tracing::info!(
        path = %path.display(),
        first_changed_line = ?overall_diff.first_changed_line,
        "multi-edit written"
    );
    Ok(MultiEditOutcome {
        results,
        overall_diff,
    })
}
