use std::path::Path;

use crate::abort::AbortSignal;
use crate::diff::{self, DiffResult};
use crate::engines::anchor;
use crate::engines::hashline::codec::{self, LineTag};
use crate::error::{EditError, Mismatch, MismatchReport};
use crate::file_io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashEdit {
    Replace {
        pos: LineTag,
        end: Option<LineTag>,
        lines: Vec<String>,
    },
    Append {
        pos: Option<LineTag>,
        lines: Vec<String>,
    },
    Prepend {
        pos: Option<LineTag>,
        lines: Vec<String>,
    },
    ReplaceText {
        old_text: String,
        new_text: String,
        all: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashlineOutcome {
    pub diff: DiffResult,
    pub noop_edits: usize,
    pub deduplicated_edits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TieRank {
    Prepend,
    Replace,
    Append,
}

pub async fn apply_edits(
    path: &Path,
    edits: Vec<HashEdit>,
    max_file_size: u64,
    hashline_autocorrect: bool,
    abort: &AbortSignal,
) -> Result<HashlineOutcome, EditError> {
    tracing::debug!(path = %path.display(), edit_count = edits.len(), "hashline edit starting");
    abort.check()?;
    let snapshot = file_io::read(path, max_file_size).await?;
    let mut lines = snapshot.lines.clone();
    let original_content = snapshot.joined();

    validate_structure(&edits, lines.len())?;
    if let Err(err) = validate_hashes(&edits, &lines) {
        tracing::warn!(path = %path.display(), error = %err, "hashline edit rejected");
        return Err(err);
    }

    abort.check()?;

    let (deduped, duplicate_count) = dedupe(edits);

    let mut sorted: Vec<(i64, TieRank, HashEdit)> = deduped
        .into_iter()
        .map(|edit| {
            let (position, rank) = sort_key(&edit, lines.len());
            (position, rank, edit)
        })
        .collect();
    sorted.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut noop_count = 0usize;

    for (_, _, edit) in sorted {
        match edit {
            HashEdit::ReplaceText {
                old_text,
                new_text,
                all,
            } => {
                let joined = lines.join("\n");
                let new_joined = if all {
                    if joined.contains(&old_text) && old_text != new_text {
                        joined.replace(&old_text, &new_text)
                    } else if old_text == new_text {
                        return Err(EditError::NoChange);
                    } else {
                        return Err(EditError::NeedleNotFound { suggestion: None });
                    }
                } else {
                    anchor::apply(&joined, &old_text, &new_text)?
                };
                lines = new_joined.split('\n').map(|s| s.to_string()).collect();
            }
            HashEdit::Replace { pos, end, lines: payload } => {
                let start_idx = pos.line - 1;
                let end_idx = end.map(|e| e.line - 1).unwrap_or(start_idx);

                let payload = if hashline_autocorrect {
                    autocorrect_replace(&lines, start_idx, end_idx, payload)
                } else {
                    payload
                };

                let removed: Vec<String> = lines[start_idx..=end_idx].to_vec();
                if removed == payload {
                    noop_count += 1;
                    continue;
                }

                lines.splice(start_idx..=end_idx, payload);
            }
            HashEdit::Append { pos, lines: payload } => {
                let insert_at = pos.map(|p| p.line).unwrap_or(lines.len());
                let payload = if hashline_autocorrect {
                    autocorrect_insert(&lines, insert_at, payload)
                } else {
                    payload
                };
                lines.splice(insert_at..insert_at, payload);
            }
            HashEdit::Prepend { pos, lines: payload } => {
                let insert_at = pos.map(|p| p.line - 1).unwrap_or(0);
                let payload = if hashline_autocorrect {
                    autocorrect_insert(&lines, insert_at, payload)
                } else {
                    payload
                };
                lines.splice(insert_at..insert_at, payload);
            }
        }
        abort.check()?;
    }

    let new_content = lines.join("\n");
    let new_snapshot = snapshot.with_lines(lines);
    file_io::write(path, &new_snapshot).await?;

    let diff_result = diff::build(&original_content, &new_content);
    tracing::info!(
        path = %path.display(),
        first_changed_line = ?diff_result.first_changed_line,
        noop_edits = noop_count,
        deduplicated_edits = duplicate_count,
        "hashline edit written"
    );
    Ok(HashlineOutcome {
        diff: diff_result,
        noop_edits: noop_count,
        deduplicated_edits: duplicate_count,
    })
}

fn validate_structure(edits: &[HashEdit], _line_count: usize) -> Result<(), EditError> {
    for edit in edits {
        match edit {
            HashEdit::Replace { pos, end, .. } => {
                if let Some(end) = end {
                    if pos.line > end.line {
                        return Err(EditError::BadEdit {
                            reason: format!(
                                "replace range start {} is after end {}",
                                pos.line, end.line
                            ),
                        });
                    }
                }
            }
            HashEdit::Append { pos, lines } => {
                if pos.is_some() && lines.is_empty() {
                    return Err(EditError::BadEdit {
                        reason: "append requires at least one line".to_string(),
                    });
                }
            }
            HashEdit::Prepend { pos, lines } => {
                if pos.is_some() && lines.is_empty() {
                    return Err(EditError::BadEdit {
                        reason: "prepend requires at least one line".to_string(),
                    });
                }
            }
            HashEdit::ReplaceText { .. } => {}
        }
    }
    Ok(())
}

fn check_tag(tag: &LineTag, lines: &[String], mismatches: &mut Vec<Mismatch>) -> Result<(), EditError> {
    if tag.line == 0 || tag.line > lines.len() {
        return Err(EditError::LineOutOfRange {
            line: tag.line,
            max: lines.len(),
        });
    }
    let actual = codec::hash(tag.line, &lines[tag.line - 1]);
    if actual != tag.hash {
        mismatches.push(Mismatch {
            line: tag.line,
            expected_hash: tag.hash.clone(),
            actual_hash: actual,
        });
    }
    Ok(())
}

fn validate_hashes(edits: &[HashEdit], lines: &[String]) -> Result<(), EditError> {
    let mut mismatches = Vec::new();

    for edit in edits {
        match edit {
            HashEdit::Replace { pos, end, .. } => {
                check_tag(pos, lines, &mut mismatches)?;
                if let Some(end) = end {
                    check_tag(end, lines, &mut mismatches)?;
                }
            }
            HashEdit::Append { pos: Some(pos), .. } => {
                check_tag(pos, lines, &mut mismatches)?;
            }
            HashEdit::Prepend { pos: Some(pos), .. } => {
                check_tag(pos, lines, &mut mismatches)?;
            }
            HashEdit::Append { pos: None, .. }
            | HashEdit::Prepend { pos: None, .. }
            | HashEdit::ReplaceText { .. } => {}
        }
    }

    if mismatches.is_empty() {
        return Ok(());
    }

    let mut sorted_lines: Vec<usize> = mismatches.iter().map(|m| m.line).collect();
    sorted_lines.sort_unstable();
    sorted_lines.dedup();

    let context = render_context(lines, &sorted_lines);
    let remaps = mismatches
        .iter()
        .map(|m| {
            (
                format!("{}#{}", m.line, m.expected_hash),
                format!("{}#{}", m.line, m.actual_hash),
            )
        })
        .collect();

    Err(EditError::HashMismatch(MismatchReport {
        mismatches,
        context,
        remaps,
    }))
}

fn render_context(lines: &[String], mismatched_lines: &[usize]) -> String {
    const RADIUS: usize = 2;
    let mut shown: Vec<usize> = Vec::new();
    for &line in mismatched_lines {
        let start = line.saturating_sub(RADIUS).max(1);
        let end = (line + RADIUS).min(lines.len());
        for l in start..=end {
            if !shown.contains(&l) {
                shown.push(l);
            }
        }
    }
    shown.sort_unstable();

    let mut out = String::new();
    let mut prev: Option<usize> = None;
    for &l in &shown {
        if let Some(p) = prev {
            if l > p + 1 {
                out.push_str("…\n");
            }
        }
        let marker = if mismatched_lines.contains(&l) { ">>>" } else { "   " };
        out.push_str(&format!("{marker} {}\n", codec::format_row(l, &lines[l - 1])));
        prev = Some(l);
    }
    out
}

fn dedupe(edits: Vec<HashEdit>) -> (Vec<HashEdit>, usize) {
    let mut kept: Vec<HashEdit> = Vec::new();
    let mut duplicate_count = 0usize;

    for edit in edits {
        if kept.iter().any(|existing| is_duplicate(existing, &edit)) {
            duplicate_count += 1;
            continue;
        }
        kept.push(edit);
    }

    (kept, duplicate_count)
}

fn is_duplicate(a: &HashEdit, b: &HashEdit) -> bool {
    match (a, b) {
        (
            HashEdit::Replace { pos: p1, end: e1, lines: l1 },
            HashEdit::Replace { pos: p2, end: e2, lines: l2 },
        ) => p1 == p2 && e1 == e2 && l1 == l2,
        (HashEdit::Append { pos: p1, lines: l1 }, HashEdit::Append { pos: p2, lines: l2 }) => {
            p1 == p2 && l1 == l2
        }
        (HashEdit::Prepend { pos: p1, lines: l1 }, HashEdit::Prepend { pos: p2, lines: l2 }) => {
            p1 == p2 && l1 == l2
        }
        (
            HashEdit::ReplaceText { old_text: o1, new_text: n1, all: a1 },
            HashEdit::ReplaceText { old_text: o2, new_text: n2, all: a2 },
        ) => o1 == o2 && n1 == n2 && a1 == a2,
        _ => false,
    }
}

fn sort_key(edit: &HashEdit, line_count: usize) -> (i64, TieRank) {
    match edit {
        HashEdit::Replace { pos, .. } => (pos.line as i64, TieRank::Replace),
        HashEdit::Append { pos: Some(pos), .. } => (pos.line as i64, TieRank::Append),
        HashEdit::Append { pos: None, .. } => ((line_count + 1) as i64, TieRank::Append),
        HashEdit::Prepend { pos: Some(pos), .. } => (pos.line as i64 - 1, TieRank::Prepend),
        HashEdit::Prepend { pos: None, .. } => (0, TieRank::Prepend),
        HashEdit::ReplaceText { .. } => (i64::MIN, TieRank::Replace),
    }
}

/// Three leniency passes, in order: undo an accidental reflow of a single
/// removed line, restore indentation stripped from the first replacement
/// line, then strip boundary lines the caller echoed back unchanged.
fn autocorrect_replace(
    lines: &[String],
    start_idx: usize,
    end_idx: usize,
    mut payload: Vec<String>,
) -> Vec<String> {
    if let Some(collapsed) = undo_line_reflow(&lines[start_idx..=end_idx], &payload) {
        return collapsed;
    }
    if let (Some(first_new), Some(first_old)) = (payload.first_mut(), lines.get(start_idx)) {
        restore_indentation(first_new, first_old);
    }
    strip_boundary_echo(lines, start_idx, end_idx, &mut payload);
    payload
}

/// If a single removed line was split across several payload lines but the
/// words are otherwise unchanged, collapse back to the original line rather
/// than leaving the file with a spurious line-wrap.
fn undo_line_reflow(removed: &[String], payload: &[String]) -> Option<Vec<String>> {
    if removed.len() != 1 || payload.len() <= 1 {
        return None;
    }
    let removed_words: Vec<&str> = removed[0].split_whitespace().collect();
    let payload_words: Vec<&str> = payload.iter().flat_map(|l| l.split_whitespace()).collect();
    if removed_words == payload_words {
        Some(removed.to_vec())
    } else {
        None
    }
}

fn autocorrect_insert(lines: &[String], insert_at: usize, mut payload: Vec<String>) -> Vec<String> {
    if insert_at > 0 {
        if let (Some(first_new), Some(anchor_line)) = (payload.first_mut(), lines.get(insert_at.saturating_sub(1))) {
            restore_indentation(first_new, anchor_line);
        }
    }
    payload
}

fn restore_indentation(new_line: &mut String, reference_line: &str) {
    let reference_indent: String = reference_line
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect();
    let new_indent: String = new_line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
    if new_indent.len() < reference_indent.len() && !new_line.trim().is_empty() {
        *new_line = format!("{reference_indent}{}", new_line.trim_start());
    }
}

fn strip_boundary_echo(lines: &[String], start_idx: usize, end_idx: usize, payload: &mut Vec<String>) {
    let removed_len = end_idx - start_idx + 1;
    if payload.len() <= removed_len {
        return;
    }

    if let Some(preceding) = start_idx.checked_sub(1).and_then(|i| lines.get(i)) {
        if payload.first() == Some(preceding) {
            payload.remove(0);
        }
    }
    if let Some(following) = lines.get(end_idx + 1) {
        if payload.last() == Some(following) && payload.len() > removed_len {
            payload.pop();
        }
    }
}
