use similar::TextDiff;

const CONTEXT_RADIUS: usize = 3;

/// Unified diff plus the first changed line, as returned in every
/// successful edit's `details`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub diff: String,
    pub first_changed_line: Option<usize>,
}

/// Build a unified diff between two whole-file contents (LF-joined text,
/// no trailing-newline assumptions) and locate the first differing line.
pub fn build(old: &str, new: &str) -> DiffResult {
    let text_diff = TextDiff::from_lines(old, new);
    let mut unified = text_diff.unified_diff();
    let diff = unified.context_radius(CONTEXT_RADIUS).to_string();

    let first_changed_line = first_changed_line(old, new);

    DiffResult {
        diff,
        first_changed_line,
    }
}

fn first_changed_line(old: &str, new: &str) -> Option<usize> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();

    let min_len = old_lines.len().min(new_lines.len());
    for i in 0..min_len {
        if old_lines[i] != new_lines[i] {
            return Some(i + 1);
        }
    }
    if old_lines.len() != new_lines.len() {
        return Some(min_len + 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_change_has_no_first_changed_line() {
        let result = build("a\nb\nc", "a\nb\nc");
        assert_eq!(result.first_changed_line, None);
    }

    #[test]
    fn reports_first_differing_line() {
        let result = build("a\nb\nc", "a\nB\nc");
        assert_eq!(result.first_changed_line, Some(2));
    }

    #[test]
    fn appended_line_reports_position_past_common_prefix() {
        let result = build("a\nb", "a\nb\nc");
        assert_eq!(result.first_changed_line, Some(3));
    }

    #[test]
    fn unified_diff_contains_plus_minus_markers() {
        let result = build("a\nb\nc", "a\nB\nc");
        assert!(result.diff.contains("-b"));
        assert!(result.diff.contains("+B"));
    }
}
