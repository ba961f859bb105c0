use crate::error::EditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkLine {
    Context,
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub lines: Vec<(HunkLine, String)>,
}

impl Hunk {
    pub fn context_and_removed(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(kind, _)| !matches!(kind, HunkLine::Add))
            .map(|(_, text)| text.as_str())
            .collect()
    }

    pub fn context_and_added(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(kind, _)| !matches!(kind, HunkLine::Remove))
            .map(|(_, text)| text.as_str())
            .collect()
    }

    pub fn additions(&self) -> usize {
        self.lines
            .iter()
            .filter(|(k, _)| matches!(k, HunkLine::Add))
            .count()
    }

    pub fn removals(&self) -> usize {
        self.lines
            .iter()
            .filter(|(k, _)| matches!(k, HunkLine::Remove))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    AddFile { path: String, lines: Vec<String> },
    DeleteFile { path: String },
    UpdateFile {
        path: String,
        move_to: Option<String>,
        hunks: Vec<Hunk>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPatch {
    pub ops: Vec<PatchOp>,
}

const ADD_PREFIX: &str = "*** Add File: ";
const DELETE_PREFIX: &str = "*** Delete File: ";
const UPDATE_PREFIX: &str = "*** Update File: ";
const MOVE_PREFIX: &str = "*** Move to: ";
const BEGIN_MARKER: &str = "*** Begin Patch";
const END_MARKER: &str = "*** End Patch";
const HUNK_MARKER: &str = "@@";

pub fn parse(patch_text: &str) -> Result<ParsedPatch, EditError> {
    let lines: Vec<&str> = patch_text.lines().collect();
    let mut ops = Vec::new();
    let mut i = 0;

    while i < lines.len() && (lines[i] == BEGIN_MARKER || lines[i].trim().is_empty()) {
        i += 1;
    }

    while i < lines.len() {
        let line = lines[i];

        if line == END_MARKER || line.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some(path) = line.strip_prefix(ADD_PREFIX) {
            let (body, next) = collect_add_body(&lines, i + 1);
            ops.push(PatchOp::AddFile {
                path: path.to_string(),
                lines: body,
            });
            i = next;
        } else if let Some(path) = line.strip_prefix(DELETE_PREFIX) {
            ops.push(PatchOp::DeleteFile {
                path: path.to_string(),
            });
            i += 1;
        } else if let Some(path) = line.strip_prefix(UPDATE_PREFIX) {
            let mut j = i + 1;
            let mut move_to = None;
            if j < lines.len() {
                if let Some(dest) = lines[j].strip_prefix(MOVE_PREFIX) {
                    move_to = Some(dest.to_string());
                    j += 1;
                }
            }
            let (hunks, next) = parse_hunks(&lines, j)?;
            ops.push(PatchOp::UpdateFile {
                path: path.to_string(),
                move_to,
                hunks,
            });
            i = next;
        } else {
            return Err(EditError::ParseError {
                line: i + 1,
                reason: format!("unrecognized patch directive: {line:?}"),
            });
        }
    }

    Ok(ParsedPatch { ops })
}

fn collect_add_body(lines: &[&str], mut i: usize) -> (Vec<String>, usize) {
    let mut body = Vec::new();
    while i < lines.len() && !is_op_header(lines[i]) {
        if let Some(rest) = lines[i].strip_prefix('+') {
            body.push(rest.to_string());
        }
        i += 1;
    }
    (body, i)
}

fn parse_hunks(lines: &[&str], mut i: usize) -> Result<(Vec<Hunk>, usize), EditError> {
    let mut hunks = Vec::new();

    while i < lines.len() && lines[i].starts_with(HUNK_MARKER) {
        i += 1;
        let mut hunk_lines = Vec::new();

        while i < lines.len() && !lines[i].starts_with(HUNK_MARKER) && !is_op_header(lines[i]) {
            let line = lines[i];
            if let Some(rest) = line.strip_prefix('+') {
                hunk_lines.push((HunkLine::Add, rest.to_string()));
            } else if let Some(rest) = line.strip_prefix('-') {
                hunk_lines.push((HunkLine::Remove, rest.to_string()));
            } else if let Some(rest) = line.strip_prefix(' ') {
                hunk_lines.push((HunkLine::Context, rest.to_string()));
            } else if line.is_empty() {
                hunk_lines.push((HunkLine::Context, String::new()));
            } else {
                return Err(EditError::ParseError {
                    line: i + 1,
                    reason: format!("unrecognized hunk line prefix: {line:?}"),
                });
            }
            i += 1;
        }

        hunks.push(Hunk { lines: hunk_lines });
    }

    if hunks.is_empty() {
        return Err(EditError::ParseError {
            line: i + 1,
            reason: "Update File operation must contain at least one hunk".to_string(),
        });
    }

    Ok((hunks, i))
}

fn is_op_header(line: &str) -> bool {
    line.starts_with(ADD_PREFIX)
        || line.starts_with(DELETE_PREFIX)
        || line.starts_with(UPDATE_PREFIX)
        || line == END_MARKER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_file() {
        let patch = "*** Add File: new.txt\n+alpha\n+beta";
        let parsed = parse(patch).unwrap();
        assert_eq!(parsed.ops.len(), 1);
        match &parsed.ops[0] {
            PatchOp::AddFile { path, lines } => {
                assert_eq!(path, "new.txt");
                assert_eq!(lines, &vec!["alpha".to_string(), "beta".to_string()]);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn parses_delete_file() {
        let parsed = parse("*** Delete File: gone.txt").unwrap();
        assert_eq!(parsed.ops.len(), 1);
        assert!(matches!(&parsed.ops[0], PatchOp::DeleteFile { path } if path == "gone.txt"));
    }

    #[test]
    fn parses_update_file_with_single_hunk() {
        let patch = "*** Update File: existing.txt\n@@\n-original\n+modified";
        let parsed = parse(patch).unwrap();
        match &parsed.ops[0] {
            PatchOp::UpdateFile { path, move_to, hunks } => {
                assert_eq!(path, "existing.txt");
                assert!(move_to.is_none());
                assert_eq!(hunks.len(), 1);
                assert_eq!(hunks[0].additions(), 1);
                assert_eq!(hunks[0].removals(), 1);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn parses_update_file_with_move() {
        let patch = "*** Update File: old.txt\n*** Move to: new.txt\n@@\n-a\n+b";
        let parsed = parse(patch).unwrap();
        match &parsed.ops[0] {
            PatchOp::UpdateFile { move_to, .. } => {
                assert_eq!(move_to.as_deref(), Some("new.txt"));
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn parses_multiple_ops_with_envelope() {
        let patch = "*** Begin Patch\n*** Add File: a.txt\n+hi\n*** Delete File: b.txt\n*** End Patch";
        let parsed = parse(patch).unwrap();
        assert_eq!(parsed.ops.len(), 2);
    }

    #[test]
    fn empty_hunk_is_accepted_with_zero_changes() {
        let patch = "*** Update File: f.txt\n@@\n context only";
        let parsed = parse(patch).unwrap();
        match &parsed.ops[0] {
            PatchOp::UpdateFile { hunks, .. } => {
                assert_eq!(hunks[0].additions(), 0);
                assert_eq!(hunks[0].removals(), 0);
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[test]
    fn rejects_unrecognized_directive() {
        let err = parse("*** Something Weird: x").unwrap_err();
        assert!(matches!(err, EditError::ParseError { .. }));
    }

    #[test]
    fn update_without_hunk_is_parse_error() {
        let err = parse("*** Update File: f.txt").unwrap_err();
        assert!(matches!(err, EditError::ParseError { .. }));
    }
}
