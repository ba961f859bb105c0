use std::path::PathBuf;

use thiserror::Error;

/// A line whose hash no longer matches the caller-supplied anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub line: usize,
    pub expected_hash: String,
    pub actual_hash: String,
}

/// Everything the Hashline engine needs to report a batch of stale anchors
/// and let the caller retry blindly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchReport {
    pub mismatches: Vec<Mismatch>,
    pub context: String,
    pub remaps: Vec<(String, String)>,
}

impl MismatchReport {
    pub fn message(&self) -> String {
        let n = self.mismatches.len();
        let verb = if n == 1 { "has" } else { "have" };
        let noun = if n == 1 { "line" } else { "lines" };
        format!("{n} {noun} {verb} changed since last read")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Path rejected: {reason}")]
    PathRejected { reason: String },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("Not a regular file: {}", path.display())]
    NotRegularFile { path: PathBuf },

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Search pattern not found in file{}", suggestion.as_ref().map(|s| format!(". {s}")).unwrap_or_default())]
    NeedleNotFound { suggestion: Option<String> },

    #[error("Search pattern found {count} occurrences; it must be unique. Add more surrounding context to make it unique.")]
    NeedleAmbiguous { count: usize },

    #[error("No change: replacement content is identical to the original")]
    NoChange,

    #[error("{}", .0.message())]
    HashMismatch(MismatchReport),

    #[error("Line {line} is out of range (file has {max} lines)")]
    LineOutOfRange { line: usize, max: usize },

    #[error("Invalid edit: {reason}")]
    BadEdit { reason: String },

    #[error("Could not find the hunk context in the file{}", suggestion.as_ref().map(|s| format!(". {s}")).unwrap_or_default())]
    ContextNotFound { suggestion: Option<String> },

    #[error("Failed to parse patch at line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("Operation aborted")]
    OperationAborted,

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl EditError {
    pub fn io(err: &std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
