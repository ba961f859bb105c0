use std::path::{Component, Path, PathBuf};

use crate::config::EngineConfig;
use crate::error::EditError;

const MAX_PATH_LEN: usize = 4096;
const MEMORY_FILE: &str = "MEMORY.md";
const MEMORY_DIR_PREFIX: &str = "memory/";

/// Resolves and sandboxes a caller-supplied path before any I/O touches it.
///
/// Mirrors the resolve-then-validate shape of `file::resolver::Resolver`,
/// but works against a single `cwd`/`workspace_root` pair instead of a
/// virtual multi-workspace filesystem, per the editing substrate's simpler
/// sandboxing contract.
#[derive(Debug, Clone)]
pub struct PathGuard {
    cwd: PathBuf,
    workspace_root: PathBuf,
    allow_path_traversal: bool,
    allow_symlinks: bool,
}

impl PathGuard {
    pub fn new(cwd: PathBuf, workspace_root: PathBuf, config: &EngineConfig) -> Self {
        Self {
            cwd,
            workspace_root,
            allow_path_traversal: config.allow_path_traversal,
            allow_symlinks: config.allow_symlinks,
        }
    }

    /// Resolve `raw_path` to a real filesystem path, applying every rule in
    /// order and returning the first failure.
    pub fn resolve(&self, raw_path: &str) -> Result<PathBuf, EditError> {
        if raw_path.is_empty() {
            return Err(reject("path is empty"));
        }
        if raw_path.chars().count() > MAX_PATH_LEN {
            return Err(reject(format!(
                "path exceeds maximum length of {MAX_PATH_LEN}"
            )));
        }
        if raw_path.contains('\0') {
            return Err(reject("path contains a null byte"));
        }
        if raw_path.contains("//") {
            return Err(reject("path contains an empty segment"));
        }

        let (base, candidate, force_cwd_root) = self.apply_memory_redirection(raw_path);

        let expanded = expand_tilde(&candidate);

        let joined = if Path::new(&expanded).is_absolute() {
            PathBuf::from(&expanded)
        } else {
            base.join(&expanded)
        };

        let normalized = normalize_lexically(&joined);

        let is_caller_absolute = Path::new(raw_path).is_absolute() && !force_cwd_root;

        if !self.allow_path_traversal && !is_caller_absolute {
            let root = if force_cwd_root {
                &self.cwd
            } else if raw_path.starts_with(MEMORY_DIR_PREFIX) || raw_path == MEMORY_FILE {
                &self.workspace_root
            } else {
                &self.cwd
            };
            let normalized_root = normalize_lexically(root);
            if !normalized.starts_with(&normalized_root) {
                return Err(reject("Path traversal not allowed"));
            }
        }

        if !self.allow_symlinks {
            self.reject_symlinks(&normalized)?;
        }

        Ok(normalized)
    }

    /// Implements the `memory/` and `MEMORY.md` redirection rule: unless
    /// the caller opts out with a leading `./`, those paths resolve under
    /// `workspace_root` instead of `cwd`.
    fn apply_memory_redirection<'a>(&'a self, raw_path: &'a str) -> (&'a Path, &'a str, bool) {
        if let Some(rest) = raw_path.strip_prefix("./") {
            return (&self.cwd, rest, true);
        }
        if raw_path == MEMORY_FILE || raw_path.starts_with(MEMORY_DIR_PREFIX) {
            return (&self.workspace_root, raw_path, false);
        }
        (&self.cwd, raw_path, false)
    }

    fn reject_symlinks(&self, path: &Path) -> Result<(), EditError> {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            if let Ok(metadata) = std::fs::symlink_metadata(&current) {
                if metadata.file_type().is_symlink() {
                    return Err(reject(format!(
                        "symlink not allowed: {}",
                        current.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn reject(reason: impl Into<String>) -> EditError {
    EditError::PathRejected {
        reason: reason.into(),
    }
}

fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

/// Collapse `.` and `..` components without touching the filesystem, so
/// this works for paths that do not yet exist (e.g. `Add File` targets).
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
