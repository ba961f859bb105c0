use std::path::PathBuf;

use serde_json::{json, Value};

use crate::abort::AbortSignal;
use crate::config::EngineConfig;
use crate::engines::hashline::codec;
use crate::engines::hashline::{self, HashEdit};
use crate::error::EditError;
use crate::path_guard::PathGuard;
use crate::tools::r#trait::{ToolCallResult, ToolExecutor};

/// Wraps `HashlineEngine` as the `hashline_edit` tool call: `{path, edits: [{op, ...}, ...]}`.
pub struct HashlineEditTool {
    cwd: PathBuf,
    workspace_root: PathBuf,
    config: EngineConfig,
}

impl HashlineEditTool {
    pub fn new(cwd: PathBuf, workspace_root: PathBuf, config: EngineConfig) -> Self {
        Self {
            cwd,
            workspace_root,
            config,
        }
    }
}

fn string_list(entry: &Value, field: &str) -> Result<Vec<String>, EditError> {
    entry
        .get(field)
        .and_then(|v| v.as_array())
        .ok_or_else(|| EditError::BadEdit {
            reason: format!("edit missing {field}"),
        })?
        .iter()
        .map(|v| {
            v.as_str().map(|s| s.to_string()).ok_or_else(|| EditError::BadEdit {
                reason: format!("{field} must be an array of strings"),
            })
        })
        .collect()
}

fn optional_tag(entry: &Value, field: &str) -> Result<Option<codec::LineTag>, EditError> {
    match entry.get(field).and_then(|v| v.as_str()) {
        Some(raw) => Ok(Some(codec::parse_tag(raw)?)),
        None => Ok(None),
    }
}

fn required_tag(entry: &Value, field: &str) -> Result<codec::LineTag, EditError> {
    let raw = entry.get(field).and_then(|v| v.as_str()).ok_or_else(|| EditError::BadEdit {
        reason: format!("edit missing {field}"),
    })?;
    codec::parse_tag(raw)
}

fn parse_edit(entry: &Value) -> Result<HashEdit, EditError> {
    let op = entry.get("op").and_then(|v| v.as_str()).ok_or_else(|| EditError::BadEdit {
        reason: "edit missing op".to_string(),
    })?;

    match op {
        "replace" => Ok(HashEdit::Replace {
            pos: required_tag(entry, "pos")?,
            end: optional_tag(entry, "end")?,
            lines: string_list(entry, "lines")?,
        }),
        "append" => Ok(HashEdit::Append {
            pos: optional_tag(entry, "pos")?,
            lines: string_list(entry, "lines")?,
        }),
        "prepend" => Ok(HashEdit::Prepend {
            pos: optional_tag(entry, "pos")?,
            lines: string_list(entry, "lines")?,
        }),
        "replaceText" => {
            let old_text = entry
                .get("old_text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| EditError::BadEdit {
                    reason: "replaceText edit missing old_text".to_string(),
                })?;
            let new_text = entry
                .get("new_text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| EditError::BadEdit {
                    reason: "replaceText edit missing new_text".to_string(),
                })?;
            let all = entry.get("all").and_then(|v| v.as_bool()).unwrap_or(false);
            Ok(HashEdit::ReplaceText {
                old_text: old_text.to_string(),
                new_text: new_text.to_string(),
                all,
            })
        }
        other => Err(EditError::BadEdit {
            reason: format!("unknown hashline op: {other:?}"),
        }),
    }
}

fn parse_edits(value: &Value) -> Result<Vec<HashEdit>, EditError> {
    let array = value.as_array().ok_or_else(|| EditError::BadEdit {
        reason: "edits must be an array".to_string(),
    })?;
    array.iter().map(parse_edit).collect()
}

fn mismatch_details(err: &EditError) -> Option<Value> {
    match err {
        EditError::HashMismatch(report) => Some(json!({
            "mismatches": report.mismatches.iter().map(|m| json!({
                "line": m.line,
                "expected_hash": m.expected_hash,
                "actual_hash": m.actual_hash,
            })).collect::<Vec<_>>(),
            "remaps": report.remaps,
            "message": report.message(),
        })),
        _ => None,
    }
}

#[async_trait::async_trait(?Send)]
impl ToolExecutor for HashlineEditTool {
    fn name(&self) -> &str {
        "hashline_edit"
    }

    fn description(&self) -> &str {
        "Apply a batch of hash-anchored line edits (replace/append/prepend/replaceText) to a file."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "edits": { "type": "array", "items": { "type": "object" } }
            },
            "required": ["path", "edits"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<ToolCallResult, String> {
        let path = arguments
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EditError::BadEdit {
                reason: "missing required field: path".to_string(),
            }.to_string())?;
        let edits_value = arguments.get("edits").ok_or_else(|| {
            EditError::BadEdit {
                reason: "missing required field: edits".to_string(),
            }
            .to_string()
        })?;
        let edits = parse_edits(edits_value).map_err(|e| e.to_string())?;

        let guard = PathGuard::new(self.cwd.clone(), self.workspace_root.clone(), &self.config);
        let resolved = guard.resolve(path).map_err(|e| e.to_string())?;
        let abort = AbortSignal::new();

        let outcome = hashline::apply_edits(
            &resolved,
            edits,
            self.config.max_file_size,
            self.config.hashline_autocorrect,
            &abort,
        )
        .await
        .map_err(|e| match mismatch_details(&e) {
            Some(details) => format!("{e}\n{details}"),
            None => e.to_string(),
        })?;

        Ok(ToolCallResult::new(
            format!("Edited {path}"),
            json!({
                "diff": outcome.diff.diff,
                "first_changed_line": outcome.diff.first_changed_line,
                "noop_edits": outcome.noop_edits,
                "deduplicated_edits": outcome.deduplicated_edits,
            }),
        ))
    }
}
