use std::path::PathBuf;

use serde_json::{json, Value};

use crate::abort::AbortSignal;
use crate::config::EngineConfig;
use crate::engines::multi::{self, TextEdit};
use crate::error::EditError;
use crate::path_guard::PathGuard;
use crate::tools::r#trait::{ToolCallResult, ToolExecutor};

/// Wraps `MultiEditor` as the `multi_edit` tool call: `{path, edits: [{old_text, new_text}, ...]}`.
pub struct MultiEditTool {
    cwd: PathBuf,
    workspace_root: PathBuf,
    config: EngineConfig,
}

impl MultiEditTool {
    pub fn new(cwd: PathBuf, workspace_root: PathBuf, config: EngineConfig) -> Self {
        Self {
            cwd,
            workspace_root,
            config,
        }
    }
}

fn parse_edits(value: &Value) -> Result<Vec<TextEdit>, EditError> {
    let array = value.as_array().ok_or_else(|| EditError::BadEdit {
        reason: "edits must be an array".to_string(),
    })?;

    array
        .iter()
        .map(|entry| {
            let old_text = entry
                .get("old_text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| EditError::BadEdit {
                    reason: "edit missing old_text".to_string(),
                })?;
            let new_text = entry
                .get("new_text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| EditError::BadEdit {
                    reason: "edit missing new_text".to_string(),
                })?;
            Ok(TextEdit {
                old_text: old_text.to_string(),
                new_text: new_text.to_string(),
            })
        })
        .collect()
}

#[async_trait::async_trait(?Send)]
impl ToolExecutor for MultiEditTool {
    fn name(&self) -> &str {
        "multi_edit"
    }

    fn description(&self) -> &str {
        "Apply a sequence of anchor edits to a file, each against the content left by the previous one."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "edits": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "old_text": { "type": "string" },
                            "new_text": { "type": "string" }
                        },
                        "required": ["old_text", "new_text"]
                    }
                }
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

        let outcome = multi::edit_file(&resolved, &edits, self.config.max_file_size, &abort)
            .await
            .map_err(|e| e.to_string())?;

        let per_edit: Vec<Value> = outcome
            .results
            .iter()
            .map(|r| json!({ "diff": r.diff, "first_changed_line": r.first_changed_line }))
            .collect();

        Ok(ToolCallResult::new(
            format!("Applied {} edit(s) to {}", outcome.results.len(), path),
            json!({
                "diff": outcome.overall_diff.diff,
                "first_changed_line": outcome.overall_diff.first_changed_line,
                "results": per_edit,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn applies_sequential_edits_through_tool_call() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("f.txt"), "aaa\nbbb")
            .await
            .unwrap();

        let tool = MultiEditTool::new(tmp.path().to_path_buf(), tmp.path().to_path_buf(), EngineConfig::default());
        let result = tool
            .call(json!({
                "path": "f.txt",
                "edits": [
                    {"old_text": "aaa", "new_text": "AAA"},
                    {"old_text": "bbb", "new_text": "BBB"}
                ]
            }))
            .await
            .unwrap();

        assert_eq!(result.details["results"].as_array().unwrap().len(), 2);
    }
}
