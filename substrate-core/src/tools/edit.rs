use std::path::PathBuf;

use serde_json::{json, Value};

use crate::abort::AbortSignal;
use crate::config::EngineConfig;
use crate::engines::anchor;
use crate::error::EditError;
use crate::path_guard::PathGuard;
use crate::tools::r#trait::{ToolCallResult, ToolExecutor};

/// Wraps `AnchorEditor` as the `edit` tool call: `{path, old_text, new_text}`.
pub struct EditTool {
    cwd: PathBuf,
    workspace_root: PathBuf,
    config: EngineConfig,
}

impl EditTool {
    pub fn new(cwd: PathBuf, workspace_root: PathBuf, config: EngineConfig) -> Self {
        Self {
            cwd,
            workspace_root,
            config,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl ToolExecutor for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn description(&self) -> &str {
        "Replace a unique occurrence of old_text with new_text in a file."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "old_text": { "type": "string" },
                "new_text": { "type": "string" }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<ToolCallResult, String> {
        let path = arguments
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EditError::BadEdit {
                reason: "missing required field: path".to_string(),
            }.to_string())?;
        let old_text = arguments
            .get("old_text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EditError::BadEdit {
                reason: "missing required field: old_text".to_string(),
            }.to_string())?;
        let new_text = arguments
            .get("new_text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EditError::BadEdit {
                reason: "missing required field: new_text".to_string(),
            }.to_string())?;

        let guard = PathGuard::new(self.cwd.clone(), self.workspace_root.clone(), &self.config);
        let resolved = guard.resolve(path).map_err(|e| e.to_string())?;
        let abort = AbortSignal::new();

        let outcome = anchor::edit_file(&resolved, old_text, new_text, self.config.max_file_size, &abort)
            .await
            .map_err(|e| e.to_string())?;

        Ok(ToolCallResult::new(
            outcome.summary,
            json!({
                "diff": outcome.diff.diff,
                "first_changed_line": outcome.diff.first_changed_line,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn edits_file_through_tool_call() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("f.txt"), "aaa\nbbb\nccc")
            .await
            .unwrap();

        let tool = EditTool::new(tmp.path().to_path_buf(), tmp.path().to_path_buf(), EngineConfig::default());
        let result = tool
            .call(json!({"path": "f.txt", "old_text": "bbb", "new_text": "BBB"}))
            .await
            .unwrap();

        assert_eq!(result.details["first_changed_line"], json!(2));
    }

    #[tokio::test]
    async fn missing_field_is_bad_edit() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = EditTool::new(tmp.path().to_path_buf(), tmp.path().to_path_buf(), EngineConfig::default());
        let err = tool.call(json!({"path": "f.txt"})).await.unwrap_err();
        assert!(err.contains("old_text"));
    }
}
