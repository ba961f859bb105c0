use std::path::PathBuf;

use serde_json::{json, Value};

use crate::abort::AbortSignal;
use crate::config::EngineConfig;
use crate::engines::patch::{self, parser};
use crate::error::EditError;
use crate::path_guard::PathGuard;
use crate::tools::r#trait::{ToolCallResult, ToolExecutor};

/// Wraps `PatchParser`/`PatchPlanner` as the `patch` tool call: `{patch_text}`.
pub struct PatchTool {
    cwd: PathBuf,
    workspace_root: PathBuf,
    config: EngineConfig,
}

impl PatchTool {
    pub fn new(cwd: PathBuf, workspace_root: PathBuf, config: EngineConfig) -> Self {
        Self {
            cwd,
            workspace_root,
            config,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl ToolExecutor for PatchTool {
    fn name(&self) -> &str {
        "patch"
    }

    fn description(&self) -> &str {
        "Apply a multi-file Add/Delete/Update patch envelope with exact-match hunk resolution."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "patch_text": { "type": "string" }
            },
            "required": ["patch_text"]
        })
    }

    async fn call(&self, arguments: Value) -> Result<ToolCallResult, String> {
        let patch_text = arguments
            .get("patch_text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EditError::BadEdit {
                reason: "missing required field: patch_text".to_string(),
            }.to_string())?;

        let parsed = parser::parse(patch_text).map_err(|e| e.to_string())?;
        let guard = PathGuard::new(self.cwd.clone(), self.workspace_root.clone(), &self.config);
        let abort = AbortSignal::new();

        let outcome = patch::apply(&parsed, &guard, self.config.max_file_size, &abort)
            .await
            .map_err(|e| e.to_string())?;

        let files: Vec<Value> = outcome
            .changes
            .iter()
            .map(|c| {
                json!({
                    "path": c.path,
                    "moved_to": c.moved_to,
                    "diff": c.diff.diff,
                    "additions": c.additions,
                    "removals": c.removals,
                })
            })
            .collect();

        Ok(ToolCallResult::new(
            format!("Applied patch to {} file(s)", outcome.changes.len()),
            json!({ "files": files }),
        ))
    }
}
