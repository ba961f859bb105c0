use serde_json::Value;

/// The `{content, details}` shape every tool call returns on success, per
/// the external interface contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub content: String,
    pub details: Value,
}

impl ToolCallResult {
    pub fn new(content: impl Into<String>, details: Value) -> Self {
        Self {
            content: content.into(),
            details,
        }
    }
}

/// A tool callable by name with JSON arguments, returning either a result
/// or a single-line error message. Errors are rendered from `EditError`
/// (plus structured `details` where the caller needs them to retry, e.g.
/// `HashMismatch`) by each tool's `call` implementation.
#[async_trait::async_trait(?Send)]
pub trait ToolExecutor {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn call(&self, arguments: Value) -> Result<ToolCallResult, String>;
}
