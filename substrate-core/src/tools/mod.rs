pub mod edit;
pub mod hashline_edit;
pub mod multi_edit;
pub mod patch_tool;
pub mod r#trait;

pub use edit::EditTool;
pub use hashline_edit::HashlineEditTool;
pub use multi_edit::MultiEditTool;
pub use patch_tool::PatchTool;
pub use r#trait::{ToolCallResult, ToolExecutor};
