pub mod codec;
pub mod engine;

pub use codec::LineTag;
pub use engine::{apply_edits, HashEdit, HashlineOutcome};
