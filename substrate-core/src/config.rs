use serde::{Deserialize, Serialize};

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

/// Per-invocation knobs for the editing engines. Always threaded explicitly
/// into tool constructors; never read from a global or thread-local.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Allow resolved paths to fall outside the working root.
    #[serde(default)]
    pub allow_path_traversal: bool,

    /// Allow the resolved path (or an ancestor within the sandbox) to be a
    /// symlink.
    #[serde(default)]
    pub allow_symlinks: bool,

    /// Run the Hashline engine's autocorrect passes (boundary-echo
    /// stripping, indentation restoration, reflow collapsing) before
    /// applying each edit.
    #[serde(default)]
    pub hashline_autocorrect: bool,

    /// Maximum size, in bytes, of a file accepted for read/edit.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_path_traversal: false,
            allow_symlinks: false,
            hashline_autocorrect: false,
            max_file_size: default_max_file_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec() {
        let cfg = EngineConfig::default();
        assert!(!cfg.allow_path_traversal);
        assert!(!cfg.allow_symlinks);
        assert!(!cfg.hashline_autocorrect);
        assert_eq!(cfg.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"allow_symlinks": true}"#).unwrap();
        assert!(cfg.allow_symlinks);
        assert!(!cfg.allow_path_traversal);
        assert_eq!(cfg.max_file_size, 10 * 1024 * 1024);
    }
}
