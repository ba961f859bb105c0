use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use substrate_core::config::EngineConfig;
use substrate_core::tools::{EditTool, HashlineEditTool, MultiEditTool, PatchTool, ToolExecutor};

#[derive(Parser, Debug)]
#[command(name = "substrate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "File-editing substrate: anchor, hashline, and patch engines")]
struct Args {
    /// Directory edits are resolved relative to.
    #[arg(long, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Workspace root (controls where MEMORY.md / memory/ redirect to).
    #[arg(long, value_name = "DIR")]
    workspace_root: Option<PathBuf>,

    /// Allow resolved paths to escape the working root.
    #[arg(long)]
    allow_path_traversal: bool,

    /// Allow the resolved path (or an ancestor) to be a symlink.
    #[arg(long)]
    allow_symlinks: bool,

    /// Run the Hashline engine's autocorrect passes before applying edits.
    #[arg(long)]
    hashline_autocorrect: bool,

    /// Maximum accepted file size, in bytes.
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    max_file_size: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace a unique occurrence of old_text with new_text.
    Edit {
        path: String,
        old_text: String,
        new_text: String,
    },
    /// Apply a JSON array of {old_text, new_text} edits in sequence.
    MultiEdit {
        path: String,
        /// JSON array: [{"old_text": "...", "new_text": "..."}, ...]
        edits_json: String,
    },
    /// Apply a JSON array of hash-anchored edit objects.
    HashlineEdit {
        path: String,
        /// JSON array of {op, pos, end, lines, old_text, new_text, all} objects.
        edits_json: String,
    },
    /// Apply an Add/Delete/Update patch envelope read from a file.
    Patch {
        /// Path to a file containing the patch text, or "-" for stdin.
        patch_file: String,
    },
}

fn setup_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn engine_config(args: &Args) -> EngineConfig {
    EngineConfig {
        allow_path_traversal: args.allow_path_traversal,
        allow_symlinks: args.allow_symlinks,
        hashline_autocorrect: args.hashline_autocorrect,
        max_file_size: args.max_file_size,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let args = Args::parse();

    let cwd = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let workspace_root = args.workspace_root.clone().unwrap_or_else(|| cwd.clone());
    let config = engine_config(&args);

    let result = match &args.command {
        Command::Edit {
            path,
            old_text,
            new_text,
        } => {
            let tool = EditTool::new(cwd, workspace_root, config);
            tool.call(json!({
                "path": path,
                "old_text": old_text,
                "new_text": new_text,
            }))
            .await
        }
        Command::MultiEdit { path, edits_json } => {
            let edits: serde_json::Value = serde_json::from_str(edits_json)
                .map_err(|e| anyhow!("invalid edits JSON: {e}"))?;
            let tool = MultiEditTool::new(cwd, workspace_root, config);
            tool.call(json!({ "path": path, "edits": edits })).await
        }
        Command::HashlineEdit { path, edits_json } => {
            let edits: serde_json::Value = serde_json::from_str(edits_json)
                .map_err(|e| anyhow!("invalid edits JSON: {e}"))?;
            let tool = HashlineEditTool::new(cwd, workspace_root, config);
            tool.call(json!({ "path": path, "edits": edits })).await
        }
        Command::Patch { patch_file } => {
            let patch_text = if patch_file == "-" {
                use std::io::Read;
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                std::fs::read_to_string(patch_file)?
            };
            let tool = PatchTool::new(cwd, workspace_root, config);
            tool.call(json!({ "patch_text": patch_text })).await
        }
    };

    match result {
        Ok(outcome) => {
            println!("{}", outcome.content);
            println!("{}", serde_json::to_string_pretty(&outcome.details)?);
            Ok(())
        }
        Err(message) => Err(anyhow!(message)),
    }
}
