//! A set of built-in tools that models can use.

mod edit_file;
mod finish;
mod list_files;
mod project_template;
mod read_file;
mod shell;

use std::path::{Path, PathBuf};

pub use edit_file::EditFileTool;
pub use finish::{AttemptCompletionTool, FinishTool};
pub use list_files::ListFilesTool;
pub use project_template::ProjectTemplateTool;
pub use read_file::ReadFileTool;
pub use shell::{ShellSession, ShellTool};

/// Names of all built-in tools.
pub const TOOL_NAMES: &[&str] = &[
    "shell",
    "read_file",
    "list_files",
    "edit_file",
    "create_project_template",
    "finish",
    "attempt_completion",
];

/// Resolves `path` against the session's working directory unless it is
/// already absolute.
fn resolve_path(session: &ShellSession, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_owned()
    } else {
        session.current_dir().join(path)
    }
}
