use std::env;
use std::path::{Component, Path, PathBuf};

use agenthub_core::tool::{Error as ToolError, Tool, ToolResult};
use glob::{MatchOptions, glob_with};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::task::spawn_blocking;

use super::{ShellSession, resolve_path};

const FILE_LIMIT: usize = 250;

/// Directory names that are never descended into.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "env",
    "venv",
    "target",
    ".target",
    "build",
    "dist",
    "out",
    "bundle",
    "vendor",
    "tmp",
    "temp",
    "deps",
    "pkg",
];

#[derive(Deserialize, JsonSchema)]
pub struct ListFilesParameters {
    #[schemars(
        description = "Directory to list, relative to the current directory or absolute."
    )]
    directory_path: String,
    #[schemars(
        description = "Whether to list files recursively, default to false."
    )]
    #[serde(default)]
    recursive: bool,
}

/// A tool for listing files in a directory.
pub struct ListFilesTool {
    session: ShellSession,
    parameter_schema: Value,
}

impl ListFilesTool {
    /// Creates a new list files tool bound to `session`.
    #[inline]
    pub fn new(session: ShellSession) -> Self {
        ListFilesTool {
            session,
            parameter_schema: schema_for!(ListFilesParameters).to_value(),
        }
    }
}

impl Tool for ListFilesTool {
    type Input = ListFilesParameters;

    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        r#"
Lists files and directories within the given directory.
Set `recursive` to include nested entries. Dependency and build directories like `node_modules` or `target` are skipped, and hidden directories are not descended into."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ListFilesParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let dir = resolve_path(&self.session, &input.directory_path);
        async move {
            spawn_blocking(move || list_files(&dir, input.recursive))
                .await
                .map_err(|_| {
                    ToolError::execution_error()
                        .with_reason("failed to list files")
                })?
        }
    }
}

fn is_protected(dir: &Path) -> bool {
    if dir.parent().is_none() {
        return true;
    }
    env::var_os("HOME").is_some_and(|home| Path::new(&home) == dir)
}

fn is_ignored(rel_path: &Path) -> bool {
    let components: Vec<_> = rel_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();
    let Some((last, parents)) = components.split_last() else {
        return false;
    };
    IGNORED_DIRS.contains(last)
        || parents
            .iter()
            .any(|name| name.starts_with('.') || IGNORED_DIRS.contains(name))
}

fn list_files(dir: &Path, recursive: bool) -> ToolResult {
    let dir = dir.canonicalize().map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("cannot access {}", dir.display()))
            .with_source(err)
    })?;
    if !dir.is_dir() {
        return Err(ToolError::invalid_input()
            .with_reason(format!("{} is not a directory", dir.display())));
    }
    if is_protected(&dir) {
        return Err(ToolError::invalid_input().with_reason(format!(
            "refusing to list {}, choose a more specific directory",
            dir.display()
        )));
    }

    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = if recursive {
        format!("{escaped}/**/*")
    } else {
        format!("{escaped}/*")
    };
    let options = MatchOptions {
        require_literal_leading_dot: false,
        ..Default::default()
    };
    let paths = glob_with(&pattern, options).map_err(|err| {
        ToolError::execution_error()
            .with_reason("invalid directory path")
            .with_source(err)
    })?;

    let mut entries: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter_map(|path| path.strip_prefix(&dir).ok().map(Path::to_owned))
        .filter(|rel_path| !is_ignored(rel_path))
        .collect();
    entries.sort();

    if entries.is_empty() {
        return Ok("No files found.".to_owned());
    }
    let truncated = entries.len() > FILE_LIMIT;
    entries.truncate(FILE_LIMIT);

    let mut result = String::new();
    for entry in &entries {
        let suffix = if dir.join(entry).is_dir() { "/" } else { "" };
        result.push_str(&format!("- {}{suffix}\n", entry.display()));
    }
    if truncated {
        result.push_str(&format!(
            "\nNote: File limit ({FILE_LIMIT}) reached. Some files may not be shown.\n"
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn fixture(name: &str) -> PathBuf {
        let root = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        fs::write(root.join("src/main.rs"), "").unwrap();
        fs::write(root.join("src/nested/lib.rs"), "").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();
        fs::write(root.join(".git/HEAD"), "").unwrap();
        root
    }

    #[test]
    fn test_list_top_level() {
        let root = fixture("agenthub-list-files-top");
        let result = list_files(&root, false).unwrap();
        assert_eq!(result, "- .git/\n- README.md\n- src/\n");
    }

    #[test]
    fn test_list_recursive() {
        let root = fixture("agenthub-list-files-recursive");
        let result = list_files(&root, true).unwrap();
        assert_eq!(
            result,
            "- .git/\n- README.md\n- src/\n- src/main.rs\n- src/nested/\n- src/nested/lib.rs\n"
        );
    }

    #[test]
    fn test_empty_directory() {
        let root = env::temp_dir().join("agenthub-list-files-empty");
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        assert_eq!(list_files(&root, true).unwrap(), "No files found.");
    }

    #[test]
    fn test_refuses_root() {
        assert!(list_files(Path::new("/"), false).is_err());
    }

    #[test]
    fn test_is_ignored() {
        assert!(is_ignored(Path::new("node_modules")));
        assert!(is_ignored(Path::new("node_modules/a.js")));
        assert!(is_ignored(Path::new(".git/HEAD")));
        assert!(!is_ignored(Path::new(".git")));
        assert!(!is_ignored(Path::new("src/main.rs")));
    }
}
