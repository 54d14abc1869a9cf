use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use agenthub_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::fs;

use super::{ShellSession, resolve_path};

const SNIPPET_LINES: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EditCommand {
    /// Creates a new file with `file_text`.
    Create,
    /// Replaces the single occurrence of `old_str` with `new_str`.
    StrReplace,
    /// Inserts `new_str` after line `insert_line`.
    Insert,
}

#[derive(Deserialize, JsonSchema)]
pub struct EditFileParameters {
    #[schemars(description = "The edit to perform.")]
    command: EditCommand,
    #[schemars(
        description = "Path to the file, relative to the current directory or absolute."
    )]
    path: String,
    #[schemars(description = "Content of the new file, required by `create`.")]
    file_text: Option<String>,
    #[schemars(
        description = "Exact text to replace, required by `str_replace`. It must appear exactly once in the file."
    )]
    old_str: Option<String>,
    #[schemars(
        description = "Replacement text for `str_replace` (empty if omitted), or the text to insert for `insert`."
    )]
    new_str: Option<String>,
    #[schemars(
        description = "Line number after which to insert, required by `insert`. 0 inserts at the beginning."
    )]
    insert_line: Option<usize>,
}

/// A tool for creating and editing text files.
pub struct EditFileTool {
    session: ShellSession,
    parameter_schema: Value,
}

impl EditFileTool {
    /// Creates a new edit file tool bound to `session`.
    #[inline]
    pub fn new(session: ShellSession) -> Self {
        EditFileTool {
            session,
            parameter_schema: schema_for!(EditFileParameters).to_value(),
        }
    }
}

impl Tool for EditFileTool {
    type Input = EditFileParameters;

    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        r#"
Creates or edits text files.
* `create` writes `file_text` to a new file and fails if the file already exists.
* `str_replace` replaces `old_str` with `new_str`. `old_str` must match exactly one place in the file, including whitespace; include enough surrounding lines to make it unique.
* `insert` inserts `new_str` after line `insert_line`.
A snippet of the edited region is returned so that the change can be reviewed."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: EditFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let path = resolve_path(&self.session, &input.path);
        async move {
            match input.command {
                EditCommand::Create => {
                    let file_text = input.file_text.ok_or_else(|| {
                        missing_parameter("file_text", "create")
                    })?;
                    create_file(&path, &file_text).await
                }
                EditCommand::StrReplace => {
                    let old_str = input.old_str.ok_or_else(|| {
                        missing_parameter("old_str", "str_replace")
                    })?;
                    let new_str = input.new_str.unwrap_or_default();
                    replace_in_file(&path, &old_str, &new_str).await
                }
                EditCommand::Insert => {
                    let insert_line = input.insert_line.ok_or_else(|| {
                        missing_parameter("insert_line", "insert")
                    })?;
                    let new_str = input
                        .new_str
                        .ok_or_else(|| missing_parameter("new_str", "insert"))?;
                    insert_into_file(&path, insert_line, &new_str).await
                }
            }
        }
    }
}

#[inline]
fn missing_parameter(name: &str, command: &str) -> ToolError {
    ToolError::invalid_input()
        .with_reason(format!("`{name}` is required by `{command}`"))
}

async fn create_file(path: &Path, file_text: &str) -> ToolResult {
    if fs::try_exists(path).await.unwrap_or(false) {
        return Err(ToolError::invalid_input().with_reason(format!(
            "{} already exists, use `str_replace` or `insert` to edit it",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|err| {
            ToolError::execution_error()
                .with_reason(format!("cannot create {}", parent.display()))
                .with_source(err)
        })?;
    }
    write_file(path, file_text).await?;
    Ok(format!("File created successfully at: {}", path.display()))
}

async fn replace_in_file(path: &Path, old_str: &str, new_str: &str) -> ToolResult {
    if old_str.is_empty() {
        return Err(ToolError::invalid_input()
            .with_reason("`old_str` must not be empty"));
    }
    let content = read_file(path).await?;

    let mut matches = content.match_indices(old_str);
    let Some((offset, _)) = matches.next() else {
        return Err(ToolError::invalid_input().with_reason(format!(
            "`old_str` did not appear verbatim in {}",
            path.display()
        )));
    };
    let occurrences = 1 + matches.count();
    if occurrences > 1 {
        return Err(ToolError::invalid_input().with_reason(format!(
            "`old_str` appears {occurrences} times in {}, make it unique",
            path.display()
        )));
    }

    let mut edited = String::with_capacity(content.len() + new_str.len());
    edited.push_str(&content[..offset]);
    edited.push_str(new_str);
    edited.push_str(&content[offset + old_str.len()..]);
    write_file(path, &edited).await?;

    let first_line = content[..offset].matches('\n').count();
    let last_line = first_line + new_str.matches('\n').count();
    Ok(format!(
        "The file {} has been edited.\n{}",
        path.display(),
        snippet(&edited, first_line, last_line)
    ))
}

async fn insert_into_file(
    path: &Path,
    insert_line: usize,
    new_str: &str,
) -> ToolResult {
    let content = read_file(path).await?;
    let mut lines: Vec<&str> = content.lines().collect();
    if insert_line > lines.len() {
        return Err(ToolError::invalid_input().with_reason(format!(
            "`insert_line` {insert_line} is out of range [0, {}]",
            lines.len()
        )));
    }

    let inserted: Vec<&str> = new_str.lines().collect();
    let inserted_count = inserted.len();
    lines.splice(insert_line..insert_line, inserted);
    let mut edited = lines.join("\n");
    if content.ends_with('\n') || content.is_empty() {
        edited.push('\n');
    }
    write_file(path, &edited).await?;

    Ok(format!(
        "The file {} has been edited.\n{}",
        path.display(),
        snippet(&edited, insert_line, insert_line + inserted_count.max(1) - 1)
    ))
}

async fn read_file(path: &Path) -> Result<String, ToolError> {
    fs::read_to_string(path).await.map_err(|err| {
        let reason = if err.kind() == IoErrorKind::NotFound {
            format!("{} does not exist", path.display())
        } else {
            format!("cannot read {}", path.display())
        };
        ToolError::execution_error()
            .with_reason(reason)
            .with_source(err)
    })
}

async fn write_file(path: &Path, content: &str) -> Result<(), ToolError> {
    fs::write(path, content).await.map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("cannot write {}", path.display()))
            .with_source(err)
    })
}

/// Renders the lines around `first..=last` (0-based) with line numbers.
fn snippet(content: &str, first: usize, last: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = first.saturating_sub(SNIPPET_LINES);
    let end = (last + SNIPPET_LINES + 1).min(lines.len());
    let width = end.to_string().len();

    let mut result = String::from("Snippet of the edited file:\n");
    for (index, line) in lines.iter().enumerate().take(end).skip(start) {
        result.push_str(&format!("{:>width$}: {line}\n", index + 1));
    }
    result
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::path::PathBuf;

    use agenthub_core::tool::ErrorKind;

    use super::*;

    fn workdir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn params(command: EditCommand, path: &str) -> EditFileParameters {
        EditFileParameters {
            command,
            path: path.to_owned(),
            file_text: None,
            old_str: None,
            new_str: None,
            insert_line: None,
        }
    }

    #[tokio::test]
    async fn test_create() {
        let dir = workdir("agenthub-edit-create");
        let tool = EditFileTool::new(ShellSession::new(dir.clone()));

        let mut input = params(EditCommand::Create, "src/hello.txt");
        input.file_text = Some("hello\n".to_owned());
        tool.execute(input).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("src/hello.txt")).unwrap(),
            "hello\n"
        );

        let mut input = params(EditCommand::Create, "src/hello.txt");
        input.file_text = Some("again".to_owned());
        let err = tool.execute(input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_str_replace() {
        let dir = workdir("agenthub-edit-replace");
        std::fs::write(dir.join("a.txt"), "one\ntwo\nthree\ntwo\n").unwrap();
        let tool = EditFileTool::new(ShellSession::new(dir.clone()));

        let mut input = params(EditCommand::StrReplace, "a.txt");
        input.old_str = Some("two".to_owned());
        input.new_str = Some("2".to_owned());
        let err = tool.execute(input).await.unwrap_err();
        assert!(err.reason().contains("appears 2 times"));

        let mut input = params(EditCommand::StrReplace, "a.txt");
        input.old_str = Some("three\n".to_owned());
        input.new_str = Some("3\n".to_owned());
        let output = tool.execute(input).await.unwrap();
        assert!(output.contains("3: 3\n"));
        assert_eq!(
            std::fs::read_to_string(dir.join("a.txt")).unwrap(),
            "one\ntwo\n3\ntwo\n"
        );

        let mut input = params(EditCommand::StrReplace, "a.txt");
        input.old_str = Some("four".to_owned());
        assert!(tool.execute(input).await.is_err());
    }

    #[tokio::test]
    async fn test_insert() {
        let dir = workdir("agenthub-edit-insert");
        std::fs::write(dir.join("a.txt"), "one\nthree\n").unwrap();
        let tool = EditFileTool::new(ShellSession::new(dir.clone()));

        let mut input = params(EditCommand::Insert, "a.txt");
        input.insert_line = Some(1);
        input.new_str = Some("two".to_owned());
        tool.execute(input).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("a.txt")).unwrap(),
            "one\ntwo\nthree\n"
        );

        let mut input = params(EditCommand::Insert, "a.txt");
        input.insert_line = Some(10);
        input.new_str = Some("oops".to_owned());
        let err = tool.execute(input).await.unwrap_err();
        assert!(err.reason().contains("out of range [0, 3]"));
    }

    #[tokio::test]
    async fn test_missing_parameter() {
        let dir = workdir("agenthub-edit-missing");
        let tool = EditFileTool::new(ShellSession::new(dir));
        let err = tool
            .execute(params(EditCommand::Create, "a.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "`file_text` is required by `create`");
    }

    #[test]
    fn test_snippet() {
        let content = (1..=20).map(|n| n.to_string()).collect::<Vec<_>>();
        let output = snippet(&content.join("\n"), 9, 9);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 1 + 2 * SNIPPET_LINES + 1);
        assert_eq!(lines[1], " 6: 6");
        assert_eq!(lines.last().unwrap(), &"14: 14");
    }
}
