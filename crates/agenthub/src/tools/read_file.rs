use std::fs::File;
use std::io::{BufRead, BufReader, Read};

use agenthub_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::task::spawn_blocking;

use super::{ShellSession, resolve_path};

const DEFAULT_MAX_LINES: usize = 100;
const MAX_LINES_CAP: usize = 500;

#[derive(Deserialize, JsonSchema)]
pub struct ReadFileParameters {
    #[schemars(
        description = "Path to the file, relative to the current directory or absolute."
    )]
    path: String,
    #[schemars(description = "1-based start line to read from, default to 1.")]
    start_line: Option<usize>,
    #[schemars(
        description = "Maximum number of lines to return, default to 100 and at most 500."
    )]
    max_lines: Option<usize>,
}

/// A tool for reading file content with line numbers.
pub struct ReadFileTool {
    session: ShellSession,
    parameter_schema: Value,
}

impl ReadFileTool {
    /// Creates a new read file tool bound to `session`.
    #[inline]
    pub fn new(session: ShellSession) -> Self {
        ReadFileTool {
            session,
            parameter_schema: schema_for!(ReadFileParameters).to_value(),
        }
    }
}

impl Tool for ReadFileTool {
    type Input = ReadFileParameters;

    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        r#"
Reads a text file and returns its contents prefixed with line numbers.
Relative paths are resolved against the current directory. Use `start_line` and `max_lines` to page through large files."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ReadFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let path = resolve_path(&self.session, &input.path);
        async move {
            let start_line = input.start_line.unwrap_or(1);
            if start_line == 0 {
                return Err(ToolError::invalid_input()
                    .with_reason("`start_line` must be 1-based"));
            }
            let max_lines = input
                .max_lines
                .unwrap_or(DEFAULT_MAX_LINES)
                .clamp(1, MAX_LINES_CAP);

            spawn_blocking(move || {
                let display = path.display().to_string();
                let file = File::open(&path).map_err(|err| {
                    ToolError::execution_error()
                        .with_reason(format!("cannot open {display}"))
                        .with_source(err)
                })?;
                format_reader_section(&display, file, start_line, max_lines)
            })
            .await
            .map_err(|_| {
                ToolError::execution_error().with_reason("failed to read file")
            })?
        }
    }
}

fn format_reader_section<R: Read>(
    path: &str,
    reader: R,
    start_line: usize,
    max_lines: usize,
) -> Result<String, ToolError> {
    let mut lines = Vec::new();
    let mut total = 0;
    for line in BufReader::new(reader).lines() {
        let line = line.map_err(|err| {
            ToolError::execution_error()
                .with_reason(format!("cannot read {path}"))
                .with_source(err)
        })?;
        total += 1;
        if total >= start_line && lines.len() < max_lines {
            lines.push(line);
        }
    }

    let mut result = format!("==> {path} <==\n");
    if lines.is_empty() {
        result.push_str(&format!(
            "(no lines to show, the file has {total} lines)\n"
        ));
        return Ok(result);
    }

    let last_line = start_line + lines.len() - 1;
    let width = last_line.to_string().len();
    for (offset, line) in lines.into_iter().enumerate() {
        let line_no = start_line + offset;
        result.push_str(&format!("{line_no:>width$}: {line}\n"));
    }
    if start_line > 1 || last_line < total {
        result.push_str(&format!(
            "(showing lines {start_line}-{last_line} of {total})\n"
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_formats_lines() {
        let input = b"first\nsecond\nthird\n";

        let output =
            format_reader_section("/fake/path", Cursor::new(input), 2, 10)
                .unwrap();
        assert_eq!(
            output,
            "==> /fake/path <==\n2: second\n3: third\n(showing lines 2-3 of 3)\n"
        );
    }

    #[test]
    fn test_respects_limit() {
        let input = "line\n".repeat(120);

        let output = format_reader_section(
            "/fake/path",
            Cursor::new(input),
            1,
            DEFAULT_MAX_LINES,
        )
        .unwrap();
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), DEFAULT_MAX_LINES + 2);
        assert_eq!(lines[1], "  1: line");
        assert_eq!(lines.last().unwrap(), &"(showing lines 1-100 of 120)");
    }

    #[test]
    fn test_past_the_end() {
        let output =
            format_reader_section("/fake/path", Cursor::new("a\nb\n"), 5, 10)
                .unwrap();
        assert_eq!(
            output,
            "==> /fake/path <==\n(no lines to show, the file has 2 lines)\n"
        );
    }

    #[tokio::test]
    async fn test_relative_path() {
        let dir = env::temp_dir().join("agenthub-read-file-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("notes.txt"), "hello\n").unwrap();

        let tool = ReadFileTool::new(ShellSession::new(dir.clone()));
        let output = tool
            .execute(ReadFileParameters {
                path: "notes.txt".to_owned(),
                start_line: None,
                max_lines: None,
            })
            .await
            .unwrap();
        assert_eq!(
            output,
            format!("==> {} <==\n1: hello\n", dir.join("notes.txt").display())
        );

        let err = tool
            .execute(ReadFileParameters {
                path: "missing.txt".to_owned(),
                start_line: None,
                max_lines: None,
            })
            .await
            .unwrap_err();
        assert!(err.reason().starts_with("cannot open"));
    }
}
