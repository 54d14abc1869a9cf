//! Named agent configurations.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A named configuration of the agent loop: prompts, tools and the command
/// that completes a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Preset {
    /// A programmer that solves tasks in a repository with a shell and a file
    /// editor.
    #[default]
    Swe,
    /// A programmer that turns requirements into code and reports the result.
    CodeAlchemist,
    /// A front-end engineer that bootstraps React applications.
    Scaffolder,
}

impl Preset {
    /// All presets, in the order they are listed to users.
    pub const ALL: &[Preset] =
        &[Preset::Swe, Preset::CodeAlchemist, Preset::Scaffolder];

    /// Returns the name used to select the preset.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Preset::Swe => "swe",
            Preset::CodeAlchemist => "code-alchemist",
            Preset::Scaffolder => "scaffolder",
        }
    }

    /// Returns the system prompt, adapted to the host OS.
    pub fn system_prompt(self) -> String {
        let template = match self {
            Preset::Swe => include_str!("./prompts/swe.md"),
            Preset::CodeAlchemist => include_str!("./prompts/code_alchemist.md"),
            Preset::Scaffolder => include_str!("./prompts/scaffolder.md"),
        };
        template.replace("{{HOST_OS}}", host_os())
    }

    /// Returns the instruction sent with every round.
    pub fn instruction_template(self) -> &'static str {
        match self {
            Preset::Swe => {
                "Current directory: {current_dir}\n\
                 Your response must include a tool call. \
                 Call `finish` once the task is done."
            }
            Preset::CodeAlchemist => {
                "Your response must include a tool call. \
                 To stop the interaction, call `attempt_completion`."
            }
            Preset::Scaffolder => {
                "Based on the current context and state, what should be the \
                 next step?\nYour response must include a tool call. \
                 To stop the interaction, call `finish`."
            }
        }
    }

    /// Returns the names of the tools available to the preset.
    pub fn tool_names(self) -> &'static [&'static str] {
        match self {
            Preset::Swe => &["shell", "edit_file", "finish"],
            Preset::CodeAlchemist => &[
                "shell",
                "edit_file",
                "read_file",
                "list_files",
                "attempt_completion",
            ],
            Preset::Scaffolder => &[
                "shell",
                "create_project_template",
                "list_files",
                "edit_file",
                "finish",
            ],
        }
    }

    /// Returns the tool whose execution completes a task.
    #[inline]
    pub fn terminal_command(self) -> &'static str {
        match self {
            Preset::CodeAlchemist => "attempt_completion",
            Preset::Swe | Preset::Scaffolder => "finish",
        }
    }

    /// Returns the maximum number of rounds per task.
    #[inline]
    pub fn max_steps(self) -> usize {
        30
    }
}

impl Display for Preset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The error returned when parsing an unknown preset name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownPresetError(String);

impl Display for UnknownPresetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown preset `{}`, expected one of: ", self.0)?;
        for (idx, preset) in Preset::ALL.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(preset.name())?;
        }
        Ok(())
    }
}

impl StdError for UnknownPresetError {}

impl FromStr for Preset {
    type Err = UnknownPresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Preset::ALL
            .iter()
            .copied()
            .find(|preset| preset.name() == normalized)
            .ok_or_else(|| UnknownPresetError(s.to_owned()))
    }
}

#[inline]
fn host_os() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        _ => "some other OS",
    }
}
