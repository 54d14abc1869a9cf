use std::path::{Path, PathBuf};

use agenthub_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::fs;

use super::{ShellSession, resolve_path};

const PACKAGE_JSON: &str = r#"{
  "name": "{project_name}",
  "private": true,
  "version": "0.0.0",
  "type": "module",
  "scripts": {
    "dev": "vite",
    "build": "tsc -b && vite build",
    "preview": "vite preview"
  },
  "dependencies": {
    "react": "^18.3.1",
    "react-dom": "^18.3.1"
  },
  "devDependencies": {
    "@types/react": "^18.3.3",
    "@types/react-dom": "^18.3.0",
    "@vitejs/plugin-react": "^4.3.1",
    "typescript": "^5.5.3",
    "vite": "^5.4.1"
  }
}
"#;

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{project_name}</title>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/main.tsx"></script>
  </body>
</html>
"#;

const TSCONFIG_JSON: &str = r#"{
  "compilerOptions": {
    "target": "ES2020",
    "useDefineForClassFields": true,
    "lib": ["ES2020", "DOM", "DOM.Iterable"],
    "module": "ESNext",
    "skipLibCheck": true,
    "moduleResolution": "bundler",
    "allowImportingTsExtensions": true,
    "isolatedModules": true,
    "moduleDetection": "force",
    "noEmit": true,
    "jsx": "react-jsx",
    "strict": true
  },
  "include": ["src"]
}
"#;

const VITE_CONFIG_TS: &str = r#"import { defineConfig } from 'vite'
import react from '@vitejs/plugin-react'

export default defineConfig({
  plugins: [react()],
})
"#;

const MAIN_TSX: &str = r#"import { StrictMode } from 'react'
import { createRoot } from 'react-dom/client'
import App from './App.tsx'
import './index.css'

createRoot(document.getElementById('root')!).render(
  <StrictMode>
    <App />
  </StrictMode>,
)
"#;

const APP_TSX: &str = r#"function App() {
  return (
    <main>
      <h1>{project_name}</h1>
    </main>
  )
}

export default App
"#;

const INDEX_CSS: &str = r#":root {
  font-family: Inter, system-ui, Avenir, Helvetica, Arial, sans-serif;
  line-height: 1.5;
}

body {
  margin: 0;
  min-height: 100vh;
}
"#;

const FILES: &[(&str, &str)] = &[
    ("package.json", PACKAGE_JSON),
    ("index.html", INDEX_HTML),
    ("tsconfig.json", TSCONFIG_JSON),
    ("vite.config.ts", VITE_CONFIG_TS),
    ("src/main.tsx", MAIN_TSX),
    ("src/App.tsx", APP_TSX),
    ("src/index.css", INDEX_CSS),
];

const BASIC_DIRS: &[&str] =
    &["src/components", "src/styles", "src/utils", "public"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    /// Bare minimum setup.
    #[default]
    Minimal,
    /// Adds the directories used by small to medium projects.
    Basic,
}

#[derive(Deserialize, JsonSchema)]
pub struct ProjectTemplateParameters {
    #[schemars(description = "Name of the new project, like `my-react-app`.")]
    project_name: String,
    #[schemars(
        description = "Directory to create the project in, default to the current directory."
    )]
    path: Option<String>,
    #[schemars(description = "Template structure type, default to `minimal`.")]
    #[serde(default)]
    template_type: TemplateType,
}

/// A tool that scaffolds a React TypeScript project.
pub struct ProjectTemplateTool {
    session: ShellSession,
    parameter_schema: Value,
}

impl ProjectTemplateTool {
    /// Creates a new project template tool bound to `session`.
    #[inline]
    pub fn new(session: ShellSession) -> Self {
        ProjectTemplateTool {
            session,
            parameter_schema: schema_for!(ProjectTemplateParameters)
                .to_value(),
        }
    }
}

impl Tool for ProjectTemplateTool {
    type Input = ProjectTemplateParameters;

    fn name(&self) -> &str {
        "create_project_template"
    }

    fn description(&self) -> &str {
        r#"
Creates a React TypeScript project built with Vite.
The `minimal` template only has the entry files, `basic` also creates `src/components`, `src/styles`, `src/utils` and `public`. Dependencies are not installed."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ProjectTemplateParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let parent = resolve_path(&self.session, input.path.as_deref().unwrap_or("."));
        async move {
            let name = input.project_name.trim();
            if name.is_empty()
                || name.contains(['/', '\\'])
                || name == "."
                || name == ".."
            {
                return Err(ToolError::invalid_input().with_reason(format!(
                    "`{name}` is not a valid project name"
                )));
            }
            let project_dir = parent.join(name);
            create_project(&project_dir, name, input.template_type).await?;
            Ok(summary(&project_dir, name, input.template_type))
        }
    }
}

async fn create_project(
    project_dir: &Path,
    name: &str,
    template_type: TemplateType,
) -> Result<(), ToolError> {
    if let Ok(mut entries) = fs::read_dir(project_dir).await {
        let has_entries = entries
            .next_entry()
            .await
            .map(|entry| entry.is_some())
            .unwrap_or(true);
        if has_entries {
            return Err(ToolError::invalid_input().with_reason(format!(
                "{} already exists and is not empty",
                project_dir.display()
            )));
        }
    }

    let mut dirs = vec![PathBuf::from("src")];
    if template_type == TemplateType::Basic {
        dirs.extend(BASIC_DIRS.iter().map(PathBuf::from));
    }
    for dir in dirs {
        let dir = project_dir.join(dir);
        fs::create_dir_all(&dir).await.map_err(|err| {
            ToolError::execution_error()
                .with_reason(format!("cannot create {}", dir.display()))
                .with_source(err)
        })?;
    }
    for (rel_path, template) in FILES {
        let path = project_dir.join(rel_path);
        fs::write(&path, template.replace("{project_name}", name))
            .await
            .map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("cannot write {}", path.display()))
                    .with_source(err)
            })?;
    }
    Ok(())
}

fn summary(project_dir: &Path, name: &str, template_type: TemplateType) -> String {
    let mut structure = String::new();
    let mut entries: Vec<&str> = FILES.iter().map(|(path, _)| *path).collect();
    if template_type == TemplateType::Basic {
        entries.extend(BASIC_DIRS.iter().copied());
    }
    entries.sort_unstable();
    for entry in entries {
        structure.push_str(&format!("- {entry}\n"));
    }

    format!(
        r#"Template created: {name}
Location: {location}

Structure:
{structure}
Template rules:
1. The entry point is src/main.tsx, do not modify it.
2. Global styles live in src/index.css.
3. Application logic goes in src/App.tsx.
4. Put new components in src/components/.
5. Only change vite.config.ts when necessary.

Run `cd {location}` before working on the project. Dependencies are not installed yet."#,
        location = project_dir.display(),
    )
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    fn workdir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_create_basic_project() {
        let dir = workdir("agenthub-template-basic");
        let tool = ProjectTemplateTool::new(ShellSession::new(dir.clone()));
        let output = tool
            .execute(ProjectTemplateParameters {
                project_name: "demo-app".to_owned(),
                path: None,
                template_type: TemplateType::Basic,
            })
            .await
            .unwrap();

        let project = dir.join("demo-app");
        assert!(output.contains("Template created: demo-app"));
        assert!(output.contains("- src/components\n"));
        assert!(project.join("src/utils").is_dir());
        assert!(project.join("public").is_dir());
        let package = std::fs::read_to_string(project.join("package.json")).unwrap();
        let package: Value = serde_json::from_str(&package).unwrap();
        assert_eq!(package["name"], "demo-app");
    }

    #[tokio::test]
    async fn test_refuses_non_empty_directory() {
        let dir = workdir("agenthub-template-existing");
        std::fs::create_dir_all(dir.join("demo-app")).unwrap();
        std::fs::write(dir.join("demo-app/README.md"), "").unwrap();

        let tool = ProjectTemplateTool::new(ShellSession::new(dir));
        let err = tool
            .execute(ProjectTemplateParameters {
                project_name: "demo-app".to_owned(),
                path: None,
                template_type: TemplateType::Minimal,
            })
            .await
            .unwrap_err();
        assert!(err.reason().contains("not empty"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_name() {
        let tool =
            ProjectTemplateTool::new(ShellSession::new(env::temp_dir()));
        let err = tool
            .execute(ProjectTemplateParameters {
                project_name: "../escape".to_owned(),
                path: None,
                template_type: TemplateType::Minimal,
            })
            .await
            .unwrap_err();
        assert!(err.reason().contains("not a valid project name"));
    }
}
