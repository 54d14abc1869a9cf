use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use agenthub_model::ModelTool;

use super::{AnyTool, Tool, ToolObject};

/// The set of tools available to an agent, keyed by name.
///
/// Registration order is kept so that tool descriptions are presented to
/// the model in a stable order. Registering a second tool with an existing
/// name replaces the earlier one in place.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolObject>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub(crate) fn with_tools<I>(tools: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ToolObject>>,
    {
        let mut registry = Self::default();
        for tool in tools {
            registry.insert_object(tool);
        }
        registry
    }

    /// Registers a tool, replacing any earlier tool with the same name.
    #[inline]
    pub fn register<T: Tool>(&mut self, tool: T) {
        self.insert_object(Arc::new(AnyTool(tool)));
    }

    fn insert_object(&mut self, tool: Arc<dyn ToolObject>) {
        let name = tool.name().to_owned();
        if let Some(&idx) = self.index.get(&name) {
            warn!("tool `{name}` is registered twice, replacing the earlier one");
            self.tools[idx] = tool;
            return;
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<&Arc<dyn ToolObject>> {
        self.index.get(name).map(|&idx| &self.tools[idx])
    }

    /// Returns `true` if a tool named `name` is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the registered tool names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|tool| tool.name())
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Describes every tool for the model.
    pub fn describe_all(&self) -> Vec<ModelTool> {
        self.tools
            .iter()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }
}

impl Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tool::from_fn;

    fn tool(name: &str, output: &'static str) -> Arc<dyn ToolObject> {
        Arc::new(AnyTool(from_fn(
            name,
            format!("{name} tool"),
            json!({ "type": "object" }),
            move |_| Ok(output.to_owned()),
        )))
    }

    #[test]
    fn test_describe_all_in_order() {
        let registry = ToolRegistry::with_tools([
            tool("shell", ""),
            tool("read_file", ""),
            tool("finish", ""),
        ]);
        let names: Vec<_> = registry
            .describe_all()
            .into_iter()
            .map(|desc| desc.name)
            .collect();
        assert_eq!(names, ["shell", "read_file", "finish"]);
        assert!(registry.contains("finish"));
        assert!(registry.resolve("missing").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_replaces() {
        let registry = ToolRegistry::with_tools([
            tool("a", "first"),
            tool("b", ""),
            tool("a", "second"),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["a", "b"]);

        let tool = Arc::clone(registry.resolve("a").unwrap());
        assert_eq!(tool.execute(json!({})).await.unwrap(), "second");
    }
}
