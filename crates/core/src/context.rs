//! Environment facts injected into each round's instruction.

use std::collections::BTreeMap;

use async_trait::async_trait;

/// A snapshot of environment facts, keyed by placeholder name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkingContext {
    values: BTreeMap<String, String>,
}

impl WorkingContext {
    /// Creates an empty context.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, returning the context for chaining.
    #[inline]
    pub fn with<K: Into<String>, V: Into<String>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a value.
    #[inline]
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the value for `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Fills `{key}` placeholders in `template` with the context values.
    ///
    /// Placeholders without a matching key are left as written.
    pub fn render(&self, template: &str) -> String {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let value = after
                .find('}')
                .and_then(|end| Some((end, self.get(&after[..end])?)));
            match value {
                Some((end, value)) => {
                    rendered.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

/// Supplies the working context before each round.
///
/// Implementations must tolerate being called once per round and should
/// return the facts as they are at the time of the call.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Returns the current facts.
    async fn refresh(&self) -> WorkingContext;
}

/// A provider that always returns the same facts.
#[derive(Clone, Debug, Default)]
pub struct StaticContext(pub WorkingContext);

#[async_trait]
impl ContextProvider for StaticContext {
    async fn refresh(&self) -> WorkingContext {
        self.0.clone()
    }
}

/// A provider exposing the process working directory as `current_dir`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentDirContext;

#[async_trait]
impl ContextProvider for CurrentDirContext {
    async fn refresh(&self) -> WorkingContext {
        let mut context = WorkingContext::new();
        match std::env::current_dir() {
            Ok(dir) => context.insert("current_dir", dir.display().to_string()),
            Err(err) => warn!("failed to read the current directory: {err}"),
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let context = WorkingContext::new()
            .with("current_dir", "/work")
            .with("os", "linux");
        assert_eq!(
            context.render("You are in {current_dir} on {os}."),
            "You are in /work on linux."
        );
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let context = WorkingContext::new().with("a", "1");
        assert_eq!(context.render("{b} {a} {"), "{b} 1 {");
        assert_eq!(context.render("json: {\"a\": {a}}"), "json: {\"a\": 1}");
    }

    #[tokio::test]
    async fn test_static_context() {
        let provider = StaticContext(WorkingContext::new().with("k", "v"));
        assert_eq!(provider.refresh().await.get("k"), Some("v"));
        assert_eq!(provider.refresh().await.get("k"), Some("v"));
    }
}
