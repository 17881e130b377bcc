//! Tool registry - the authoritative set of invokable tools
//!
//! Populated once at startup, then shared read-only (`Arc<ToolRegistry>`)
//! between every request.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{DispatchError, ToolError};
use crate::schema::{ParamSpec, ToolArgs};

/// The callable behind a tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError>;
}

/// Adapts an async closure into a [`ToolHandler`]
struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolArgs) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send,
{
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        (self.0)(args).await
    }
}

/// One invokable capability
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: &str,
        description: &str,
        parameters: Vec<ParamSpec>,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            handler: Arc::new(handler),
        }
    }

    /// Build a descriptor from an async closure
    pub fn from_fn<F, Fut>(name: &str, description: &str, parameters: Vec<ParamSpec>, f: F) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self::new(name, description, parameters, FnHandler(f))
    }

    /// Run the tool with already-bound arguments
    pub async fn invoke(&self, args: ToolArgs) -> Result<Value, ToolError> {
        self.handler.call(args).await
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Registry of tools keyed by unique name, kept in registration order
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Registering the same name twice is rejected.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), DispatchError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(DispatchError::DuplicateTool {
                tool: descriptor.name,
            });
        }

        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Look up a tool by name
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, DispatchError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| DispatchError::ToolNotFound {
                tool: name.to_string(),
                available: self.names(),
            })
    }

    /// All tools, in registration order
    pub fn list_all(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamKind;
    use serde_json::json;

    fn echo(name: &str) -> ToolDescriptor {
        ToolDescriptor::from_fn(
            name,
            "Echo the message back",
            vec![ParamSpec::optional("message", ParamKind::String, "world", "")],
            |args: ToolArgs| async move {
                Ok::<_, ToolError>(json!({"echo": args.get_str("message")}))
            },
        )
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("hello")).unwrap();
        registry.register(echo("greet")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("greet").unwrap().name, "greet");
        assert_eq!(registry.names(), vec!["hello", "greet"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("hello")).unwrap();

        let err = registry.register(echo("hello")).unwrap_err();
        assert_eq!(err, DispatchError::DuplicateTool { tool: "hello".to_string() });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_missing_lists_available() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("hello")).unwrap();

        match registry.resolve("nope") {
            Err(DispatchError::ToolNotFound { tool, available }) => {
                assert_eq!(tool, "nope");
                assert_eq!(available, vec!["hello"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_empty_registry_is_valid() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve("hello").is_err());
    }

    #[tokio::test]
    async fn test_invoke_closure_tool() {
        let tool = echo("hello");
        let result = tool
            .invoke(ToolArgs::from(json!({"message": "hi"}).as_object().cloned().unwrap()))
            .await
            .unwrap();
        assert_eq!(result, json!({"echo": "hi"}));
    }
}
