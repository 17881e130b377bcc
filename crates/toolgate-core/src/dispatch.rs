//! Dispatcher - the request/response boundary of the gateway
//!
//! Stateless per call: each dispatch reads the shared registry and route
//! table, invokes one tool and returns one envelope or one error.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapter::{invoke_adapted, shape_arguments};
use crate::error::DispatchError;
use crate::registry::ToolRegistry;
use crate::router::{parse_keyword, RouteTable};

/// Result of a prompt-routed call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptOutcome {
    pub keyword: String,
    pub tool: String,
    pub prompt: String,
    pub result: Value,
}

/// Result of a direct call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectOutcome {
    pub tool: String,
    pub result: Value,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    routes: Arc<RouteTable>,
    fallback_on_mismatch: bool,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, routes: Arc<RouteTable>) -> Self {
        Self {
            registry,
            routes,
            fallback_on_mismatch: true,
        }
    }

    /// Enable or disable the retry-without-arguments fallback
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_mismatch = enabled;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Route `prompt` by its `@keyword` and run the bound tool.
    ///
    /// `params` are explicit structured arguments laid over the ones derived
    /// from the prompt.
    pub async fn dispatch_prompt(
        &self,
        prompt: &str,
        params: Map<String, Value>,
    ) -> Result<PromptOutcome, DispatchError> {
        let parsed = parse_keyword(prompt);

        let keyword = parsed.keyword.ok_or_else(|| DispatchError::NoKeyword {
            keywords: self.routes.keywords(),
        })?;

        let route = self
            .routes
            .lookup(&keyword)
            .ok_or_else(|| DispatchError::UnknownKeyword {
                keyword: keyword.clone(),
                keywords: self.routes.keywords(),
            })?;

        let tool = self.registry.resolve(&route.tool)?;
        info!("Routing @{} -> {}", keyword, tool.name);

        let args = shape_arguments(&route.shape, &parsed.cleaned, params);
        debug!("Shaped arguments for {}: {:?}", tool.name, args);

        let result = invoke_adapted(tool, args, self.fallback_on_mismatch).await?;

        Ok(PromptOutcome {
            keyword,
            tool: tool.name.clone(),
            prompt: parsed.cleaned,
            result,
        })
    }

    /// Run `tool_name` with `args` as given; no keyword parsing, no fallback
    pub async fn call_direct(
        &self,
        tool_name: &str,
        args: Map<String, Value>,
    ) -> Result<DirectOutcome, DispatchError> {
        let tool = self.registry.resolve(tool_name)?;
        info!("Direct call: {}", tool.name);

        let result = invoke_adapted(tool, args, false).await?;

        Ok(DirectOutcome {
            tool: tool.name.clone(),
            result,
        })
    }
}
