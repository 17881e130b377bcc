//! JSON-RPC facade
//!
//! Transport-agnostic: the stdio server and the `/rpc` HTTP route both feed
//! raw messages through [`RpcHandler::handle_message`].

use serde::Serialize;
use serde_json::{json, Map, Value};
use toolgate_core::Dispatcher;
use tracing::{debug, error, info, warn};

use crate::protocol::{
    CallToolParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ServerCapabilities, ServerInfo, Tool, ToolResult, ToolsCapability,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};

pub const SERVER_NAME: &str = "toolgate";

#[derive(Debug, Clone)]
pub struct RpcHandler {
    dispatcher: Dispatcher,
}

impl RpcHandler {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Handle one raw JSON-RPC message. `None` means nothing is sent back.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        // Well-formed JSON keeps its id even when the request shape is wrong
        let id = value.get("id").cloned();

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!("Invalid request: {}", e);
                Some(JsonRpcResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ))
            }
        }
    }

    /// Handle a decoded request; notifications yield `None`
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id.clone();

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        match self.handle_request(&request.method, request.params).await {
            Ok(value) => Some(JsonRpcResponse::success(id, value)),
            Err(err) => Some(JsonRpcResponse::failure(id, err)),
        }
    }

    async fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => self.handle_initialize(),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(params).await,
            "ping" => Ok(json!({})),
            _ => {
                warn!("Unknown method: {}", method);
                Err(JsonRpcError::new(
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                ))
            }
        }
    }

    fn handle_initialize(&self) -> Result<Value, JsonRpcError> {
        info!("Initializing MCP session");

        to_value(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let tools = self
            .dispatcher
            .registry()
            .list_all()
            .iter()
            .map(Tool::from)
            .collect();

        to_value(ListToolsResult { tools })
    }

    /// `arguments.prompt` selects the keyword path; otherwise `name` is
    /// called directly with `arguments`.
    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))?,
            None => return Err(JsonRpcError::new(INVALID_PARAMS, "Missing params")),
        };

        let envelope = match params.arguments.get("prompt") {
            Some(Value::String(prompt)) => {
                let overrides = match params.arguments.get("params") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(map)) => map.clone(),
                    Some(_) => {
                        return Err(JsonRpcError::new(
                            INVALID_PARAMS,
                            "'params' must be an object",
                        ))
                    }
                };

                let outcome = self.dispatcher.dispatch_prompt(prompt, overrides).await?;
                to_text(&outcome)?
            }
            Some(_) => return Err(JsonRpcError::new(INVALID_PARAMS, "'prompt' must be a string")),
            None => {
                let name = params
                    .name
                    .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing tool name"))?;

                let outcome = self.dispatcher.call_direct(&name, params.arguments).await?;
                to_text(&outcome)?
            }
        };

        to_value(ToolResult::success(envelope))
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Serialization error: {}", e)))
}

fn to_text<T: Serialize>(value: &T) -> Result<String, JsonRpcError> {
    serde_json::to_string(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin_registry;
    use std::sync::Arc;
    use toolgate_core::{Config, RouteTable};

    fn handler() -> RpcHandler {
        let registry = builtin_registry(&Config::default()).unwrap();
        RpcHandler::new(Dispatcher::new(
            Arc::new(registry),
            Arc::new(RouteTable::builtin()),
        ))
    }

    async fn call(handler: &RpcHandler, message: Value) -> Value {
        let response = handler.handle_message(&message.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    /// Decode the envelope carried in a tools/call text block
    fn envelope(response: &Value) -> Value {
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = call(
            &handler(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(response["result"]["capabilities"]["tools"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_list_matches_registry() {
        let handler = handler();
        let response =
            call(&handler, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;

        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), handler.dispatcher.registry().len());
        for tool in tools {
            let name = tool["name"].as_str().unwrap();
            assert!(handler.dispatcher.registry().resolve(name).is_ok());
            assert_eq!(tool["inputSchema"]["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_tools_call_routes_prompt_and_echoes_id() {
        let response = call(
            &handler(),
            json!({
                "jsonrpc": "2.0",
                "id": "req-7",
                "method": "tools/call",
                "params": {"name": "hello", "arguments": {"prompt": "@hello there"}}
            }),
        )
        .await;

        assert_eq!(response["id"], "req-7");
        let envelope = envelope(&response);
        assert_eq!(envelope["keyword"], "hello");
        assert_eq!(envelope["tool"], "hello");
        assert_eq!(envelope["prompt"], "there");
        assert_eq!(envelope["result"]["message"], "Hello, there! 👋");
    }

    #[tokio::test]
    async fn test_tools_call_without_prompt_is_direct() {
        let response = call(
            &handler(),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "hello", "arguments": {"message": "hi"}}
            }),
        )
        .await;

        let envelope = envelope(&response);
        assert_eq!(envelope["tool"], "hello");
        assert_eq!(envelope["result"]["message"], "Hi there! 👋");
        assert!(envelope.get("keyword").is_none());
    }

    #[tokio::test]
    async fn test_tools_call_errors_map_to_codes() {
        let handler = handler();

        let response = call(
            &handler,
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
                   "params": {"name": "hello", "arguments": {"prompt": "no marker here"}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["kind"], "no_keyword");
        assert_eq!(
            response["error"]["data"]["keywords"].as_array().unwrap().len(),
            RouteTable::builtin().len()
        );

        let response = call(
            &handler,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call",
                   "params": {"arguments": {"prompt": "@bogus x"}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);

        let response = call(
            &handler,
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call",
                   "params": {"name": "vertica_query", "arguments": {"sql": "DROP TABLE x"}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], INTERNAL_ERROR);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Only SELECT is allowed"));
    }

    #[tokio::test]
    async fn test_unknown_method_and_parse_error() {
        let handler = handler();

        let response = call(
            &handler,
            json!({"jsonrpc": "2.0", "id": 8, "method": "resources/list"}),
        )
        .await;
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(response["id"], 8);

        let response = handler.handle_message("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
        assert!(response.id.is_none());
    }

    #[tokio::test]
    async fn test_malformed_request_keeps_id() {
        let handler = handler();

        let response = call(&handler, json!({"jsonrpc": "2.0", "id": 42, "params": {}})).await;
        assert_eq!(response["id"], 42);
        assert_eq!(response["error"]["code"], INVALID_REQUEST);

        let response = call(&handler, json!({"id": "abc", "method": 7})).await;
        assert_eq!(response["id"], "abc");
        assert_eq!(response["error"]["code"], INVALID_REQUEST);

        let response = call(&handler, json!([1, 2])).await;
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_null_or_missing_id_is_echoed_on_error() {
        let handler = handler();

        for message in [
            json!({"jsonrpc": "2.0", "id": null, "method": "bogus"}),
            json!({"jsonrpc": "2.0", "method": "bogus"}),
        ] {
            let response = call(&handler, message).await;
            assert_eq!(response.get("id"), Some(&Value::Null));
            assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_tools_call_rejects_badly_typed_arguments() {
        let handler = handler();

        let response = call(
            &handler,
            json!({"jsonrpc": "2.0", "id": 10, "method": "tools/call",
                   "params": {"arguments": {"prompt": 5}}}),
        )
        .await;
        assert_eq!(response["id"], 10);
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["message"], "'prompt' must be a string");

        let response = call(
            &handler,
            json!({"jsonrpc": "2.0", "id": 11, "method": "tools/call",
                   "params": {"arguments": {"prompt": "@hello there", "params": [1]}}}),
        )
        .await;
        assert_eq!(response["id"], 11);
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["message"], "'params' must be an object");
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let handler = handler();
        let message = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(handler.handle_message(&message.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let response =
            call(&handler(), json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})).await;
        assert_eq!(response["result"], json!({}));
    }
}
