//! REST call tool

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use toolgate_core::{ParamKind, ParamSpec, ToolArgs, ToolDescriptor, ToolError, ToolHandler};
use tracing::debug;

/// Response bodies are truncated to this many characters
const MAX_TEXT_CHARS: usize = 500;

struct RestCall;

#[async_trait]
impl ToolHandler for RestCall {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let url = args.require_str("url")?.trim();
        if url.is_empty() {
            return Err(ToolError::Rejected("URL is empty".to_string()));
        }

        let method_name = args.get_str("method").unwrap_or("GET").to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| ToolError::Rejected(format!("Invalid HTTP method: {}", method_name)))?;

        let timeout = args.get_i64("timeout").unwrap_or(10);
        if timeout < 1 {
            return Err(ToolError::Rejected(format!("timeout must be positive, got {}", timeout)));
        }

        // One client per call; nothing is shared between requests
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout as u64))
            .build()
            .map_err(|e| ToolError::Failed(format!("Failed to build HTTP client: {}", e)))?;

        debug!("{} {}", method, url);
        let response = client
            .request(method.clone(), url)
            .send()
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ToolError::Failed(e.to_string()))?;

        Ok(json!({
            "url": url,
            "method": method.as_str(),
            "status_code": status,
            "text": text.chars().take(MAX_TEXT_CHARS).collect::<String>(),
        }))
    }
}

pub fn rest_call_tool() -> ToolDescriptor {
    ToolDescriptor::new(
        "rest_call",
        "Make a REST API call",
        vec![
            ParamSpec::required("url", ParamKind::String, "Target URL"),
            ParamSpec::optional("method", ParamKind::String, "GET", "HTTP method"),
            ParamSpec::optional("timeout", ParamKind::Integer, 10, "Request timeout in seconds"),
        ],
        RestCall,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use serde_json::Map;
    use tokio::net::TcpListener;
    use toolgate_core::schema::bind;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn local_server() -> String {
        let app = Router::new().route("/ping", get(|| async { "x".repeat(600) }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_get_truncates_body() {
        let base = local_server().await;
        let tool = rest_call_tool();
        let bound = bind(&tool.parameters, args(json!({"url": format!("{}/ping", base)}))).unwrap();

        let result = tool.invoke(bound).await.unwrap();
        assert_eq!(result["status_code"], 200);
        assert_eq!(result["method"], "GET");
        assert_eq!(result["text"].as_str().unwrap().len(), MAX_TEXT_CHARS);
    }

    #[tokio::test]
    async fn test_invalid_method_rejected() {
        let tool = rest_call_tool();
        let bound = bind(
            &tool.parameters,
            args(json!({"url": "http://127.0.0.1:1", "method": "NOT A METHOD"})),
        )
        .unwrap();

        assert!(matches!(tool.invoke(bound).await, Err(ToolError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_connection_error_is_reported() {
        let tool = rest_call_tool();
        let bound = bind(
            &tool.parameters,
            args(json!({"url": "http://127.0.0.1:1/", "timeout": 2})),
        )
        .unwrap();

        assert!(matches!(tool.invoke(bound).await, Err(ToolError::Failed(_))));
    }
}
