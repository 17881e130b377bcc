//! HTTP surface
//!
//! Thin axum layer over the [`Dispatcher`]: prompt queries, direct tool
//! calls, tool listing and a JSON-RPC endpoint.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use toolgate_core::{DirectOutcome, DispatchError, Dispatcher, PromptOutcome, ToolRegistry};
use tracing::{info, warn};

use crate::rpc::{RpcHandler, SERVER_NAME};

#[derive(Clone)]
pub struct AppState {
    dispatcher: Dispatcher,
    rpc: RpcHandler,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            rpc: RpcHandler::new(dispatcher.clone()),
            dispatcher,
        }
    }
}

/// Failure of one HTTP request
#[derive(Debug)]
pub enum ApiError {
    Dispatch(DispatchError),
    BadRequest(String),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::Dispatch(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Dispatch(err) => {
                let status = match &err {
                    DispatchError::NoKeyword { .. } | DispatchError::ArgumentAdaptation { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    DispatchError::UnknownKeyword { .. } | DispatchError::ToolNotFound { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    DispatchError::ToolExecution { .. } | DispatchError::DuplicateTool { .. } => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };

                let mut body = Map::new();
                body.insert("detail".to_string(), Value::from(err.to_string()));
                body.insert("kind".to_string(), Value::from(err.kind()));
                if let Some((label, values)) = err.alternatives() {
                    body.insert(label.to_string(), Value::from(values.to_vec()));
                }
                (status, Value::Object(body))
            }
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                json!({"detail": detail, "kind": "bad_request"}),
            ),
        };

        if status.is_server_error() {
            warn!("{}: {}", status, body["detail"]);
        }

        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub prompt: String,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

/// Paths served by fixed routes, which win over `/{tool_name}`
pub const RESERVED_PATHS: &[&str] = &["health", "tools", "query", "rpc"];

/// Registered tools whose names collide with a fixed route
pub fn shadowed_tools(registry: &ToolRegistry) -> Vec<String> {
    registry
        .names()
        .into_iter()
        .filter(|name| RESERVED_PATHS.contains(&name.as_str()))
        .collect()
}

pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/query", post(query))
        .route("/rpc", post(rpc))
        .route("/{tool_name}", get(call_tool_get).post(call_tool_post))
        .with_state(AppState::new(dispatcher))
}

/// Bind `addr` and serve until ctrl-c
pub async fn serve(addr: SocketAddr, dispatcher: Dispatcher) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": SERVER_NAME,
        "description": "Tool gateway with @keyword routing",
        "keywords": state.dispatcher.routes().keywords(),
    }))
}

async fn health() -> &'static str {
    "ok"
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let registry = state.dispatcher.registry();

    let tools: Vec<Value> = registry
        .list_all()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "params": tool.parameters,
            })
        })
        .collect();

    let keywords: Map<String, Value> = state
        .dispatcher
        .routes()
        .routes()
        .iter()
        .map(|route| (route.keyword.clone(), Value::from(route.tool.clone())))
        .collect();

    Json(json!({
        "count": tools.len(),
        "tools": tools,
        "keywords": keywords,
    }))
}

async fn query(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PromptOutcome>, ApiError> {
    let request: QueryRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid query body: {}", e)))?;

    let outcome = state
        .dispatcher
        .dispatch_prompt(&request.prompt, request.params.unwrap_or_default())
        .await?;
    Ok(Json(outcome))
}

async fn call_tool_get(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<DirectOutcome>, ApiError> {
    let args = query
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    Ok(Json(state.dispatcher.call_direct(&tool_name, args).await?))
}

async fn call_tool_post(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    body: Bytes,
) -> Result<Json<DirectOutcome>, ApiError> {
    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice(&body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(ApiError::BadRequest("Body must be a JSON object".to_string())),
            Err(e) => return Err(ApiError::BadRequest(format!("Invalid JSON body: {}", e))),
        }
    };

    Ok(Json(state.dispatcher.call_direct(&tool_name, args).await?))
}

async fn rpc(State(state): State<AppState>, body: String) -> Response {
    match state.rpc.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
