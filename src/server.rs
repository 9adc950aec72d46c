use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use crate::{auth::verify_bearer, error::DispatchError, tools::Dispatcher};

pub const SERVER_NAME: &str = "bluum-finance-mcp-server";
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcSuccess {
    jsonrpc: &'static str,
    id: Value,
    result: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcFailure {
    jsonrpc: &'static str,
    id: Value,
    error: JsonRpcError,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    // Notifications yield `None`.
    pub async fn handle_message(&self, message: Value) -> Option<Value> {
        let fallback_id = message.get("id").cloned().unwrap_or(Value::Null);
        let request = match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => request,
            Err(err) => {
                warn!("Malformed JSON-RPC request: {err}");
                return Some(jsonrpc_error(fallback_id, INVALID_REQUEST, "Invalid Request"));
            }
        };

        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        if request.jsonrpc != "2.0" {
            return Some(jsonrpc_error(id, INVALID_REQUEST, "jsonrpc must be 2.0"));
        }

        let response = match request.method.as_str() {
            "initialize" => jsonrpc_ok(id, self.initialize(request.params.as_ref())),
            "ping" => jsonrpc_ok(id, json!({})),
            "tools/list" => jsonrpc_ok(
                id,
                json!({ "tools": self.dispatcher.tool_definitions() }),
            ),
            "tools/call" => self.call_tool(id, request.params).await,
            other => {
                debug!(method = other, "Unsupported JSON-RPC method");
                jsonrpc_error(id, METHOD_NOT_FOUND, "Method not found")
            }
        };
        Some(response)
    }

    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle_message(message).await,
            Err(err) => {
                warn!("Unparseable JSON-RPC line: {err}");
                Some(jsonrpc_error(Value::Null, PARSE_ERROR, "Parse error"))
            }
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let protocol_version = requested
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
            .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);

        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> Value {
        let Some(params) = params.and_then(|p| serde_json::from_value::<ToolCallParams>(p).ok())
        else {
            return jsonrpc_error(id, INVALID_PARAMS, "Invalid tool call parameters");
        };

        info!(tool = %params.name, "Executing tool");
        match self.dispatcher.dispatch(&params.name, &params.arguments).await {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(result) => jsonrpc_ok(id, result),
                Err(err) => {
                    error!(tool = %params.name, "Failed to encode tool result: {err}");
                    jsonrpc_error(id, INTERNAL_ERROR, "Internal error")
                }
            },
            Err(err @ DispatchError::UnknownTool(_)) => {
                warn!("{err}");
                jsonrpc_error(id, INVALID_PARAMS, err.to_string())
            }
            Err(err) => {
                error!("{err}");
                jsonrpc_error(id, INTERNAL_ERROR, err.to_string())
            }
        }
    }

    pub async fn serve_lines<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let mut encoded = serde_json::to_vec(&response)?;
                encoded.push(b'\n');
                writer.write_all(&encoded).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }
}

pub async fn serve_stdio(server: Arc<McpServer>) -> Result<()> {
    info!("Bluum Finance MCP Server running on stdio");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    server.serve_lines(stdin, tokio::io::stdout()).await?;
    info!("stdin closed, shutting down");
    Ok(())
}

#[derive(Clone)]
struct HttpState {
    server: Arc<McpServer>,
    api_key: Arc<str>,
}

pub fn http_router(server: Arc<McpServer>, api_key: &str) -> Router {
    let state = HttpState {
        server,
        api_key: Arc::from(api_key),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/mcp", post(mcp))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve_http(server: Arc<McpServer>, bind_addr: SocketAddr, api_key: &str) -> Result<()> {
    let app = http_router(server, api_key);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("{SERVER_NAME} listening on {bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "server": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "tools": state.server.dispatcher.registry().len(),
        "timestamp": Utc::now(),
    }))
}

async fn mcp(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(message): Json<Value>,
) -> impl IntoResponse {
    if let Err(rejection) = verify_bearer(&headers, &state.api_key) {
        return rejection.into_response();
    }

    match state.server.handle_message(message).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn jsonrpc_ok(id: Value, result: Value) -> Value {
    serde_json::to_value(JsonRpcSuccess {
        jsonrpc: "2.0",
        id,
        result,
    })
    .unwrap_or_default()
}

fn jsonrpc_error(id: Value, code: i64, message: impl Into<String>) -> Value {
    serde_json::to_value(JsonRpcFailure {
        jsonrpc: "2.0",
        id,
        error: JsonRpcError {
            code,
            message: message.into(),
        },
    })
    .unwrap_or_default()
}
