//! MCP tool-call server: mounts the same [`ToolHandlers::execute`] surface
//! the Agent Runtime and CLI call, behind a small `axum` HTTP API (§6.1).
//!
//! Only the route handlers and server wiring live here — the caller
//! (`bctb-mcp-server`) owns the listener lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::tools::{all_tool_descriptors, to_tool_def, ToolHandlers};

pub type GatewayState = Arc<Mutex<ToolHandlers>>;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn list_tools() -> impl IntoResponse {
    let defs: Vec<_> = all_tool_descriptors()
        .iter()
        .map(|d| {
            let def = to_tool_def(d);
            json!({
                "name": def.name,
                "description": def.description,
                "jsonSchema": def.json_schema,
                "annotations": d.annotations,
            })
        })
        .collect();
    Json(defs)
}

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default = "serde_json::Value::default")]
    pub params: serde_json::Value,
}

pub async fn call_tool(
    State(tools): State<GatewayState>,
    Json(req): Json<ToolCallRequest>,
) -> impl IntoResponse {
    let mut handlers = tools.lock().await;
    match handlers.execute(&req.name, req.params).await {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

pub fn router(tools: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(tools)
}

/// Bind and serve the MCP router on `addr`. Blocks until the server shuts
/// down or the listener fails to bind.
pub async fn serve(addr: SocketAddr, tools: GatewayState) -> std::io::Result<()> {
    let app = router(tools);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("bctb-mcp-server listening on {addr}");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_profile, WorkspaceConfig};
    use crate::event_bus::NullBus;

    async fn test_state() -> GatewayState {
        let config = WorkspaceConfig::default();
        let profile_name = "default".to_string();
        let _ = resolve_profile(&config, &profile_name);
        let handlers = ToolHandlers::new(
            std::env::temp_dir(),
            config,
            profile_name,
            Arc::new(NullBus::default()),
        )
        .expect("handlers");
        Arc::new(Mutex::new(handlers))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn list_tools_returns_every_registered_tool() {
        let response = list_tools().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn call_tool_rejects_unknown_tool_name() {
        let state = test_state().await;
        let request = ToolCallRequest {
            name: "not_a_real_tool".to_string(),
            params: json!({}),
        };
        let response = call_tool(State(state), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
