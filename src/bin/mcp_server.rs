//! MCP tool-call server entrypoint (§6.1): binds an `axum` HTTP API over
//! the same `ToolHandlers::execute` surface the CLI and Agent Runtime use.

use std::net::SocketAddr;
use std::sync::Arc;

use bctb::config::{initial_profile_name, load_default_workspace_config, resolve_workspace_root};
use bctb::event_bus::TokioBroadcastBus;
use bctb::mcp::serve;
use bctb::tools::ToolHandlers;
use tokio::sync::Mutex;

const DEFAULT_PORT: u16 = 8790;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let workspace_root = match resolve_workspace_root(None) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let config = match load_default_workspace_config(None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let active_profile = initial_profile_name(&config);
    let events: Arc<dyn bctb::event_bus::EventBus> = Arc::new(TokioBroadcastBus::new(256));

    let handlers = match ToolHandlers::new(workspace_root, config, active_profile, events) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let port: u16 = std::env::var("BCTB_MCP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    if let Err(e) = serve(addr, Arc::new(Mutex::new(handlers))).await {
        eprintln!("mcp server error: {e}");
        std::process::exit(1);
    }
}
