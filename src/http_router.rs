use crate::server::RecCallServer;
use axum::{Json, Router, routing::get};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use serde::Serialize;

#[derive(Clone)]
pub struct AppState {
    pub server: RecCallServer,
}

#[derive(Serialize)]
struct HealthResp {
    status: &'static str,
    version: &'static str,
}

/// `/mcp` serves the streamable HTTP MCP transport, `/healthz` a liveness probe.
pub fn build_router(app_state: AppState) -> Router {
    let srv_factory = app_state.server.clone();
    let service = StreamableHttpService::new(
        move || Ok(srv_factory.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    Router::new()
        .nest_service("/mcp", service)
        .route(
            "/healthz",
            get(|| async {
                Json(HealthResp {
                    status: "ok",
                    version: env!("CARGO_PKG_VERSION"),
                })
            }),
        )
}
