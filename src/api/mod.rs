//! HTTP API: health, role management, manual calendar sync and the GroupMe
//! callback endpoint.

mod handlers;

use crate::components::ComponentManager;
use crate::error::BotResult;
use crate::guild::GuildGateway;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Guild access for role lookups and relay posts
    pub gateway: Arc<dyn GuildGateway>,
    /// Components, for the calendar sync and relay handles
    pub components: Arc<ComponentManager>,
    /// The bot's tag once the gateway is ready
    pub bot_tag: Arc<RwLock<Option<String>>>,
    /// Bearer token required on protected routes
    pub api_token: Option<String>,
    /// Token expected in the GroupMe callback query
    pub callback_token: Option<String>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/roles", get(handlers::get_roles))
        .route(
            "/roles/manage",
            put(handlers::add_role).delete(handlers::remove_role),
        )
        .route("/calendar/sync", post(handlers::trigger_calendar_sync))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_token,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/groupme/callback", post(handlers::groupme_callback))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the API until `cancel` fires
pub async fn serve(state: AppState, addr: SocketAddr, cancel: CancellationToken) -> BotResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server running on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("API server stopped");
    Ok(())
}

/// Reject requests without the configured bearer token
async fn require_api_token(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected) {
        next.run(req).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Unauthorized" })),
        )
            .into_response()
    }
}
