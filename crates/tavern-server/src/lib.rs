pub mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use tavern_api::auth::{AppState, AppStateInner};
use tavern_db::Database;
use tavern_gateway::{Dispatcher, connection};

use crate::config::Config;

pub fn build_state(config: &Config, db: Database) -> AppState {
    Arc::new(AppStateInner {
        db: Arc::new(db),
        dispatcher: Dispatcher::new(),
        jwt_secret: config.jwt_secret.clone(),
        jwt_ttl: chrono::Duration::days(config.jwt_ttl_days),
        online_threshold: chrono::Duration::seconds(config.online_threshold_secs),
        upload_dir: config.upload_dir.clone(),
        static_dir: config.static_dir.clone(),
    })
}

/// REST routes plus the channel WebSocket, with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let ws_route = Router::new()
        .route("/ws/{channel_id}", get(ws_upgrade))
        .with_state(state.clone());

    Router::new()
        .merge(tavern_api::router(state))
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let db = state.db.clone();
    let channel = tokio::task::spawn_blocking(move || db.get_channel(channel_id)).await;

    let channel = match channel {
        Ok(Ok(Some(channel))) => channel,
        Ok(Ok(None)) => return StatusCode::NOT_FOUND.into_response(),
        Ok(Err(e)) => {
            error!("Failed to load channel {}: {}", channel_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let db = state.db.clone();
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, channel, db, dispatcher))
}
