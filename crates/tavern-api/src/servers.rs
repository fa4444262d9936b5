use axum::extract::State;

use tavern_types::api::{
    ChannelSummary, ChannelsQuery, CreateChannelRequest, CreateChannelResponse,
    CreateServerRequest, CreateServerResponse, ServerSummary,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Query};

pub async fn create_server(
    State(state): State<AppState>,
    Json(req): Json<CreateServerRequest>,
) -> Result<Json<CreateServerResponse>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

    let server = state.with_db(move |db| db.create_server(&req.name)).await?;

    Ok(Json(CreateServerResponse {
        message: "Server created".into(),
        server,
    }))
}

pub async fn create_channel(
    State(state): State<AppState>,
    Json(req): Json<CreateChannelRequest>,
) -> Result<Json<CreateChannelResponse>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

    let channel = state
        .with_db(move |db| {
            if db.get_server(req.server_id)?.is_none() {
                return Ok(None);
            }
            db.create_channel(req.server_id, &req.name).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::bad_request("Server not found"))?;

    Ok(Json(CreateChannelResponse {
        message: "Channel created".into(),
        channel,
    }))
}

pub async fn list_servers(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServerSummary>>, ApiError> {
    let servers = state.with_db(|db| db.list_servers()).await?;

    Ok(Json(
        servers
            .into_iter()
            .map(|s| ServerSummary { id: s.id, name: s.name })
            .collect(),
    ))
}

pub async fn list_channels(
    State(state): State<AppState>,
    Query(query): Query<ChannelsQuery>,
) -> Result<Json<Vec<ChannelSummary>>, ApiError> {
    let channels = state
        .with_db(move |db| db.list_channels(query.server_id))
        .await?;

    Ok(Json(
        channels
            .into_iter()
            .map(|c| ChannelSummary {
                id: c.id,
                name: c.name,
                server_id: c.server_id,
            })
            .collect(),
    ))
}
