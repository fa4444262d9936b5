use axum::extract::State;
use tracing::info;

use tavern_types::MAX_ALTERNATES;
use tavern_types::api::{
    CreateAlternateRequest, CreateAlternateResponse, DeleteAlternateQuery, MessageAck,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Query};

pub async fn create_alternate(
    State(state): State<AppState>,
    Json(req): Json<CreateAlternateRequest>,
) -> Result<Json<CreateAlternateResponse>, ApiError> {
    let user = state.session_user(&req.token).await?;

    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }

    let name = req.name;
    let icon = req.icon.filter(|s| !s.is_empty());
    let alternate_id = state
        .with_db(move |db| db.create_alternate(user.id, &name, icon.as_deref(), MAX_ALTERNATES))
        .await?
        .ok_or_else(|| {
            ApiError::bad_request(format!("Maximum of {} alternates allowed", MAX_ALTERNATES))
        })?;

    Ok(Json(CreateAlternateResponse {
        message: "Alternate created".into(),
        alternate_id,
    }))
}

/// Unlinks the alternate from its owner; messages sent as it keep its name.
pub async fn delete_alternate(
    State(state): State<AppState>,
    Query(query): Query<DeleteAlternateQuery>,
) -> Result<Json<MessageAck>, ApiError> {
    let user = state.session_user(&query.token).await?;

    let alternate_id = query.alternate_id;
    let alternate = state
        .with_db(move |db| db.get_alternate(alternate_id))
        .await?
        .filter(|alt| alt.user_id.is_some())
        .ok_or_else(|| ApiError::bad_request("Alternate not found"))?;

    if alternate.user_id != Some(user.id) {
        return Err(ApiError::forbidden("You can only delete your own alternates"));
    }

    state
        .with_db(move |db| db.unlink_alternate(alternate_id))
        .await?;

    info!("User {} unlinked alternate {}", user.id, alternate_id);
    Ok(Json(MessageAck::new("Alternate deleted")))
}
