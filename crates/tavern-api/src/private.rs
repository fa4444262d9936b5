use axum::extract::State;

use tavern_types::api::{
    DeletePrivateRequest, EditMessageResponse, EditPrivateRequest, MessageAck,
    PrivateMessageView, PrivateMessagesQuery, PrivateMessagesResponse, SendPrivateRequest,
    SendPrivateResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Query};

pub async fn send_private(
    State(state): State<AppState>,
    Json(req): Json<SendPrivateRequest>,
) -> Result<Json<SendPrivateResponse>, ApiError> {
    let sender = state.session_user(&req.token).await?;

    let pm_id = state
        .with_db(move |db| {
            if db.get_user_by_id(req.receiver_id)?.is_none() {
                return Ok(None);
            }
            let now = chrono::Utc::now().naive_utc();
            db.insert_private_message(sender.id, req.receiver_id, &req.content, now)
                .map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::bad_request("Receiver not found"))?;

    Ok(Json(SendPrivateResponse {
        message: "Private message sent".into(),
        pm_id,
    }))
}

pub async fn get_private_messages(
    State(state): State<AppState>,
    Query(query): Query<PrivateMessagesQuery>,
) -> Result<Json<PrivateMessagesResponse>, ApiError> {
    let user = state.session_user(&query.token).await?;

    let rows = state
        .with_db(move |db| db.get_conversation(user.id, query.other_user_id))
        .await?;

    Ok(Json(PrivateMessagesResponse {
        private_messages: rows
            .into_iter()
            .map(|pm| PrivateMessageView {
                id: pm.id,
                sender_id: pm.sender_id,
                receiver_id: pm.receiver_id,
                content: pm.content,
                timestamp: pm.timestamp,
                is_edited: pm.is_edited,
            })
            .collect(),
    }))
}

pub async fn edit_private(
    State(state): State<AppState>,
    Json(req): Json<EditPrivateRequest>,
) -> Result<Json<EditMessageResponse>, ApiError> {
    let (Some(pm_id), Some(new_content)) =
        (req.pm_id, req.new_content.filter(|c| !c.is_empty()))
    else {
        return Err(ApiError::bad_request("PM ID and new content are required"));
    };

    let user = state.session_user(&req.token).await?;
    let content = new_content.clone();
    state
        .with_db(move |db| {
            let Some(pm) = db.get_private_message(pm_id)? else {
                return Ok(Err(ApiError::bad_request("Private message not found")));
            };
            if pm.sender_id != user.id {
                return Ok(Err(ApiError::forbidden(
                    "You can only edit your own private messages",
                )));
            }
            if !db.edit_private_message(pm_id, user.id, &content)? {
                return Ok(Err(ApiError::bad_request("Private message not found")));
            }
            Ok(Ok(()))
        })
        .await??;

    Ok(Json(EditMessageResponse {
        message: "Private message edited".into(),
        new_content,
    }))
}

pub async fn delete_private(
    State(state): State<AppState>,
    Json(req): Json<DeletePrivateRequest>,
) -> Result<Json<MessageAck>, ApiError> {
    let Some(pm_id) = req.pm_id else {
        return Err(ApiError::bad_request("PM ID is required"));
    };

    let user = state.session_user(&req.token).await?;
    state
        .with_db(move |db| {
            let Some(pm) = db.get_private_message(pm_id)? else {
                return Ok(Err(ApiError::bad_request("Private message not found")));
            };
            if pm.sender_id != user.id {
                return Ok(Err(ApiError::forbidden(
                    "You can only delete your own private messages",
                )));
            }
            if !db.delete_private_message(pm_id, user.id)? {
                return Ok(Err(ApiError::bad_request("Private message not found")));
            }
            Ok(Ok(()))
        })
        .await??;

    Ok(Json(MessageAck::new("Private message deleted")))
}
