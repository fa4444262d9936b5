use axum::extract::State;
use tracing::debug;

use tavern_db::models::MessageRow;
use tavern_types::DEFAULT_PROFILE_PICTURE;
use tavern_types::api::{
    DeleteMessageRequest, EditMessageRequest, EditMessageResponse, MessageAck, MessageView,
    MessagesQuery, MessagesResponse,
};
use tavern_types::events::ChannelEvent;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Query};

const MAX_PAGE: u32 = 200;

pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let limit = query.limit.map(|l| l.min(MAX_PAGE));
    let rows = state
        .with_db(move |db| db.get_messages(query.channel_id, query.before, limit))
        .await?;

    Ok(Json(MessagesResponse {
        messages: rows.into_iter().map(message_view).collect(),
    }))
}

/// Resolve the persona a message is shown under: the alternate if one was
/// used and still exists, otherwise the sender.
fn message_view(row: MessageRow) -> MessageView {
    let (display_name, picture) = match row.alternate_name {
        Some(name) => (name, row.alternate_icon),
        None => (
            row.display_name.unwrap_or_else(|| "unknown".to_string()),
            row.profile_picture,
        ),
    };

    MessageView {
        id: row.id,
        user_id: row.user_id,
        username: row.username.unwrap_or_else(|| "unknown".to_string()),
        display_name,
        profile_picture: picture.unwrap_or_else(|| DEFAULT_PROFILE_PICTURE.to_string()),
        content: row.content,
        timestamp: row.timestamp,
        is_action: row.is_action,
        is_edited: row.is_edited,
    }
}

pub async fn edit_message(
    State(state): State<AppState>,
    Json(req): Json<EditMessageRequest>,
) -> Result<Json<EditMessageResponse>, ApiError> {
    let (Some(message_id), Some(new_content)) =
        (req.message_id, req.new_content.filter(|c| !c.is_empty()))
    else {
        return Err(ApiError::bad_request("Message ID and new content are required"));
    };

    let user = state.session_user(&req.token).await?;
    let content = new_content.clone();
    let channel_id = state
        .with_db(move |db| {
            let Some(message) = db.get_message(message_id)? else {
                return Ok(Err(ApiError::bad_request("Message not found")));
            };
            if message.user_id != user.id {
                return Ok(Err(ApiError::forbidden("You can only edit your own messages")));
            }
            if !db.edit_message(message_id, user.id, &content)? {
                return Ok(Err(ApiError::bad_request("Message not found")));
            }
            Ok(Ok(message.channel_id))
        })
        .await??;

    let delivered = state
        .dispatcher
        .broadcast(
            channel_id,
            ChannelEvent::Edit {
                id: message_id,
                new_content: new_content.clone(),
                is_edited: true,
            },
        )
        .await;
    debug!("Edit of message {} pushed to {} sockets", message_id, delivered);

    Ok(Json(EditMessageResponse {
        message: "Message edited".into(),
        new_content,
    }))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Json(req): Json<DeleteMessageRequest>,
) -> Result<Json<MessageAck>, ApiError> {
    let Some(message_id) = req.message_id else {
        return Err(ApiError::bad_request("Message ID is required"));
    };

    let user = state.session_user(&req.token).await?;
    let channel_id = state
        .with_db(move |db| {
            let Some(message) = db.get_message(message_id)? else {
                return Ok(Err(ApiError::bad_request("Message not found")));
            };
            if message.user_id != user.id {
                return Ok(Err(ApiError::forbidden("You can only delete your own messages")));
            }
            if !db.delete_message(message_id, user.id)? {
                return Ok(Err(ApiError::bad_request("Message not found")));
            }
            Ok(Ok(message.channel_id))
        })
        .await??;

    let delivered = state
        .dispatcher
        .broadcast(channel_id, ChannelEvent::Delete { id: message_id })
        .await;
    debug!("Deletion of message {} pushed to {} sockets", message_id, delivered);

    Ok(Json(MessageAck::new("Message deleted")))
}
