use std::collections::HashMap;

use axum::extract::State;

use tavern_types::api::{
    AlternateSummary, MessageAck, ProfilePictureRequest, ProfilePictureResponse,
    UpdateProfileQuery, UserSummary,
};

use crate::auth::{AppState, validate_username};
use crate::error::ApiError;
use crate::extract::{Json, Query};

pub async fn upload_profile_picture(
    State(state): State<AppState>,
    Json(req): Json<ProfilePictureRequest>,
) -> Result<Json<ProfilePictureResponse>, ApiError> {
    let user = state.session_user(&req.token).await?;

    let image_url = req
        .image_url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Image URL is required"))?;

    let url = image_url.clone();
    state
        .with_db(move |db| db.set_profile_picture(user.id, &url))
        .await?;

    Ok(Json(ProfilePictureResponse {
        message: "Profile picture updated".into(),
        image_url,
    }))
}

/// `POST /update-profile?token=..&username=..&display_name=..`
pub async fn update_profile(
    State(state): State<AppState>,
    Query(query): Query<UpdateProfileQuery>,
) -> Result<Json<MessageAck>, ApiError> {
    let user = state.session_user(&query.token).await?;

    let username = query.username.filter(|s| !s.is_empty());
    let display_name = query.display_name.filter(|s| !s.is_empty());

    if let Some(username) = &username {
        validate_username(username, 32)?;
    }

    let user_id = user.id;
    let updated = state
        .with_db(move |db| {
            if let Some(username) = &username {
                let taken = db
                    .get_user_by_username(username)?
                    .is_some_and(|other| other.id != user_id);
                if taken {
                    return Ok(false);
                }
            }
            db.update_profile(user_id, username.as_deref(), display_name.as_deref())?;
            Ok(true)
        })
        .await?;

    if !updated {
        return Err(ApiError::bad_request("Username already exists"));
    }

    Ok(Json(MessageAck::new("Profile updated")))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let (users, alternates) = state
        .with_db(|db| Ok((db.list_users()?, db.list_linked_alternates()?)))
        .await?;

    let mut by_owner: HashMap<i64, Vec<AlternateSummary>> = HashMap::new();
    for alt in alternates {
        if let Some(owner) = alt.user_id {
            by_owner.entry(owner).or_default().push(AlternateSummary {
                id: alt.id,
                name: alt.name,
                icon: alt.icon,
            });
        }
    }

    let now = chrono::Utc::now().naive_utc();
    let summaries = users
        .into_iter()
        .map(|user| {
            let recently_active = user
                .last_active
                .is_some_and(|seen| now - seen <= state.online_threshold);

            UserSummary {
                id: user.id,
                online: user.online && recently_active,
                alternates: by_owner.remove(&user.id).unwrap_or_default(),
                username: user.username,
                display_name: user.display_name,
                profile_picture: user.profile_picture,
            }
        })
        .collect();

    Ok(Json(summaries))
}
