use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use tavern_db::models::PostRow;
use tavern_types::MAX_POST_LENGTH;
use tavern_types::api::{
    BlogRegisterRequest, BlogTokenResponse, Claims, LoginRequest, MessageAck, PostCreatedResponse,
    PostRequest, PostView,
};

use crate::auth::{AppState, hash_password, validate_username, verify_password};
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::middleware::create_token;

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.is_empty() {
        return Err(ApiError::bad_request("Content is required"));
    }
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Content must be at most {} characters",
            MAX_POST_LENGTH
        )));
    }
    Ok(())
}

fn post_view(row: PostRow) -> PostView {
    PostView {
        id: row.id,
        content: row.content,
        user_id: row.user_id,
        username: row.username,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<BlogRegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_username(&req.username, 80)?;
    if req.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    let password_hash = hash_password(&req.password)?;
    let username = req.username.clone();
    state
        .with_db(move |db| {
            if db.get_user_by_username(&username)?.is_some() {
                return Ok(None);
            }
            db.create_user(&username, &username, &password_hash).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::bad_request("Username already exists"))?;

    info!("Registered blog user {}", req.username);

    Ok((
        StatusCode::CREATED,
        Json(MessageAck::new("User registered successfully")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<BlogTokenResponse>, ApiError> {
    let username = req.username.clone();
    let user = state
        .with_db(move |db| db.get_user_by_username(&username))
        .await?
        .filter(|user| verify_password(&req.password, &user.password))
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    let token = create_token(&state.jwt_secret, state.jwt_ttl, user.id, &user.username)?;
    Ok(Json(BlogTokenResponse { token }))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_content(&req.content)?;

    let user_id = claims.sub;
    let id = state
        .with_db(move |db| {
            if db.get_user_by_id(user_id)?.is_none() {
                return Ok(None);
            }
            db.insert_post(user_id, &req.content, chrono::Utc::now().naive_utc())
                .map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok((
        StatusCode::CREATED,
        Json(PostCreatedResponse {
            message: "Post created".into(),
            id,
        }),
    ))
}

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostView>>, ApiError> {
    let rows = state.with_db(|db| db.list_posts()).await?;
    Ok(Json(rows.into_iter().map(post_view).collect()))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<PostView>, ApiError> {
    let row = state
        .with_db(move |db| db.get_post(post_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(post_view(row)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostRequest>,
) -> Result<Json<PostView>, ApiError> {
    validate_content(&req.content)?;

    let user_id = claims.sub;
    let updated = state
        .with_db(move |db| {
            let Some(post) = db.get_post(post_id)? else {
                return Ok(Err(ApiError::not_found("Post not found")));
            };
            if post.user_id != user_id {
                return Ok(Err(ApiError::forbidden("You can only edit your own posts")));
            }
            let now = chrono::Utc::now().naive_utc();
            if !db.update_post(post_id, user_id, &req.content, now)? {
                return Ok(Err(ApiError::not_found("Post not found")));
            }
            Ok(db.get_post(post_id)?.ok_or_else(|| ApiError::not_found("Post not found")))
        })
        .await??;

    Ok(Json(post_view(updated)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageAck>, ApiError> {
    let user_id = claims.sub;
    state
        .with_db(move |db| {
            let Some(post) = db.get_post(post_id)? else {
                return Ok(Err(ApiError::not_found("Post not found")));
            };
            if post.user_id != user_id {
                return Ok(Err(ApiError::forbidden("You can only delete your own posts")));
            }
            if !db.delete_post(post_id, user_id)? {
                return Ok(Err(ApiError::not_found("Post not found")));
            }
            Ok(Ok(()))
        })
        .await??;

    info!("{} deleted post {}", claims.username, post_id);
    Ok(Json(MessageAck::new("Post deleted")))
}
