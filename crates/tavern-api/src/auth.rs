use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::extract::State;
use tracing::{error, info};
use uuid::Uuid;

use tavern_db::Database;
use tavern_db::models::UserRow;
use tavern_gateway::Dispatcher;
use tavern_types::DEFAULT_PROFILE_PICTURE;
use tavern_types::api::{
    LoginRequest, LoginResponse, MessageAck, RegisterRequest, RegisterResponse, SelfResponse,
    TokenRequest,
};

use crate::error::ApiError;
use crate::extract::Json;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    pub jwt_ttl: chrono::Duration,
    /// A user counts as online only if active within this window.
    pub online_threshold: chrono::Duration,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl AppStateInner {
    /// Run a blocking database call off the async runtime.
    pub async fn with_db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || f(&db)).await.map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("database task failed")
        })?;

        Ok(result?)
    }

    /// Resolve a session token, failing with 400 "Invalid token".
    pub async fn session_user(&self, token: &str) -> Result<UserRow, ApiError> {
        let token = token.to_string();
        self.with_db(move |db| db.user_for_token(&token))
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid token"))
    }
}

pub(crate) fn validate_username(username: &str, max_len: usize) -> Result<(), ApiError> {
    let len = username.chars().count();
    if username.trim().is_empty() || len > max_len {
        return Err(ApiError::bad_request(format!(
            "Username must be between 1 and {} characters",
            max_len
        )));
    }
    Ok(())
}

pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    validate_username(&req.username, 32)?;
    if req.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    let display_name = if req.display_name.trim().is_empty() {
        req.username.clone()
    } else {
        req.display_name.clone()
    };

    let password_hash = hash_password(&req.password)?;
    let username = req.username.clone();
    let user_id = state
        .with_db(move |db| {
            if db.get_user_by_username(&username)?.is_some() {
                return Ok(None);
            }
            db.create_user(&username, &display_name, &password_hash).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::bad_request("Username already exists"))?;

    info!("Registered user {} ({})", req.username, user_id);

    Ok(Json(RegisterResponse {
        message: "User registered successfully".into(),
        user_id,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = req.username.clone();
    let user = state
        .with_db(move |db| db.get_user_by_username(&username))
        .await?
        .filter(|user| verify_password(&req.password, &user.password))
        .ok_or_else(|| ApiError::bad_request("Invalid credentials"))?;

    let token = Uuid::new_v4().to_string();
    let session = token.clone();
    let user_id = user.id;
    state
        .with_db(move |db| {
            db.touch_user(user_id, chrono::Utc::now().naive_utc())?;
            db.create_token(user_id, &session)
        })
        .await?;

    info!("{} ({}) logged in", user.username, user.id);

    Ok(Json(LoginResponse {
        message: "Logged in".into(),
        token,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<MessageAck>, ApiError> {
    let user_id = state
        .with_db(move |db| db.delete_token(&req.token))
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    info!("User {} logged out", user_id);
    Ok(Json(MessageAck::new("Logged out")))
}

pub async fn get_self(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<SelfResponse>, ApiError> {
    let user = state.session_user(&req.token).await?;

    Ok(Json(SelfResponse {
        username: user.username,
        id: user.id,
        display_name: user.display_name,
        profile_picture: user
            .profile_picture
            .unwrap_or_else(|| DEFAULT_PROFILE_PICTURE.to_string()),
    }))
}
