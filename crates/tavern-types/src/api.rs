use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Claims carried by microblog bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

/// Generic `{ "message": ... }` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageAck {
    pub message: String,
}

impl MessageAck {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Accounts --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelfResponse {
    pub username: String,
    pub id: i64,
    pub display_name: String,
    pub profile_picture: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfilePictureRequest {
    pub token: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfilePictureResponse {
    pub message: String,
    pub image_url: String,
}

/// Query string of `POST /update-profile`. Empty fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileQuery {
    pub token: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternateSummary {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub online: bool,
    pub profile_picture: Option<String>,
    pub alternates: Vec<AlternateSummary>,
}

// -- Alternates --

#[derive(Debug, Deserialize)]
pub struct CreateAlternateRequest {
    pub token: String,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAlternateResponse {
    pub message: String,
    pub alternate_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAlternateQuery {
    pub token: String,
    pub alternate_id: i64,
}

// -- Servers & channels --

#[derive(Debug, Deserialize)]
pub struct CreateServerRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateServerResponse {
    pub message: String,
    pub server: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub server_id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChannelResponse {
    pub message: String,
    pub channel: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: i64,
    pub name: String,
    pub server_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChannelsQuery {
    pub server_id: i64,
}

// -- Channel messages --

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub channel_id: i64,
    /// Only return messages with an id lower than this one.
    pub before: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub profile_picture: String,
    pub content: String,
    pub timestamp: NaiveDateTime,
    pub is_action: bool,
    pub is_edited: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub token: String,
    pub message_id: Option<i64>,
    pub new_content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditMessageResponse {
    pub message: String,
    pub new_content: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMessageRequest {
    pub token: String,
    pub message_id: Option<i64>,
}

// -- Private messages --

#[derive(Debug, Deserialize)]
pub struct SendPrivateRequest {
    pub token: String,
    pub receiver_id: i64,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendPrivateResponse {
    pub message: String,
    pub pm_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PrivateMessagesQuery {
    pub token: String,
    pub other_user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrivateMessageView {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub timestamp: NaiveDateTime,
    pub is_edited: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrivateMessagesResponse {
    pub private_messages: Vec<PrivateMessageView>,
}

#[derive(Debug, Deserialize)]
pub struct EditPrivateRequest {
    pub token: String,
    pub pm_id: Option<i64>,
    pub new_content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePrivateRequest {
    pub token: String,
    pub pm_id: Option<i64>,
}

// -- Uploads --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub image_url: String,
}

// -- Microblog --

#[derive(Debug, Deserialize)]
pub struct BlogRegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlogTokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostCreatedResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub username: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}
