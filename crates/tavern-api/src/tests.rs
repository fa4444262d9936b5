use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use tavern_db::Database;
use tavern_db::models::NewMessage;
use tavern_gateway::Dispatcher;
use tavern_gateway::dispatcher::Outbound;
use tavern_types::events::ChannelEvent;

use crate::auth::{AppState, AppStateInner};
use crate::router;

fn test_state() -> AppState {
    Arc::new(AppStateInner {
        db: Arc::new(Database::open_in_memory().unwrap()),
        dispatcher: Dispatcher::new(),
        jwt_secret: "test-secret".into(),
        jwt_ttl: chrono::Duration::days(1),
        online_threshold: chrono::Duration::minutes(5),
        upload_dir: std::env::temp_dir().join(format!("tavern-uploads-{}", Uuid::new_v4())),
        static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../static")),
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register and log in a chat user, returning (user_id, session token).
async fn sign_up(app: &Router, username: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/register",
        Some(json!({
            "username": username,
            "password": "hunter22",
            "display_name": username.to_uppercase(),
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let user_id = body["user_id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        Method::POST,
        "/login",
        Some(json!({ "username": username, "password": "hunter22" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (user_id, body["token"].as_str().unwrap().to_string())
}

async fn seed_channel(app: &Router) -> i64 {
    let (_, body) = send(
        app,
        Method::POST,
        "/create-server",
        Some(json!({ "name": "Realm" })),
        None,
    )
    .await;
    let server = body["server"].as_i64().unwrap();
    let (_, body) = send(
        app,
        Method::POST,
        "/create-channel",
        Some(json!({ "server_id": server, "name": "tavern" })),
        None,
    )
    .await;
    body["channel"].as_i64().unwrap()
}

fn post_message(state: &AppState, user_id: i64, channel_id: i64, content: &str) -> i64 {
    let channel = state.db.get_channel(channel_id).unwrap().unwrap();
    state
        .db
        .insert_message(&NewMessage {
            user_id,
            server_id: channel.server_id,
            channel_id,
            content,
            timestamp: chrono::Utc::now().naive_utc(),
            is_action: false,
            alternate_id: 0,
        })
        .unwrap()
}

#[tokio::test]
async fn register_login_and_get_self() {
    let app = router(test_state());
    let (user_id, token) = sign_up(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/get-self",
        Some(json!({ "token": token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["display_name"], "ALICE");
    assert_eq!(body["profile_picture"], "hidden.png");
}

#[tokio::test]
async fn duplicate_username_and_bad_password_are_rejected() {
    let app = router(test_state());
    sign_up(&app, "bob").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        Some(json!({ "username": "bob", "password": "x", "display_name": "Bob" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username already exists");

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "bob", "password": "wrong" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid credentials");
}

#[tokio::test]
async fn logout_invalidates_token_and_marks_offline() {
    let app = router(test_state());
    let (_, token) = sign_up(&app, "carol").await;

    let (_, users) = send(&app, Method::GET, "/users", None, None).await;
    assert_eq!(users[0]["online"], true);

    let (status, _) = send(
        &app,
        Method::POST,
        "/logout",
        Some(json!({ "token": token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/get-self",
        Some(json!({ "token": token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid token");

    let (_, users) = send(&app, Method::GET, "/users", None, None).await;
    assert_eq!(users[0]["online"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/logout",
        Some(json!({ "token": token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_activity_is_reported_offline() {
    let state = test_state();
    let app = router(state.clone());
    let (user_id, _) = sign_up(&app, "dora").await;

    let long_ago = chrono::Utc::now().naive_utc() - chrono::Duration::minutes(30);
    state.db.touch_user(user_id, long_ago).unwrap();

    let (_, users) = send(&app, Method::GET, "/users", None, None).await;
    assert_eq!(users[0]["online"], false);
}

#[tokio::test]
async fn profile_updates_skip_empty_fields_and_reject_taken_names() {
    let app = router(test_state());
    let (_, token) = sign_up(&app, "erin").await;
    sign_up(&app, "frank").await;

    let uri = format!("/update-profile?token={}&username=&display_name=Erin%20the%20Bold", token);
    let (status, _) = send(&app, Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = send(
        &app,
        Method::POST,
        "/get-self",
        Some(json!({ "token": token })),
        None,
    )
    .await;
    assert_eq!(me["username"], "erin");
    assert_eq!(me["display_name"], "Erin the Bold");

    let uri = format!("/update-profile?token={}&username=frank", token);
    let (status, body) = send(&app, Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username already exists");
}

#[tokio::test]
async fn profile_picture_requires_url() {
    let app = router(test_state());
    let (_, token) = sign_up(&app, "gwen").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/upload-profile-picture",
        Some(json!({ "token": token })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Image URL is required");

    let (status, _) = send(
        &app,
        Method::POST,
        "/upload-profile-picture",
        Some(json!({ "token": token, "image_url": "/uploads/gwen.png" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = send(
        &app,
        Method::POST,
        "/get-self",
        Some(json!({ "token": token })),
        None,
    )
    .await;
    assert_eq!(me["profile_picture"], "/uploads/gwen.png");
}

#[tokio::test]
async fn channels_require_existing_server() {
    let app = router(test_state());
    let channel = seed_channel(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/create-channel",
        Some(json!({ "server_id": 999, "name": "void" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Server not found");

    let (_, servers) = send(&app, Method::GET, "/servers", None, None).await;
    let server_id = servers[0]["id"].as_i64().unwrap();
    let (_, channels) = send(
        &app,
        Method::GET,
        &format!("/channels?server_id={}", server_id),
        None,
        None,
    )
    .await;
    assert_eq!(channels, json!([{ "id": channel, "name": "tavern", "server_id": server_id }]));
}

#[tokio::test]
async fn alternates_are_capped_and_owned() {
    let app = router(test_state());
    let (_, token) = sign_up(&app, "hal").await;
    let (_, other_token) = sign_up(&app, "ivy").await;

    let mut first = 0;
    for i in 0..20 {
        let (status, body) = send(
            &app,
            Method::POST,
            "/create-alternate",
            Some(json!({ "token": token, "name": format!("Alt {}", i) })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        if i == 0 {
            first = body["alternate_id"].as_i64().unwrap();
        }
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/create-alternate",
        Some(json!({ "token": token, "name": "One too many" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Maximum of 20 alternates allowed");

    let uri = format!("/delete-alternate?token={}&alternate_id={}", other_token, first);
    let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/delete-alternate?token={}&alternate_id={}", token, first);
    let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, users) = send(&app, Method::GET, "/users", None, None).await;
    assert_eq!(users[0]["alternates"].as_array().unwrap().len(), 19);
}

#[tokio::test]
async fn messages_list_uses_alternate_persona() {
    let state = test_state();
    let app = router(state.clone());
    let (user_id, token) = sign_up(&app, "jack").await;
    let channel = seed_channel(&app).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/create-alternate",
        Some(json!({ "token": token, "name": "Captain", "icon": "/uploads/cap.png" })),
        None,
    )
    .await;
    let alternate_id = body["alternate_id"].as_i64().unwrap();

    post_message(&state, user_id, channel, "plain");
    let channel_row = state.db.get_channel(channel).unwrap().unwrap();
    state
        .db
        .insert_message(&NewMessage {
            user_id,
            server_id: channel_row.server_id,
            channel_id: channel,
            content: "salutes",
            timestamp: chrono::Utc::now().naive_utc(),
            is_action: true,
            alternate_id,
        })
        .unwrap();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/messages?channel_id={}", channel),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["display_name"], "JACK");
    assert_eq!(messages[0]["profile_picture"], "hidden.png");
    assert_eq!(messages[1]["display_name"], "Captain");
    assert_eq!(messages[1]["profile_picture"], "/uploads/cap.png");
    assert_eq!(messages[1]["is_action"], true);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/messages?channel_id={}&limit=1", channel),
        None,
        None,
    )
    .await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["content"], "salutes");
}

#[tokio::test]
async fn edit_message_checks_owner_and_broadcasts() {
    let state = test_state();
    let app = router(state.clone());
    let (user_id, token) = sign_up(&app, "kate").await;
    let (_, other_token) = sign_up(&app, "liam").await;
    let channel = seed_channel(&app).await;
    let message_id = post_message(&state, user_id, channel, "helo");

    let mut listener = state.dispatcher.join(channel).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/edit-message",
        Some(json!({ "token": other_token, "message_id": message_id, "new_content": "hijacked" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "You can only edit your own messages");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/edit-message",
        Some(json!({ "token": token, "message_id": message_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Message ID and new content are required");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/edit-message",
        Some(json!({ "token": token, "message_id": message_id, "new_content": "hello" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_content"], "hello");

    assert_eq!(
        listener.rx.recv().await,
        Some(Outbound::Event(ChannelEvent::Edit {
            id: message_id,
            new_content: "hello".into(),
            is_edited: true,
        }))
    );
    assert!(state.db.get_message(message_id).unwrap().unwrap().is_edited);
}

#[tokio::test]
async fn delete_message_broadcasts_removal() {
    let state = test_state();
    let app = router(state.clone());
    let (user_id, token) = sign_up(&app, "mia").await;
    let channel = seed_channel(&app).await;
    let message_id = post_message(&state, user_id, channel, "oops");

    let mut listener = state.dispatcher.join(channel).await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/delete-message",
        Some(json!({ "token": token, "message_id": message_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        listener.rx.recv().await,
        Some(Outbound::Event(ChannelEvent::Delete { id: message_id }))
    );

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/delete-message",
        Some(json!({ "token": token, "message_id": message_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Message not found");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/edit-message",
        Some(json!({ "token": token, "message_id": message_id, "new_content": "back" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Message not found");
    assert!(listener.rx.try_recv().is_err());
}

#[tokio::test]
async fn private_messages_round_trip() {
    let app = router(test_state());
    let (nora_id, nora) = sign_up(&app, "nora").await;
    let (otto_id, otto) = sign_up(&app, "otto").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/send-private",
        Some(json!({ "token": nora, "receiver_id": otto_id, "content": "psst" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let pm_id = body["pm_id"].as_i64().unwrap();

    send(
        &app,
        Method::POST,
        "/send-private",
        Some(json!({ "token": otto, "receiver_id": nora_id, "content": "what?" })),
        None,
    )
    .await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/send-private",
        Some(json!({ "token": nora, "receiver_id": 9999, "content": "hello?" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Receiver not found");

    let uri = format!("/private-messages?token={}&other_user_id={}", otto, nora_id);
    let (_, body) = send(&app, Method::GET, &uri, None, None).await;
    let convo = body["private_messages"].as_array().unwrap();
    assert_eq!(convo.len(), 2);
    assert_eq!(convo[0]["content"], "psst");
    assert_eq!(convo[1]["sender_id"], otto_id);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/edit-private",
        Some(json!({ "token": otto, "pm_id": pm_id, "new_content": "forged" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/edit-private",
        Some(json!({ "token": nora, "pm_id": pm_id, "new_content": "psst!" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/delete-private",
        Some(json!({ "token": nora, "pm_id": pm_id })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(body["private_messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn blog_posts_enforce_auth_length_and_ownership() {
    let app = router(test_state());

    for name in ["poet", "critic"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/blog/register",
            Some(json!({ "username": name, "password": "verses" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/blog/login",
        Some(json!({ "username": "poet", "password": "nope" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid credentials");

    let (_, body) = send(
        &app,
        Method::POST,
        "/blog/login",
        Some(json!({ "username": "poet", "password": "verses" })),
        None,
    )
    .await;
    let poet = body["token"].as_str().unwrap().to_string();
    let (_, body) = send(
        &app,
        Method::POST,
        "/blog/login",
        Some(json!({ "username": "critic", "password": "verses" })),
        None,
    )
    .await;
    let critic = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/blog/post",
        Some(json!({ "content": "anon" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/blog/post",
        Some(json!({ "content": "x".repeat(501) })),
        Some(&poet),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/blog/post",
        Some(json!({ "content": "Roses are red" })),
        Some(&poet),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = body["id"].as_i64().unwrap();

    let (_, posts) = send(&app, Method::GET, "/blog/posts", None, None).await;
    assert_eq!(posts[0]["username"], "poet");
    assert_eq!(posts[0]["content"], "Roses are red");

    let uri = format!("/blog/posts/{}", post_id);
    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "content": "meh" })),
        Some(&critic),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &uri, None, Some(&critic)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "content": "Violets are blue" })),
        Some(&poet),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Violets are blue");
    assert!(!body["updated_at"].is_null());

    let (status, _) = send(&app, Method::DELETE, &uri, None, Some(&poet)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Post not found");

    // Edits of a post that is already gone report it missing
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "content": "again" })),
        Some(&poet),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Post not found");
    let (status, _) = send(&app, Method::DELETE, &uri, None, Some(&poet)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blog_post_content_only_needs_one_character() {
    let app = router(test_state());
    send(
        &app,
        Method::POST,
        "/blog/register",
        Some(json!({ "username": "mime", "password": "silence" })),
        None,
    )
    .await;
    let (_, body) = send(
        &app,
        Method::POST,
        "/blog/login",
        Some(json!({ "username": "mime", "password": "silence" })),
        None,
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/blog/post",
        Some(json!({ "content": "" })),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Content is required");

    let (status, _) = send(
        &app,
        Method::POST,
        "/blog/post",
        Some(json!({ "content": "   " })),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/blog/post",
        Some(json!({ "content": "x".repeat(500) })),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn malformed_requests_render_detail() {
    let app = router(test_state());

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        Some(json!({ "username": "half" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("password"), "{body}");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value =
        serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    assert!(body["detail"].is_string());

    let (status, body) = send(&app, Method::POST, "/login", None, None).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["detail"].is_string());

    let (status, body) = send(&app, Method::GET, "/blog/posts/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, body) = send(&app, Method::GET, "/messages?channel_id=nope", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn chat_page_and_default_avatar_are_served() {
    let app = router(test_state());

    for (uri, mime) in [("/chat", "text/html"), ("/hidden.png", "image/png")] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with(mime), "{uri}: {content_type}");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(!bytes.is_empty());
    }
}

#[tokio::test]
async fn image_upload_is_stored_and_served() {
    let state = test_state();
    let app = router(state.clone());
    let png = b"\x89PNG\r\n\x1a\nnot-really-a-png".to_vec();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload-image")
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(png.clone()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value =
        serde_json::from_slice(&response.into_body().collect().await.unwrap().to_bytes()).unwrap();
    let url = body["image_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    let request = Request::builder().uri(&url).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(served.as_ref(), png.as_slice());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload-image")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let _ = std::fs::remove_dir_all(&state.upload_dir);
}
