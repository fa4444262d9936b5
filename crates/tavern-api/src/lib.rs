pub mod alternates;
pub mod auth;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod private;
pub mod servers;
pub mod uploads;
pub mod users;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use tower_http::services::{ServeDir, ServeFile};

use crate::auth::AppState;
use crate::middleware::require_jwt;

/// All REST and static-file routes. The WebSocket route is mounted by the server.
pub fn router(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/get-self", post(auth::get_self))
        .route("/upload-profile-picture", post(users::upload_profile_picture))
        .route("/update-profile", post(users::update_profile))
        .route("/users", get(users::list_users))
        .route("/create-alternate", post(alternates::create_alternate))
        .route("/delete-alternate", delete(alternates::delete_alternate))
        .route("/create-server", post(servers::create_server))
        .route("/create-channel", post(servers::create_channel))
        .route("/servers", get(servers::list_servers))
        .route("/channels", get(servers::list_channels))
        .route("/messages", get(messages::get_messages))
        .route("/edit-message", put(messages::edit_message))
        .route("/delete-message", delete(messages::delete_message))
        .route("/send-private", post(private::send_private))
        .route("/private-messages", get(private::get_private_messages))
        .route("/edit-private", put(private::edit_private))
        .route("/delete-private", delete(private::delete_private))
        .route(
            "/upload-image",
            post(uploads::upload_image).layer(DefaultBodyLimit::max(uploads::MAX_IMAGE_SIZE)),
        );

    let blog_public = Router::new()
        .route("/register", post(posts::register))
        .route("/login", post(posts::login))
        .route("/posts", get(posts::list_posts))
        .route("/posts/{post_id}", get(posts::get_post));

    let blog_protected = Router::new()
        .route("/post", post(posts::create_post))
        .route(
            "/posts/{post_id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_jwt));

    let static_routes = Router::new()
        .nest_service("/uploads", ServeDir::new(&state.upload_dir))
        .route_service("/chat", ServeFile::new(state.static_dir.join("hi.html")))
        .route_service(
            "/hidden.png",
            ServeFile::new(state.static_dir.join("hidden.png")),
        );

    Router::new()
        .merge(chat_routes)
        .nest("/blog", blog_public.merge(blog_protected))
        .merge(static_routes)
        .with_state(state)
}
