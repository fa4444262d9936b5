pub mod api;
pub mod events;

/// Picture reported for users and alternates without one.
pub const DEFAULT_PROFILE_PICTURE: &str = "hidden.png";

/// Upper bound on alternates linked to a single user.
pub const MAX_ALTERNATES: usize = 20;

/// Upper bound on microblog post length, in characters.
pub const MAX_POST_LENGTH: usize = 500;
