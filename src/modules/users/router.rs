use axum::{
    Router,
    routing::{get, post},
};

use super::controller::{
    create_user, get_profile, get_user, get_users, update_profile, update_user, user_exists,
};
use crate::state::AppState;

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).patch(update_profile))
        .route("/users", get(get_users).post(create_user))
        .route("/users/{id}", get(get_user).patch(update_user))
        .route("/users-exists", post(user_exists))
}
