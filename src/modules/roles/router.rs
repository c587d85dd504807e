use axum::{Router, routing::get};

use super::controller::{
    create_permission, create_role, delete_role, get_permissions, get_role, get_roles,
    update_role,
};
use crate::state::AppState;

pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(get_roles).post(create_role))
        .route(
            "/roles/{id}",
            get(get_role).patch(update_role).delete(delete_role),
        )
        .route("/permissions", get(get_permissions).post(create_permission))
}
