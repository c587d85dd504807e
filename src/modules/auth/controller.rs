use axum::Json;
use axum::extract::State;
use secureload_core::AppError;
use secureload_models::{LoginRequest, RefreshTokenRequest, TokenPair};
use tracing::instrument;

use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Exchange username and password for an access/refresh pair.
#[instrument(skip(state, dto), fields(username = %dto.username))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state.auth_handler.login(&dto.into()).await?;
    Ok(Json(pair))
}

#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state.auth_handler.refresh(&dto.refresh).await?;
    Ok(Json(pair))
}
