use axum::extract::{Json, Path, State};

use crate::{
    AppState,
    database::ProfileUpdate,
    error::AppError,
    middleware::CurrentUser,
    result::ApiResponse,
    routes::auth::AuthResponse,
    user::PublicProfile,
    utils::success_to_api_response,
};

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PublicProfile>>, AppError> {
    let profile = state
        .users
        .public_profile(&id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(success_to_api_response(profile))
}

#[axum::debug_handler]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".into()));
    }

    let user = state.users.update_profile(&user.id, update).await?;
    Ok(success_to_api_response(AuthResponse { user }))
}
