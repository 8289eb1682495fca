//! Authenticated-principal handlers

use axum::{extract::State, http::StatusCode, Extension, Json};

use weld_core::{User, UserRepository, UserStatus, WeldError};

use crate::dto::{ApiResponse, UserResponse};
use crate::handlers::{error_response, success};
use crate::middleware::AuthContext;
use crate::state::AppState;

/// Profile of the calling user. The login middleware has already run
/// the reconciliation, so the row exists by the time this executes.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.users.get_by_id(auth.user_id).await {
        Ok(Some(user)) => Ok(success(user_to_response(&user))),
        Ok(None) => Err(error_response(&WeldError::not_found(
            "user",
            auth.user_id.to_string(),
        ))),
        Err(e) => Err(error_response(&e)),
    }
}

fn user_to_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        picture_url: user.picture_url.clone(),
        status: match user.status {
            UserStatus::Active => "active",
            UserStatus::Invited => "invited",
        }
        .to_string(),
        created_at: user.created_at.to_rfc3339(),
        updated_at: user.updated_at.to_rfc3339(),
    }
}
