//! Permission probes for UI gating

use axum::{extract::State, http::StatusCode, Extension, Json};

use weld_core::SpaceId;

use crate::dto::{ApiResponse, BatchPermissionsRequest, BatchPermissionsResponse};
use crate::handlers::{error_response, parse_id, success};
use crate::middleware::AuthContext;
use crate::state::AppState;

/// Probe every space permission for the calling user in one round trip.
pub async fn batch_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<BatchPermissionsRequest>,
) -> Result<Json<ApiResponse<BatchPermissionsResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let space_id: SpaceId = parse_id(&request.space_id, "space")?;

    match state
        .space_service
        .permissions_for(auth.user_id, space_id)
        .await
    {
        Ok(permissions) => Ok(success(BatchPermissionsResponse {
            space_id: request.space_id,
            permissions,
        })),
        Err(e) => Err(error_response(&e)),
    }
}
