//! Group-mapping administration handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use weld_core::{GroupMappingId, GroupSpaceMapping, SpaceId};

use crate::dto::{AddMappingRequest, ApiResponse, MappingResponse};
use crate::handlers::{error_response, parse_id, success};
use crate::middleware::AuthContext;
use crate::state::AppState;

/// List every mapping row, active and retired.
pub async fn list_mappings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<MappingResponse>>>, (StatusCode, Json<ApiResponse<()>>)> {
    match state.mapping_service.list(auth.user_id).await {
        Ok(mappings) => Ok(success(mappings.iter().map(mapping_to_response).collect())),
        Err(e) => Err(error_response(&e)),
    }
}

/// Point a group key at a space. A previously active mapping for the
/// same key is retired first.
pub async fn add_mapping(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<AddMappingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MappingResponse>>), (StatusCode, Json<ApiResponse<()>>)>
{
    let space_id: SpaceId = parse_id(&request.space_id, "space")?;

    match state
        .mapping_service
        .add_mapping(auth.user_id, &request.group_key, space_id)
        .await
    {
        Ok(mapping) => Ok((StatusCode::CREATED, success(mapping_to_response(&mapping)))),
        Err(e) => Err(error_response(&e)),
    }
}

pub async fn deactivate_mapping(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiResponse<()>>)> {
    let mapping_id: GroupMappingId = parse_id(&id, "mapping")?;

    match state
        .mapping_service
        .deactivate_mapping(auth.user_id, mapping_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(error_response(&e)),
    }
}

fn mapping_to_response(mapping: &GroupSpaceMapping) -> MappingResponse {
    MappingResponse {
        id: mapping.id.to_string(),
        group_key: mapping.group_key.clone(),
        space_id: mapping.space_id.to_string(),
        is_active: mapping.is_active,
        created_by: mapping.created_by.to_string(),
        updated_by: mapping.updated_by.map(|id| id.to_string()),
        created_at: mapping.created_at.to_rfc3339(),
        updated_at: mapping.updated_at.to_rfc3339(),
    }
}
