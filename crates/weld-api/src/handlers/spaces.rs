//! Space management handlers
//!
//! Thin wrappers over [`SpaceService`]; permission checks happen in the
//! service, not here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use weld_core::{Space, SpaceId, SpaceRepository, UserId, WeldError};

use crate::dto::{
    AddMemberRequest, ApiResponse, ChangeModeratorRequest, CreateSpaceRequest, RenameSpaceRequest,
    SpaceResponse,
};
use crate::handlers::{error_response, parse_id, success};
use crate::middleware::AuthContext;
use crate::state::AppState;

/// Create a space. The moderator defaults to the calling user.
pub async fn create_space(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateSpaceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SpaceResponse>>), (StatusCode, Json<ApiResponse<()>>)> {
    let moderator: UserId = match &request.moderator_user_id {
        Some(id) => parse_id(id, "user")?,
        None => auth.user_id,
    };

    match state
        .space_service
        .create_space(auth.user_id, &request.name, moderator)
        .await
    {
        Ok(space) => Ok((StatusCode::CREATED, success(space_to_response(&space)))),
        Err(e) => Err(error_response(&e)),
    }
}

/// Fetch a space by id. Soft-deleted spaces read as absent.
pub async fn get_space(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SpaceResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let space_id: SpaceId = parse_id(&id, "space")?;

    match state.spaces.get_by_id(space_id).await {
        Ok(Some(space)) => Ok(success(space_to_response(&space))),
        Ok(None) => Err(error_response(&WeldError::not_found("space", id))),
        Err(e) => Err(error_response(&e)),
    }
}

pub async fn rename_space(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(request): Json<RenameSpaceRequest>,
) -> Result<Json<ApiResponse<SpaceResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let space_id: SpaceId = parse_id(&id, "space")?;

    match state
        .space_service
        .rename_space(auth.user_id, space_id, &request.name)
        .await
    {
        Ok(space) => Ok(success(space_to_response(&space))),
        Err(e) => Err(error_response(&e)),
    }
}

pub async fn delete_space(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiResponse<()>>)> {
    let space_id: SpaceId = parse_id(&id, "space")?;

    match state.space_service.delete_space(auth.user_id, space_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(error_response(&e)),
    }
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiResponse<()>>)> {
    let space_id: SpaceId = parse_id(&id, "space")?;
    let user_id: UserId = parse_id(&request.user_id, "user")?;

    match state
        .space_service
        .add_member(auth.user_id, space_id, user_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(error_response(&e)),
    }
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, Json<ApiResponse<()>>)> {
    let space_id: SpaceId = parse_id(&id, "space")?;
    let user_id: UserId = parse_id(&user_id, "user")?;

    match state
        .space_service
        .remove_member(auth.user_id, space_id, user_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(error_response(&e)),
    }
}

/// Hand the space to a new moderator. Org-admin only; the promote and
/// demote tuples swap atomically in the store.
pub async fn change_moderator(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(request): Json<ChangeModeratorRequest>,
) -> Result<Json<ApiResponse<SpaceResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    let space_id: SpaceId = parse_id(&id, "space")?;
    let new_moderator: UserId = parse_id(&request.user_id, "user")?;

    match state
        .space_service
        .change_moderator(auth.user_id, space_id, new_moderator)
        .await
    {
        Ok(space) => Ok(success(space_to_response(&space))),
        Err(e) => Err(error_response(&e)),
    }
}

fn space_to_response(space: &Space) -> SpaceResponse {
    // Sorted so responses are stable across calls.
    let mut member_ids: Vec<String> = space.member_ids.iter().map(|id| id.to_string()).collect();
    member_ids.sort();

    SpaceResponse {
        id: space.id.to_string(),
        name: space.name.clone(),
        moderator_user_id: space.moderator_user_id.to_string(),
        member_ids,
        created_at: space.created_at.to_rfc3339(),
        updated_at: space.updated_at.to_rfc3339(),
    }
}
