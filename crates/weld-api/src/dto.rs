//! Request and response shapes for the HTTP surface

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use weld_core::AuthRelation;

// ============================================================================
// Generic Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

// ============================================================================
// Space DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSpaceRequest {
    pub name: String,
    /// Defaults to the calling user when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenameSpaceRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangeModeratorRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpaceResponse {
    pub id: String,
    pub name: String,
    pub moderator_user_id: String,
    pub member_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// Group-Mapping DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AddMappingRequest {
    pub group_key: String,
    pub space_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MappingResponse {
    pub id: String,
    pub group_key: String,
    pub space_id: String,
    pub is_active: bool,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// User & Permission DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPermissionsRequest {
    pub space_id: String,
}

/// Outcome of probing every space permission for the calling user.
/// Keys are the snake_case relation names from the relationship model.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPermissionsResponse {
    pub space_id: String,
    pub permissions: HashMap<AuthRelation, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_omits_empty_fields() {
        let response: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code: "NOT_FOUND".to_string(),
                message: "space not found".to_string(),
                details: None,
            }),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("\"data\""));
        assert!(!json.contains("\"details\""));
        assert!(json.contains("\"code\":\"NOT_FOUND\""));
    }

    #[test]
    fn permission_map_keys_use_relation_names() {
        let mut permissions = HashMap::new();
        permissions.insert(AuthRelation::SpaceModerator, true);
        let response = BatchPermissionsResponse {
            space_id: "abc".to_string(),
            permissions,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"space_moderator\":true"));
    }
}
