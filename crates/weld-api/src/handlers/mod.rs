//! API request handlers

pub mod auth;
pub mod health;
pub mod mappings;
pub mod permissions;
pub mod spaces;

use axum::{http::StatusCode, Json};
use std::str::FromStr;

use weld_core::WeldError;

use crate::dto::{ApiError, ApiResponse};

/// Map a domain error onto an HTTP status and response envelope.
pub(crate) fn error_response(error: &WeldError) -> (StatusCode, Json<ApiResponse<()>>) {
    let (status, code) = match error {
        WeldError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        WeldError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        WeldError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
        WeldError::AuthenticationFailed { .. } => {
            (StatusCode::UNAUTHORIZED, "AUTHENTICATION_FAILED")
        }
        WeldError::InvalidEmail { .. } => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
        WeldError::InvalidOperation { .. } => (StatusCode::BAD_REQUEST, "INVALID_OPERATION"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: error.to_string(),
                details: None,
            }),
        }),
    )
}

/// Parse a path or body id, mapping failures onto a 400.
pub(crate) fn parse_id<T: FromStr>(
    value: &str,
    what: &str,
) -> Result<T, (StatusCode, Json<ApiResponse<()>>)> {
    value.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                success: false,
                data: None,
                error: Some(ApiError {
                    code: "INVALID_ID".to_string(),
                    message: format!("Invalid {what} ID format"),
                    details: None,
                }),
            }),
        )
    })
}

/// Wrap a payload in the success envelope.
pub(crate) fn success<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_core::SpaceId;

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        let cases = [
            (WeldError::not_found("space", "x"), StatusCode::NOT_FOUND),
            (WeldError::conflict("duplicate"), StatusCode::CONFLICT),
            (
                WeldError::permission_denied("delete_space", "space:x"),
                StatusCode::FORBIDDEN,
            ),
            (
                WeldError::authentication("bad token"),
                StatusCode::UNAUTHORIZED,
            ),
            (WeldError::invalid_email("nope"), StatusCode::BAD_REQUEST),
            (
                WeldError::invalid_operation("cannot remove the moderator"),
                StatusCode::BAD_REQUEST,
            ),
            (
                WeldError::persistence("db down"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                WeldError::authorization_store("store down"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let (status, body) = error_response(&error);
            assert_eq!(status, expected, "wrong status for {error}");
            assert!(!body.0.success);
            assert!(body.0.error.is_some());
        }
    }

    #[test]
    fn parse_id_rejects_garbage() {
        let result: Result<SpaceId, _> = parse_id("not-a-uuid", "space");
        let (status, body) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0.error.unwrap().code, "INVALID_ID");
    }

    #[test]
    fn parse_id_accepts_uuids() {
        let id = SpaceId::new();
        let parsed: SpaceId = parse_id(&id.to_string(), "space").unwrap();
        assert_eq!(parsed, id);
    }
}
