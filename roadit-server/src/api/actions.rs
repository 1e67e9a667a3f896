//! Action endpoints
//!
//! Each answers with a `{success, ..., error?}` envelope so the report form
//! and dashboard can show the message as-is. Failures still carry a matching
//! HTTP status.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use roadit_common::{Error, Issue, IssueType, Municipality, Severity};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::services::{self, GatewayError};
use crate::AppState;

/// POST /api/issues/status request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub issue_id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusUpdateResponse {
    fn failed(status: StatusCode, message: String) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                success: false,
                issue: None,
                error: Some(message),
            }),
        )
    }
}

/// POST /api/issues/status
///
/// **Request:** `{"issueId": "2", "status": "Resolved"}`
/// **Response:** `{"success": true, "issue": {...}}`
///
/// **Errors:**
/// - 400: "Invalid input: ..." listing every failing field
/// - 404: "Issue not found."
/// - 409: transition refused by the strict policy
/// - 503: the issue slot could not be written
pub async fn update_status(
    State(state): State<AppState>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> (StatusCode, Json<StatusUpdateResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return StatusUpdateResponse::failed(
                StatusCode::BAD_REQUEST,
                rejection_message(&rejection),
            )
        }
    };

    match state
        .workflow
        .set_status(&request.issue_id, &request.status)
        .await
    {
        Ok(issue) => (
            StatusCode::OK,
            Json(StatusUpdateResponse {
                success: true,
                issue: Some(issue),
                error: None,
            }),
        ),
        Err(e @ Error::InvalidInput(_)) => {
            warn!("Status update validation failed: {}", e);
            StatusUpdateResponse::failed(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(Error::NotFound(_)) => {
            warn!(id = %request.issue_id, "Issue not found for status update");
            StatusUpdateResponse::failed(StatusCode::NOT_FOUND, "Issue not found.".to_string())
        }
        Err(e @ Error::InvalidTransition { .. }) => {
            StatusUpdateResponse::failed(StatusCode::CONFLICT, format!("{}.", e))
        }
        Err(e) => {
            error!(id = %request.issue_id, "Failed to update status: {}", e);
            StatusUpdateResponse::failed(
                StatusCode::SERVICE_UNAVAILABLE,
                "Failed to update status: issue storage is unavailable.".to_string(),
            )
        }
    }
}

/// POST /api/assess request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessRequest {
    #[serde(default)]
    pub photo_data_uri: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/assess
///
/// **Request:** `{"photoDataUri": "data:image/jpeg;base64,..."}`
/// **Response:** `{"success": true, "severity": "Moderate", "issueType": "Pothole"}`
pub async fn assess(
    State(state): State<AppState>,
    payload: Result<Json<AssessRequest>, JsonRejection>,
) -> (StatusCode, Json<AssessResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AssessResponse {
                    error: Some(rejection_message(&rejection)),
                    ..Default::default()
                }),
            )
        }
    };

    match services::assess_photo(state.assessor.as_ref(), &request.photo_data_uri).await {
        Ok(assessment) => (
            StatusCode::OK,
            Json(AssessResponse {
                success: true,
                severity: Some(assessment.severity),
                issue_type: Some(assessment.issue_type),
                error: None,
            }),
        ),
        Err(GatewayError::InvalidInput(message)) => (
            StatusCode::BAD_REQUEST,
            Json(AssessResponse {
                error: Some(message),
                ..Default::default()
            }),
        ),
        Err(e) => {
            warn!(gateway = state.assessor.name(), "Photo assessment failed: {}", e);
            (
                gateway_status(&e),
                Json(AssessResponse {
                    error: Some(format!("Failed to assess issue: {}", e.user_message())),
                    ..Default::default()
                }),
            )
        }
    }
}

/// POST /api/municipality request
#[derive(Debug, Deserialize)]
pub struct MunicipalityRequest {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Default, Serialize)]
pub struct MunicipalityResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    /// Municipal body whose city matches the name, when one does
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Municipality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/municipality
///
/// **Request:** `{"lat": 28.6315, "lng": 77.2167}`
/// **Response:** `{"success": true, "municipality": "New Delhi", "body": "NDMC"}`
pub async fn find_municipality(
    State(state): State<AppState>,
    payload: Result<Json<MunicipalityRequest>, JsonRejection>,
) -> (StatusCode, Json<MunicipalityResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(MunicipalityResponse {
                    error: Some(rejection_message(&rejection)),
                    ..Default::default()
                }),
            )
        }
    };

    match services::find_municipality(state.resolver.as_ref(), request.lat, request.lng).await {
        Ok(name) => {
            let body = Municipality::from_place_name(&name);
            (
                StatusCode::OK,
                Json(MunicipalityResponse {
                    success: true,
                    municipality: Some(name),
                    body,
                    error: None,
                }),
            )
        }
        Err(GatewayError::InvalidInput(message)) => (
            StatusCode::BAD_REQUEST,
            Json(MunicipalityResponse {
                error: Some(message),
                ..Default::default()
            }),
        ),
        Err(e) => {
            warn!(gateway = state.resolver.name(), "Municipality lookup failed: {}", e);
            (
                gateway_status(&e),
                Json(MunicipalityResponse {
                    error: Some(format!("Failed to find municipality: {}", e.user_message())),
                    ..Default::default()
                }),
            )
        }
    }
}

/// Envelope message for a body the JSON extractor refused
fn rejection_message(rejection: &JsonRejection) -> String {
    warn!("Rejected request body: {}", rejection.body_text());
    format!("Invalid input: {}", rejection.body_text())
}

fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        GatewayError::MissingApiKey(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Network(_) | GatewayError::Api(_) | GatewayError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

/// Build action routes
pub fn action_routes() -> Router<AppState> {
    Router::new()
        .route("/api/issues/status", post(update_status))
        .route("/api/assess", post(assess))
        .route("/api/municipality", post(find_municipality))
}
