//! Issue resources: dashboard list, detail view, report flow

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use roadit_common::stats::is_overdue;
use roadit_common::{Issue, IssueDraft};
use serde::Serialize;

use crate::{ApiError, ApiResult, AppState};

/// Issue plus the dashboard's overdue flag
#[derive(Debug, Serialize)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: Issue,
    pub overdue: bool,
}

impl IssueView {
    fn new(issue: Issue, now: chrono::DateTime<chrono::Utc>) -> Self {
        let overdue = is_overdue(&issue, now);
        Self { issue, overdue }
    }
}

/// GET /api/issues
///
/// Newest first, as stored.
pub async fn list_issues(State(state): State<AppState>) -> Json<Vec<IssueView>> {
    let now = state.clock.now();
    let issues = state.workflow.store().get_all().await;

    Json(issues.into_iter().map(|i| IssueView::new(i, now)).collect())
}

/// GET /api/issues/:id
pub async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<IssueView>> {
    let issue = state
        .workflow
        .store()
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("issue {}", id)))?;

    Ok(Json(IssueView::new(issue, state.clock.now())))
}

/// POST /api/issues
///
/// **Request:** an issue draft (`type`, `severity`, `location`,
/// `municipality`, `photoUrl`, `description`, optional `address`/`photoHint`)
/// **Response:** 201 with the stored issue
///
/// **Errors:**
/// - 400 Bad Request: every failing field, space separated, or a body that
///   does not decode as a draft (unknown `type`, missing `location`, ...)
/// - 503 Service Unavailable: the issue slot could not be written
pub async fn create_issue(
    State(state): State<AppState>,
    payload: Result<Json<IssueDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Issue>)> {
    let Json(draft) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let issue = state.workflow.submit(draft).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

/// Build issue resource routes
pub fn issue_routes() -> Router<AppState> {
    Router::new()
        .route("/api/issues", get(list_issues).post(create_issue))
        .route("/api/issues/:id", get(get_issue))
}
