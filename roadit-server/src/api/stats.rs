//! Statistics endpoint for the performance view

use axum::{extract::State, routing::get, Json, Router};
use roadit_common::stats::IssueStats;

use crate::AppState;

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<IssueStats> {
    let issues = state.workflow.store().get_all().await;
    Json(IssueStats::compute(&issues, state.clock.now()))
}

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/api/stats", get(get_stats))
}
