//! roadit-server library interface
//!
//! Exposes the router and state so integration tests can drive the service
//! without binding a socket.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::{http::Method, Router};
use chrono::{DateTime, Utc};
use roadit_common::time::{Clock, SystemClock};
use roadit_common::StatusWorkflow;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::{AssessmentGateway, MunicipalityResolver};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Status Workflow, and through it the Issue Record Store
    pub workflow: StatusWorkflow,
    pub assessor: Arc<dyn AssessmentGateway>,
    pub resolver: Arc<dyn MunicipalityResolver>,
    /// Time source for overdue flags, stats and uptime
    pub clock: Arc<dyn Clock>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        workflow: StatusWorkflow,
        assessor: Arc<dyn AssessmentGateway>,
        resolver: Arc<dyn MunicipalityResolver>,
    ) -> Self {
        Self::with_clock(workflow, assessor, resolver, Arc::new(SystemClock))
    }

    pub fn with_clock(
        workflow: StatusWorkflow,
        assessor: Arc<dyn AssessmentGateway>,
        resolver: Arc<dyn MunicipalityResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let startup_time = clock.now();
        Self {
            workflow,
            assessor,
            resolver,
            clock,
            startup_time,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .merge(api::health_routes())
        .merge(api::issue_routes())
        .merge(api::action_routes())
        .merge(api::stats_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
