//! HTTP API handlers for roadit-server

pub mod actions;
pub mod health;
pub mod issues;
pub mod stats;

pub use actions::action_routes;
pub use health::health_routes;
pub use issues::issue_routes;
pub use stats::stats_routes;
