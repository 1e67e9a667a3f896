//! # RoadIt Common Library
//!
//! Shared code for the RoadIt service:
//! - Issue data model
//! - Issue Record Store and its storage backends
//! - Status Workflow (validation, transition policy, resolution timestamps)
//! - Statistics for the dashboard and performance views
//! - Configuration loading

pub mod config;
pub mod error;
pub mod model;
pub mod stats;
pub mod store;
pub mod time;
pub mod workflow;

pub use error::{Error, Result};
pub use model::{Issue, IssueDraft, IssueType, Location, Municipality, Severity, Status};
pub use store::IssueStore;
pub use workflow::{StatusWorkflow, TransitionPolicy};
