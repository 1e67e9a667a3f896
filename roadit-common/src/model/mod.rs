//! Issue data model
//!
//! One entity, [`Issue`], plus the enumerations it is built from. Wire names
//! are the display strings (`"Broken Road"`, `"Severe/Hazardous"`), which
//! is also what the persisted slot stores.

mod issue;
mod municipality;

pub use issue::{Issue, IssueDraft, IssueType, Location, Severity, Status};
pub use municipality::Municipality;
