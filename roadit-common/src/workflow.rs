//! Status Workflow
//!
//! The entry point every surface uses to change an issue's status or file a
//! new report. Input is validated here, before the store is touched; the
//! store then applies the change under its write lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::model::{Issue, IssueDraft, Status};
use crate::store::IssueStore;
use crate::{Error, Result};

/// Minimum description length accepted by the report flow
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// `resolvedAt` after a change from `old_status` to `new_status`
///
/// Entering Resolved stamps `now`. Staying Resolved keeps the recorded
/// resolution time. Any other status clears it.
pub fn resolve_resolved_at(
    old_status: Status,
    new_status: Status,
    old_resolved_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (old_status, new_status) {
        (Status::Resolved, Status::Resolved) => old_resolved_at.or(Some(now)),
        (_, Status::Resolved) => Some(now),
        _ => None,
    }
}

/// Which status changes are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any status may follow any other; staff can revert mistakes freely
    #[default]
    Permissive,
    /// Forward progress only, plus Cannot Action from open states and
    /// reopening closed issues into Under Review
    Strict,
}

impl TransitionPolicy {
    pub fn allows(&self, from: Status, to: Status) -> bool {
        use Status::*;

        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => {
                from == to
                    || matches!(
                        (from, to),
                        (Received, UnderReview)
                            | (UnderReview, RepairScheduled)
                            | (RepairScheduled, RepairInProgress)
                            | (RepairInProgress, Resolved)
                            | (Received | UnderReview | RepairScheduled | RepairInProgress, CannotAction)
                            | (Resolved | CannotAction, UnderReview)
                    )
            }
        }
    }
}

/// Problems with a report draft, empty when it is acceptable
pub fn validate_draft(draft: &IssueDraft) -> Vec<String> {
    let mut problems = Vec::new();

    if draft.photo_url.trim().is_empty() {
        problems.push("Photo is required.".to_string());
    }
    if !draft.location.is_valid() {
        problems.push(
            "Location must have a latitude in [-90, 90] and a longitude in [-180, 180].".to_string(),
        );
    }
    if draft.description.trim().chars().count() < MIN_DESCRIPTION_LEN {
        problems.push(format!(
            "Description must be at least {} characters.",
            MIN_DESCRIPTION_LEN
        ));
    }

    problems
}

/// Validating front for [`IssueStore`] mutations
#[derive(Clone)]
pub struct StatusWorkflow {
    store: Arc<IssueStore>,
    policy: TransitionPolicy,
}

impl StatusWorkflow {
    pub fn new(store: Arc<IssueStore>) -> Self {
        Self::with_policy(store, TransitionPolicy::default())
    }

    pub fn with_policy(store: Arc<IssueStore>, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<IssueStore> {
        &self.store
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Change the status of `issue_id` to the status named `status`
    ///
    /// Both inputs are checked first and every failing field is reported in
    /// one [`Error::InvalidInput`]. An unknown id is [`Error::NotFound`].
    pub async fn set_status(&self, issue_id: &str, status: &str) -> Result<Issue> {
        let issue_id = issue_id.trim();
        let mut problems = Vec::new();

        if issue_id.is_empty() {
            problems.push("Issue ID cannot be empty.".to_string());
        }
        let parsed = status.parse::<Status>();
        if parsed.is_err() {
            let expected: Vec<&str> = Status::ALL.iter().map(|s| s.as_str()).collect();
            problems.push(format!("Status must be one of: {}.", expected.join(", ")));
        }

        let status = match parsed {
            Ok(status) if problems.is_empty() => status,
            _ => return Err(Error::InvalidInput(problems.join(" "))),
        };

        let policy = self.policy;
        let mut previous = None;
        let issue = self
            .store
            .update_status_checked(issue_id, status, |from, to| {
                previous = Some(from);
                if policy.allows(from, to) {
                    Ok(())
                } else {
                    Err(Error::InvalidTransition { from, to })
                }
            })
            .await?;

        if let Some(from) = previous {
            info!(id = %issue.id, from = %from, to = %issue.status, "Issue status changed");
        }
        Ok(issue)
    }

    /// Report flow: validate `draft` and add it as a new Received issue
    pub async fn submit(&self, mut draft: IssueDraft) -> Result<Issue> {
        let problems = validate_draft(&draft);
        if !problems.is_empty() {
            return Err(Error::InvalidInput(problems.join(" ")));
        }

        draft.status = Status::Received;
        draft.cannot_action_reason = None;
        draft.description = draft.description.trim().to_string();
        if draft.photo_hint.trim().is_empty() {
            draft.photo_hint = format!("{} road", draft.issue_type.as_str().to_lowercase());
        }

        self.store.add(draft).await
    }
}
