use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Municipality;
use crate::time::iso_millis;

/// Kind of road defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueType {
    Pothole,
    Waterlogging,
    #[serde(rename = "Broken Road")]
    BrokenRoad,
    Other,
}

impl IssueType {
    pub const ALL: [IssueType; 4] = [
        IssueType::Pothole,
        IssueType::Waterlogging,
        IssueType::BrokenRoad,
        IssueType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Pothole => "Pothole",
            IssueType::Waterlogging => "Waterlogging",
            IssueType::BrokenRoad => "Broken Road",
            IssueType::Other => "Other",
        }
    }
}

/// Urgency classification, independent of workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Moderate,
    #[serde(rename = "Severe/Hazardous")]
    SevereHazardous,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Minor, Severity::Moderate, Severity::SevereHazardous];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "Minor",
            Severity::Moderate => "Moderate",
            Severity::SevereHazardous => "Severe/Hazardous",
        }
    }
}

/// Workflow state of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Received,
    #[serde(rename = "Under Review")]
    UnderReview,
    #[serde(rename = "Repair Scheduled")]
    RepairScheduled,
    #[serde(rename = "Repair In Progress")]
    RepairInProgress,
    Resolved,
    #[serde(rename = "Cannot Action")]
    CannotAction,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Received,
        Status::UnderReview,
        Status::RepairScheduled,
        Status::RepairInProgress,
        Status::Resolved,
        Status::CannotAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Received => "Received",
            Status::UnderReview => "Under Review",
            Status::RepairScheduled => "Repair Scheduled",
            Status::RepairInProgress => "Repair In Progress",
            Status::Resolved => "Resolved",
            Status::CannotAction => "Cannot Action",
        }
    }

    /// Resolved and Cannot Action end the municipal work on an issue
    pub fn is_closed(&self) -> bool {
        matches!(self, Status::Resolved | Status::CannotAction)
    }
}

macro_rules! display_and_parse {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        let expected: Vec<&str> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        format!(
                            "Unrecognized {} \"{}\"; expected one of: {}",
                            $what,
                            s,
                            expected.join(", ")
                        )
                    })
            }
        }
    };
}

display_and_parse!(IssueType, "issue type");
display_and_parse!(Severity, "severity");
display_and_parse!(Status, "status");

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both coordinates finite, lat in [-90, 90], lng in [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A reported infrastructure defect and its workflow state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub status: Status,
    pub location: Location,
    pub address: String,
    pub photo_url: String,
    pub photo_hint: String,
    pub description: String,
    #[serde(with = "iso_millis")]
    pub submitted_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "iso_millis::option"
    )]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cannot_action_reason: Option<String>,
    pub municipality: Municipality,
}

impl Issue {
    /// Check the per-record invariants a loaded slot must satisfy
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("issue with empty id".to_string());
        }
        if !self.location.is_valid() {
            return Err(format!(
                "issue {} has invalid location ({}, {})",
                self.id, self.location.lat, self.location.lng
            ));
        }
        if self.submitted_at > self.updated_at {
            return Err(format!("issue {} was updated before it was submitted", self.id));
        }
        if self.resolved_at.is_some() != (self.status == Status::Resolved) {
            return Err(format!(
                "issue {} has status \"{}\" but resolvedAt is {}",
                self.id,
                self.status,
                if self.resolved_at.is_some() { "set" } else { "missing" }
            ));
        }
        Ok(())
    }
}

/// Everything the report flow supplies for a new issue
///
/// The store assigns `id`, `submittedAt` and `updatedAt`; `resolvedAt` starts
/// unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDraft {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    #[serde(default = "default_draft_status")]
    pub status: Status,
    pub location: Location,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub photo_hint: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cannot_action_reason: Option<String>,
    pub municipality: Municipality,
}

fn default_draft_status() -> Status {
    Status::Received
}

impl IssueDraft {
    /// Minimal draft with empty text fields and status Received
    pub fn new(
        issue_type: IssueType,
        severity: Severity,
        location: Location,
        municipality: Municipality,
    ) -> Self {
        Self {
            issue_type,
            severity,
            status: Status::Received,
            location,
            address: String::new(),
            photo_url: String::new(),
            photo_hint: String::new(),
            description: String::new(),
            cannot_action_reason: None,
            municipality,
        }
    }

    pub(crate) fn into_issue(self, id: String, now: DateTime<Utc>) -> Issue {
        Issue {
            id,
            issue_type: self.issue_type,
            severity: self.severity,
            status: self.status,
            location: self.location,
            address: self.address,
            photo_url: self.photo_url,
            photo_hint: self.photo_hint,
            description: self.description,
            submitted_at: now,
            updated_at: now,
            resolved_at: (self.status == Status::Resolved).then_some(now),
            cannot_action_reason: self.cannot_action_reason,
            municipality: self.municipality,
        }
    }
}
