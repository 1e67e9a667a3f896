//! Sample issues written to an empty slot

use chrono::{DateTime, TimeZone, Utc};

use crate::model::{Issue, IssueType, Location, Municipality, Severity, Status};

const PLACEHOLDER_PHOTO: &str = "https://placehold.co/600x400.png";

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

/// The four sample issues, newest-added first
pub fn seed_issues() -> Vec<Issue> {
    vec![
        Issue {
            id: "1".to_string(),
            issue_type: IssueType::Pothole,
            severity: Severity::Moderate,
            status: Status::Received,
            location: Location::new(28.6139, 77.2090),
            address: "Connaught Place, New Delhi, Delhi".to_string(),
            photo_url: PLACEHOLDER_PHOTO.to_string(),
            photo_hint: "pothole road".to_string(),
            description: "Large pothole in the middle of the road, causing traffic issues."
                .to_string(),
            submitted_at: at(2025, 7, 15, 10, 0),
            updated_at: at(2025, 7, 15, 10, 0),
            resolved_at: None,
            cannot_action_reason: None,
            municipality: Municipality::Ndmc,
        },
        Issue {
            id: "2".to_string(),
            issue_type: IssueType::Waterlogging,
            severity: Severity::SevereHazardous,
            status: Status::UnderReview,
            location: Location::new(12.9716, 77.5946),
            address: "MG Road, Bengaluru, Karnataka".to_string(),
            photo_url: PLACEHOLDER_PHOTO.to_string(),
            photo_hint: "waterlogged street".to_string(),
            description: "Severe waterlogging after rain, making the road impassable for smaller vehicles."
                .to_string(),
            submitted_at: at(2025, 7, 14, 14, 30),
            updated_at: at(2025, 7, 16, 11, 20),
            resolved_at: None,
            cannot_action_reason: None,
            municipality: Municipality::Bbmp,
        },
        Issue {
            id: "3".to_string(),
            issue_type: IssueType::BrokenRoad,
            severity: Severity::Minor,
            status: Status::Resolved,
            location: Location::new(19.0760, 72.8777),
            address: "Bandra Kurla Complex, Mumbai, Maharashtra".to_string(),
            photo_url: PLACEHOLDER_PHOTO.to_string(),
            photo_hint: "cracked asphalt".to_string(),
            description: "Minor cracks on the pavement.".to_string(),
            submitted_at: at(2025, 7, 10, 9, 0),
            updated_at: at(2025, 7, 18, 16, 45),
            resolved_at: Some(at(2025, 7, 18, 16, 45)),
            cannot_action_reason: None,
            municipality: Municipality::Bmc,
        },
        Issue {
            id: "4".to_string(),
            issue_type: IssueType::Pothole,
            severity: Severity::SevereHazardous,
            status: Status::RepairInProgress,
            location: Location::new(22.5726, 88.3639),
            address: "Park Street, Kolkata, West Bengal".to_string(),
            photo_url: PLACEHOLDER_PHOTO.to_string(),
            photo_hint: "deep pothole".to_string(),
            description: "A very deep and dangerous pothole near the main crossing. Multiple vehicles have been damaged."
                .to_string(),
            submitted_at: at(2025, 6, 20, 11, 0),
            updated_at: at(2025, 7, 20, 10, 0),
            resolved_at: None,
            cannot_action_reason: None,
            municipality: Municipality::Kmc,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_satisfies_invariants() {
        for issue in seed_issues() {
            issue.check_invariants().unwrap();
        }
    }

    #[test]
    fn test_seed_timestamps_are_exact() {
        let issues = seed_issues();
        assert_eq!(
            crate::time::iso_millis::format(&issues[1].updated_at),
            "2025-07-16T11:20:00.000Z"
        );
        assert_eq!(issues[2].resolved_at, Some(issues[2].updated_at));
    }
}
