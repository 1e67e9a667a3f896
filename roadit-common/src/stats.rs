//! Aggregates for the performance view and dashboard badges

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::model::{Issue, IssueType, Municipality, Status};

/// Age after which an open issue counts as overdue
pub const OVERDUE_AFTER_DAYS: i64 = 7;

/// Submitted more than a week before `now` and still open
pub fn is_overdue(issue: &Issue, now: DateTime<Utc>) -> bool {
    !issue.status.is_closed() && issue.submitted_at < now - Duration::days(OVERDUE_AFTER_DAYS)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStats {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub registered: usize,
    pub resolved: usize,
    /// Whole days from submission to resolution, averaged and rounded
    pub average_resolution_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: Status,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MunicipalityCount {
    pub municipality: Municipality,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStats {
    pub total: usize,
    pub overdue: usize,
    pub by_type: Vec<TypeStats>,
    pub by_status: Vec<StatusCount>,
    pub by_municipality: Vec<MunicipalityCount>,
}

impl IssueStats {
    pub fn compute(issues: &[Issue], now: DateTime<Utc>) -> Self {
        let by_type = IssueType::ALL
            .iter()
            .map(|&issue_type| type_stats(issues, issue_type))
            .collect();

        let by_status = Status::ALL
            .iter()
            .map(|&status| StatusCount {
                status,
                count: issues.iter().filter(|i| i.status == status).count(),
            })
            .collect();

        let by_municipality = Municipality::ALL
            .iter()
            .map(|&municipality| MunicipalityCount {
                municipality,
                count: issues.iter().filter(|i| i.municipality == municipality).count(),
            })
            .collect();

        Self {
            total: issues.len(),
            overdue: issues.iter().filter(|i| is_overdue(i, now)).count(),
            by_type,
            by_status,
            by_municipality,
        }
    }
}

fn type_stats(issues: &[Issue], issue_type: IssueType) -> TypeStats {
    let of_type: Vec<&Issue> = issues.iter().filter(|i| i.issue_type == issue_type).collect();

    let resolution_days: Vec<i64> = of_type
        .iter()
        .filter(|i| i.status == Status::Resolved)
        .filter_map(|i| i.resolved_at.map(|at| (at - i.submitted_at).num_days()))
        .collect();

    let average_resolution_days = if resolution_days.is_empty() {
        0
    } else {
        let total: i64 = resolution_days.iter().sum();
        (total as f64 / resolution_days.len() as f64).round() as i64
    };

    TypeStats {
        issue_type,
        registered: of_type.len(),
        resolved: of_type.iter().filter(|i| i.status == Status::Resolved).count(),
        average_resolution_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::seed_issues;
    use chrono::TimeZone;

    fn july_25() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 25, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_seed_type_breakdown() {
        let stats = IssueStats::compute(&seed_issues(), july_25());

        assert_eq!(stats.total, 4);
        let pothole = &stats.by_type[0];
        assert_eq!(pothole.issue_type, IssueType::Pothole);
        assert_eq!(pothole.registered, 2);
        assert_eq!(pothole.resolved, 0);
        assert_eq!(pothole.average_resolution_days, 0);

        let broken = &stats.by_type[2];
        assert_eq!(broken.registered, 1);
        assert_eq!(broken.resolved, 1);
        // 2025-07-10T09:00 -> 2025-07-18T16:45 is 8 whole days
        assert_eq!(broken.average_resolution_days, 8);

        assert_eq!(stats.by_type[3].registered, 0);
    }

    #[test]
    fn test_average_rounds_to_nearest_day() {
        let mut issues = seed_issues();
        let mut second = issues[2].clone();
        second.id = "5".to_string();
        second.resolved_at = Some(second.submitted_at + Duration::days(3));
        second.updated_at = second.resolved_at.unwrap();
        issues.push(second);

        let stats = IssueStats::compute(&issues, july_25());
        // (8 + 3) / 2 = 5.5
        assert_eq!(stats.by_type[2].average_resolution_days, 6);
    }

    #[test]
    fn test_overdue_excludes_closed_issues() {
        let issues = seed_issues();
        let now = july_25();

        // ids 1, 2 and 4 are open and older than a week; 3 is resolved
        assert!(is_overdue(&issues[0], now));
        assert!(is_overdue(&issues[1], now));
        assert!(!is_overdue(&issues[2], now));
        assert!(is_overdue(&issues[3], now));

        let mut cannot = issues[0].clone();
        cannot.status = Status::CannotAction;
        assert!(!is_overdue(&cannot, now));
    }

    #[test]
    fn test_recent_issue_not_overdue() {
        let issue = &seed_issues()[0];
        let now = issue.submitted_at + Duration::days(OVERDUE_AFTER_DAYS);
        assert!(!is_overdue(issue, now));
    }

    #[test]
    fn test_status_and_municipality_counts() {
        let stats = IssueStats::compute(&seed_issues(), july_25());
        let count = |s: Status| stats.by_status.iter().find(|c| c.status == s).unwrap().count;
        assert_eq!(count(Status::Received), 1);
        assert_eq!(count(Status::Resolved), 1);
        assert_eq!(count(Status::CannotAction), 0);

        let bbmp = stats
            .by_municipality
            .iter()
            .find(|c| c.municipality == Municipality::Bbmp)
            .unwrap();
        assert_eq!(bbmp.count, 1);
        assert_eq!(stats.overdue, 3);
    }
}
