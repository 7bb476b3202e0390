//! Derived counts over already-authorized collections.
//!
//! Everything here is a pure function of the supplied collection and,
//! where a calendar boundary matters, an injected reference clock. The
//! caller decides what the actor may see before aggregating; nothing in
//! this module filters by permission or reads the system time.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ResourceDoc, Submission, SubmissionStatus};

/// Dashboard counters for a set of submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionStats {
    pub total: u64,
    pub approved: u64,
    pub in_review: u64,
    /// Submitted within the calendar month and year of the reference
    /// clock handed to [`submission_stats`].
    pub this_month: u64,
}

/// Dashboard counters for a set of resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub total: u64,
    pub published: u64,
    pub total_downloads: u64,
}

/// Aggregate submission counters.
///
/// `now` anchors the `this_month` window; tests pin it, the request layer
/// passes the wall clock.
pub fn submission_stats(submissions: &[Submission], now: DateTime<Utc>) -> SubmissionStats {
    let mut stats = SubmissionStats {
        total: submissions.len() as u64,
        approved: 0,
        in_review: 0,
        this_month: 0,
    };

    for submission in submissions {
        match submission.status {
            SubmissionStatus::Approved => stats.approved += 1,
            SubmissionStatus::InReview => stats.in_review += 1,
            _ => {}
        }
        if submission.submitted_at.year() == now.year()
            && submission.submitted_at.month() == now.month()
        {
            stats.this_month += 1;
        }
    }

    stats
}

/// Aggregate resource counters. Time plays no part here, so no clock.
pub fn resource_stats(resources: &[ResourceDoc]) -> ResourceStats {
    ResourceStats {
        total: resources.len() as u64,
        published: resources.iter().filter(|r| r.is_published).count() as u64,
        total_downloads: resources.iter().map(|r| r.download_count.max(0) as u64).sum(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SubmissionKind, UserId};
    use chrono::TimeZone;

    fn submission(status: SubmissionStatus, submitted_at: DateTime<Utc>) -> Submission {
        Submission {
            id: 0,
            kind: SubmissionKind::Project,
            title: "p".to_string(),
            description: None,
            file_url: "uploads/p.pdf".to_string(),
            file_type: "pdf".to_string(),
            owner_id: UserId(1),
            status,
            feedback: None,
            submitted_at,
        }
    }

    fn resource(published: bool, downloads: i64) -> ResourceDoc {
        ResourceDoc {
            id: 0,
            title: "r".to_string(),
            description: None,
            file_url: "uploads/r.pdf".to_string(),
            file_type: "pdf".to_string(),
            uploaded_by: UserId(1),
            is_published: published,
            download_count: downloads,
        }
    }

    #[test]
    fn test_submission_stats_reference_scenario() {
        let now = Utc.with_ymd_and_hms(2025, 8, 15, 12, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let august = Utc.with_ymd_and_hms(2025, 8, 10, 9, 0, 0).unwrap();

        let submissions = vec![
            submission(SubmissionStatus::Submitted, january),
            submission(SubmissionStatus::Approved, august),
            submission(SubmissionStatus::Approved, january),
            submission(SubmissionStatus::InReview, january),
            submission(SubmissionStatus::Rejected, january),
        ];

        let stats = submission_stats(&submissions, now);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.in_review, 1);
        assert_eq!(stats.this_month, 1);
    }

    #[test]
    fn test_this_month_requires_matching_year() {
        let now = Utc.with_ymd_and_hms(2025, 8, 15, 0, 0, 0).unwrap();
        let last_august = Utc.with_ymd_and_hms(2024, 8, 15, 0, 0, 0).unwrap();

        let stats = submission_stats(
            &[submission(SubmissionStatus::Submitted, last_august)],
            now,
        );
        assert_eq!(stats.total, 1);
        assert_eq!(stats.this_month, 0);
    }

    #[test]
    fn test_empty_collections() {
        let now = Utc.with_ymd_and_hms(2025, 8, 15, 0, 0, 0).unwrap();
        assert_eq!(
            submission_stats(&[], now),
            SubmissionStats { total: 0, approved: 0, in_review: 0, this_month: 0 }
        );
        assert_eq!(
            resource_stats(&[]),
            ResourceStats { total: 0, published: 0, total_downloads: 0 }
        );
    }

    #[test]
    fn test_resource_stats_sums_downloads() {
        let resources = vec![resource(true, 15), resource(false, 3), resource(true, 0)];
        let stats = resource_stats(&resources);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.total_downloads, 18);
    }

    #[test]
    fn test_stats_are_pure() {
        let now = Utc.with_ymd_and_hms(2025, 8, 15, 0, 0, 0).unwrap();
        let items = vec![submission(SubmissionStatus::Approved, now)];
        assert_eq!(submission_stats(&items, now), submission_stats(&items, now));
    }
}
