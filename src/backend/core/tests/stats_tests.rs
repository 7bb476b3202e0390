//! Integration tests for statistics aggregation.

use chrono::{DateTime, TimeZone, Utc};
use mentora_core::domain::{
    ResourceDoc, Submission, SubmissionKind, SubmissionStatus, UserId,
};
use mentora_core::stats::{resource_stats, submission_stats};

fn submission(status: SubmissionStatus, submitted_at: DateTime<Utc>) -> Submission {
    Submission {
        id: 0,
        kind: SubmissionKind::Report,
        title: "entry".to_string(),
        description: None,
        file_url: "uploads/entry.pdf".to_string(),
        file_type: "pdf".to_string(),
        owner_id: UserId(9),
        status,
        feedback: None,
        submitted_at,
    }
}

fn resource(published: bool, downloads: i64) -> ResourceDoc {
    ResourceDoc {
        id: 0,
        title: "doc".to_string(),
        description: None,
        file_url: "uploads/doc.pdf".to_string(),
        file_type: "pdf".to_string(),
        uploaded_by: UserId(1),
        is_published: published,
        download_count: downloads,
    }
}

#[test]
fn submission_counters_match_reference_scenario() {
    // Statuses [Submitted, Approved, Approved, InReview, Rejected], one
    // Approved item from the current month, everything else from January.
    let now = Utc.with_ymd_and_hms(2025, 8, 15, 12, 0, 0).unwrap();
    let january = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
    let august = Utc.with_ymd_and_hms(2025, 8, 10, 8, 0, 0).unwrap();

    let items = vec![
        submission(SubmissionStatus::Submitted, january),
        submission(SubmissionStatus::Approved, august),
        submission(SubmissionStatus::Approved, january),
        submission(SubmissionStatus::InReview, january),
        submission(SubmissionStatus::Rejected, january),
    ];

    let stats = submission_stats(&items, now);
    assert_eq!(stats.total, 5);
    assert_eq!(stats.approved, 2);
    assert_eq!(stats.in_review, 1);
    assert_eq!(stats.this_month, 1);
}

#[test]
fn clock_is_injected_not_read() {
    let items = vec![submission(
        SubmissionStatus::Submitted,
        Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
    )];

    let inside = Utc.with_ymd_and_hms(2025, 8, 31, 23, 59, 59).unwrap();
    let outside = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();

    assert_eq!(submission_stats(&items, inside).this_month, 1);
    assert_eq!(submission_stats(&items, outside).this_month, 0);
}

#[test]
fn month_window_is_calendar_month_and_year() {
    let now = Utc.with_ymd_and_hms(2025, 8, 15, 0, 0, 0).unwrap();
    let items = vec![
        // Same month, previous year: outside the window.
        submission(
            SubmissionStatus::Submitted,
            Utc.with_ymd_and_hms(2024, 8, 15, 0, 0, 0).unwrap(),
        ),
        // Same year, previous month: outside the window.
        submission(
            SubmissionStatus::Submitted,
            Utc.with_ymd_and_hms(2025, 7, 31, 23, 59, 59).unwrap(),
        ),
        submission(
            SubmissionStatus::Submitted,
            Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
        ),
    ];

    assert_eq!(submission_stats(&items, now).this_month, 1);
}

#[test]
fn resource_counters() {
    let items = vec![
        resource(true, 2500),
        resource(false, 0),
        resource(true, 15),
    ];

    let stats = resource_stats(&items);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.published, 2);
    assert_eq!(stats.total_downloads, 2515);
}

#[test]
fn aggregation_is_deterministic() {
    let now = Utc.with_ymd_and_hms(2025, 8, 15, 0, 0, 0).unwrap();
    let items = vec![
        submission(SubmissionStatus::Approved, now),
        submission(SubmissionStatus::InReview, now),
    ];

    assert_eq!(submission_stats(&items, now), submission_stats(&items, now));
    assert_eq!(
        resource_stats(&[resource(true, 1)]),
        resource_stats(&[resource(true, 1)])
    );
}
